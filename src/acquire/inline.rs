//! Inline transport: raw bytes or a base64 string handed directly to the
//! pipeline (spec.md §4.1).

use super::{AcquiredStream, InlineData, InlineSource};
use crate::error::{DiffError, Phase};
use bytes::Bytes;
use std::io::Cursor;

pub fn acquire_inline(src: &InlineSource, max_tarball_size: u64) -> Result<AcquiredStream, DiffError> {
    let bytes = match &src.data {
        InlineData::Bytes(b) => b.clone(),
        InlineData::Base64(s) => {
            let decoded = base64::decode(s)
                .map_err(|e| DiffError::with_cause(Phase::Fetch, "Invalid base64 data", e.into()))?;
            Bytes::from(decoded)
        }
    };

    if bytes.len() as u64 > max_tarball_size {
        return Err(DiffError::new(
            Phase::Size,
            format!("archive exceeds limit of {} bytes", max_tarball_size),
        ));
    }

    let declared_size = Some(bytes.len() as u64);
    let cursor = Cursor::new(bytes);

    Ok(AcquiredStream {
        stream: Box::pin(cursor),
        declared_size,
    })
}
