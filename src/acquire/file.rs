//! Local file transport, available only on targets with filesystem
//! capability (spec.md §4.1). Gated behind the `fs` Cargo feature exactly as
//! the teacher crate gates its own filesystem-backed backend.

use super::{AcquiredStream, FileSource, SizeLimited};
use crate::error::{DiffError, Phase};
use tokio::io::BufReader;

/// Typical chunk size for the file reader (spec.md §4.1); `BufReader`
/// handles the chunking internally, this documents the intended read
/// granularity.
const CHUNK_SIZE: usize = 64 * 1024;

pub async fn acquire_file(src: &FileSource, max_tarball_size: u64) -> Result<AcquiredStream, DiffError> {
    let metadata = match tokio::fs::metadata(&src.source).await {
        Ok(md) => md,
        Err(e) => return Err(map_stat_error(e, &src.source)),
    };

    if metadata.is_dir() {
        return Err(DiffError::new(
            Phase::Fetch,
            format!("Path is a directory, not a file: {}", src.source.display()),
        ));
    }

    if !metadata.is_file() {
        return Err(DiffError::new(
            Phase::Fetch,
            format!("{} is not a regular file", src.source.display()),
        ));
    }

    let size = metadata.len();
    if size > max_tarball_size {
        return Err(DiffError::new(
            Phase::Size,
            format!("archive exceeds limit of {} bytes", max_tarball_size),
        ));
    }

    let file = tokio::fs::File::open(&src.source)
        .await
        .map_err(|e| map_stat_error(e, &src.source))?;
    let reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let reader = SizeLimited::new(reader, max_tarball_size);

    Ok(AcquiredStream {
        stream: Box::pin(reader),
        declared_size: Some(size),
    })
}

fn map_stat_error(e: std::io::Error, path: &std::path::Path) -> DiffError {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::NotFound => DiffError::new(
            Phase::Fetch,
            format!("File not found: {}", path.display()),
        ),
        ErrorKind::PermissionDenied => DiffError::new(
            Phase::Fetch,
            format!("Permission denied: {}", path.display()),
        ),
        _ => DiffError::with_cause(
            Phase::Fetch,
            format!("failed to stat {}", path.display()),
            e.into(),
        ),
    }
}
