//! URL transport: plain HTTP(S) GET with auto-redirects (spec.md §4.1).

use super::{apply_auth, AcquiredStream, SizeLimited, UrlSource};
use crate::error::{sanitize_credentials, DiffError, Phase};
use futures::TryStreamExt;
use once_cell::sync::Lazy;
use reqwest::Client;
use std::io;

// reqwest's default `Client` already follows redirects (up to 10) and
// disables response gzip so we observe the raw tar.gz bytes, matching the
// teacher crate's own `Client::builder().gzip(false).build()` pattern.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .gzip(false)
        .build()
        .expect("failed to build reqwest client")
});

pub async fn acquire_url(src: &UrlSource, max_tarball_size: u64) -> Result<AcquiredStream, DiffError> {
    let url = src.source.clone();
    let auth_header = apply_auth(src.auth, src.credential.as_deref())?;

    let mut request = HTTP_CLIENT.get(url.clone());
    if let Some(value) = &auth_header {
        request = request.header(reqwest::header::AUTHORIZATION, value);
    }

    let response = request.send().await.map_err(|e| {
        DiffError::with_cause(
            Phase::Fetch,
            sanitize_credentials(&format!("Network error fetching {}", url)),
            e.into(),
        )
    })?;

    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(DiffError::new(
            Phase::Auth,
            format!(
                "Authentication failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ),
        ));
    }

    if !status.is_success() {
        return Err(DiffError::new(
            Phase::Fetch,
            sanitize_credentials(&format!(
                "HTTP {} {} for {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                url
            )),
        ));
    }

    let declared_size = response.content_length();
    if let Some(size) = declared_size {
        if size > max_tarball_size {
            return Err(DiffError::new(
                Phase::Size,
                format!("archive exceeds limit of {} bytes", max_tarball_size),
            ));
        }
    }

    let byte_stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let reader = tokio_util::io::StreamReader::new(byte_stream);
    let reader = SizeLimited::new(reader, max_tarball_size);

    Ok(AcquiredStream {
        stream: Box::pin(reader),
        declared_size,
    })
}
