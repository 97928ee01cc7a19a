//! S3 transport: AWS Signature V4 signed GET (spec.md §4.1).
//!
//! Grounded on `src/backends/s3.rs` of the teacher crate: build a
//! `rusty_s3::Bucket` + `Credentials`, construct a `GetObject` action,
//! `.sign()` it into a URL, and GET the signed URL with `reqwest`.

use super::{AcquiredStream, S3Source, SizeLimited};
use crate::error::{sanitize_credentials, DiffError, Phase};
use futures::TryStreamExt;
use once_cell::sync::Lazy;
use reqwest::Client;
use rusty_s3::{actions::GetObject, Bucket, Credentials, S3Action, UrlStyle};
use std::io;
use std::time::Duration;

const SIGNATURE_TTL: Duration = Duration::from_secs(3600);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .gzip(false)
        .build()
        .expect("failed to build reqwest client")
});

struct ParsedLocation {
    bucket: String,
    key: String,
    endpoint: ::url::Url,
    path_style: bool,
}

fn parse_location(src: &S3Source) -> Result<ParsedLocation, DiffError> {
    if let Ok(existing) = ::url::Url::parse(&src.source) {
        if existing.scheme() == "http" || existing.scheme() == "https" {
            // Already a full URL: treat the host as the endpoint and the
            // first path segment as the bucket, the remainder as the key.
            let mut segments = existing
                .path_segments()
                .map(|s| s.collect::<Vec<_>>())
                .unwrap_or_default();
            if segments.is_empty() {
                return Err(DiffError::new(Phase::Fetch, "S3 URL has no bucket/key path"));
            }
            let bucket = segments.remove(0).to_owned();
            let key = segments.join("/");
            let mut endpoint = existing.clone();
            endpoint.set_path("/");
            return Ok(ParsedLocation {
                bucket,
                key,
                endpoint,
                path_style: true,
            });
        }
    }

    let rest = src
        .source
        .strip_prefix("s3://")
        .ok_or_else(|| DiffError::new(Phase::Fetch, "S3 source must be an s3:// URI or https URL"))?;
    let mut parts = rest.splitn(2, '/');
    let bucket = parts.next().unwrap_or("").to_owned();
    let key = parts.next().unwrap_or("").to_owned();

    if bucket.is_empty() {
        return Err(DiffError::new(Phase::Fetch, "S3 source has an empty bucket"));
    }
    if key.is_empty() {
        return Err(DiffError::new(Phase::Fetch, "S3 source has an empty key"));
    }

    let (endpoint, path_style) = if let Some(endpoint) = &src.endpoint {
        let url = ::url::Url::parse(endpoint)
            .map_err(|e| DiffError::with_cause(Phase::Fetch, "invalid S3 endpoint", e.into()))?;
        (url, true)
    } else {
        let url = ::url::Url::parse(&format!("https://s3.{}.amazonaws.com", src.region))
            .map_err(|e| DiffError::with_cause(Phase::Fetch, "invalid S3 region", e.into()))?;
        (url, false)
    };

    Ok(ParsedLocation {
        bucket,
        key,
        endpoint,
        path_style,
    })
}

pub async fn acquire_s3(src: &S3Source, max_tarball_size: u64) -> Result<AcquiredStream, DiffError> {
    if src.access_key_id.is_empty() || src.secret_access_key.is_empty() {
        return Err(DiffError::new(
            Phase::Auth,
            "S3 transport requires accessKeyId and secretAccessKey",
        ));
    }

    let loc = parse_location(src)?;

    let style = if loc.path_style {
        UrlStyle::Path
    } else {
        UrlStyle::VirtualHost
    };

    let bucket = Bucket::new(loc.endpoint, style, loc.bucket, src.region.clone())
        .map_err(|e| DiffError::with_cause(Phase::Fetch, "invalid S3 bucket configuration", e.into()))?;

    let mut credentials = Credentials::new(src.access_key_id.clone(), src.secret_access_key.clone());
    if let Some(token) = &src.session_token {
        credentials = Credentials::new_with_token(
            src.access_key_id.clone(),
            src.secret_access_key.clone(),
            token.clone(),
        );
    }

    let action = GetObject::new(&bucket, Some(&credentials), &loc.key);
    let signed_url = action.sign(SIGNATURE_TTL);

    let response = HTTP_CLIENT.get(signed_url).send().await.map_err(|e| {
        DiffError::with_cause(
            Phase::Fetch,
            sanitize_credentials("Network error fetching S3 object"),
            e.into(),
        )
    })?;

    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DiffError::new(Phase::Fetch, "S3 object not found"));
    }
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
            format!(
                "HTTP {} {} for S3 object",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ),
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
