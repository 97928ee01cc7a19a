//! CHOMP: resolving a [`SourceConfig`] into a byte stream plus optional
//! declared size (spec.md §4.1).
//!
//! Transport dispatch is a `match` over a closed enum rather than dynamic
//! trait dispatch (spec.md §9 "Dynamic transport dispatch"), so adding a
//! transport is a compile-time-checked exhaustiveness change, not a new impl
//! somewhere unrelated.

#[cfg(feature = "fs")]
pub mod file;
pub mod inline;
pub mod s3;
pub mod url;

use crate::error::{DiffError, Phase};
use bytes::Bytes;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send>>;

/// A resolved byte stream plus the source's advertised size, if any
/// (spec.md §3).
pub struct AcquiredStream {
    pub stream: BoxAsyncRead,
    pub declared_size: Option<u64>,
}

/// The authentication scheme applied to a request (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    None,
    Basic,
    Bearer,
}

#[derive(Debug, Clone)]
pub struct UrlSource {
    pub source: ::url::Url,
    pub auth: AuthKind,
    pub credential: Option<String>,
}

#[derive(Debug, Clone)]
pub struct S3Source {
    /// Either `s3://bucket/key` or an `https://` URL.
    pub source: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub session_token: Option<String>,
}

impl Default for S3Source {
    fn default() -> Self {
        Self {
            source: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_owned(),
            endpoint: None,
            session_token: None,
        }
    }
}

/// The inline transport's payload: either raw bytes or a base64 string
/// (spec.md §9 - modeled as a sub-variant, not an ambiguous union).
#[derive(Debug, Clone)]
pub enum InlineData {
    Bytes(Bytes),
    Base64(String),
}

#[derive(Debug, Clone)]
pub struct InlineSource {
    pub data: InlineData,
}

#[cfg(feature = "fs")]
#[derive(Debug, Clone)]
pub struct FileSource {
    pub source: std::path::PathBuf,
}

/// Describes how to obtain one archive (spec.md §3). A closed sum type:
/// every transport this crate supports is a variant here, never a trait
/// object.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Url(UrlSource),
    S3(S3Source),
    Inline(InlineSource),
    #[cfg(feature = "fs")]
    File(FileSource),
}

impl fmt::Debug for AcquiredStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquiredStream")
            .field("declared_size", &self.declared_size)
            .finish()
    }
}

/// Resolves `config` to an [`AcquiredStream`], enforcing the declared-size
/// gate (I2) before any content-producing downstream work begins.
pub async fn acquire(config: &SourceConfig, max_tarball_size: u64) -> Result<AcquiredStream, DiffError> {
    let span = tracing::debug_span!("chomp", transport = transport_name(config));
    let _enter = span.enter();

    match config {
        SourceConfig::Url(u) => self::url::acquire_url(u, max_tarball_size).await,
        SourceConfig::S3(s) => self::s3::acquire_s3(s, max_tarball_size).await,
        SourceConfig::Inline(i) => self::inline::acquire_inline(i, max_tarball_size),
        #[cfg(feature = "fs")]
        SourceConfig::File(f) => self::file::acquire_file(f, max_tarball_size).await,
    }
}

fn transport_name(config: &SourceConfig) -> &'static str {
    match config {
        SourceConfig::Url(_) => "url",
        SourceConfig::S3(_) => "s3",
        SourceConfig::Inline(_) => "inline",
        #[cfg(feature = "fs")]
        SourceConfig::File(_) => "file",
    }
}

/// Builds the `Authorization` header value for a transport, as a pure
/// function of `(auth, credential)` independent of which transport is
/// calling it (spec.md §4.1 design rationale).
pub fn apply_auth(auth: AuthKind, credential: Option<&str>) -> Result<Option<String>, DiffError> {
    match auth {
        AuthKind::None => Ok(None),
        AuthKind::Bearer => match credential {
            Some(c) if !c.is_empty() => Ok(Some(format!("Bearer {}", c))),
            _ => Err(DiffError::new(
                Phase::Auth,
                "bearer auth requires a non-empty credential",
            )),
        },
        AuthKind::Basic => match credential {
            Some(c) if !c.is_empty() => Ok(Some(format!("Basic {}", c))),
            _ => Err(DiffError::new(
                Phase::Auth,
                "basic auth requires a non-empty credential",
            )),
        },
    }
}

/// Enforces I2 as a running total while bytes are streamed through,
/// guarding against a server that understates `Content-Length` (spec.md §9
/// Open Questions, SPEC_FULL.md §4.1).
pub(crate) struct SizeLimited<R> {
    inner: R,
    limit: u64,
    seen: u64,
}

impl<R> SizeLimited<R> {
    pub(crate) fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            seen: 0,
        }
    }
}

/// Marker wrapped into an `io::Error` so downstream stages can recognize a
/// size-limit violation and re-tag it as phase `SIZE` instead of whatever
/// phase they'd otherwise attribute a generic I/O failure to.
#[derive(Debug)]
pub(crate) struct SizeLimitExceeded {
    pub limit: u64,
}

impl fmt::Display for SizeLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archive exceeds limit of {} bytes", self.limit)
    }
}

impl std::error::Error for SizeLimitExceeded {}

/// Walks an `io::Error`'s source chain looking for a [`SizeLimitExceeded`]
/// marker, returning the ready-made `SIZE` `DiffError` if found.
pub(crate) fn size_error_from_io(e: &std::io::Error) -> Option<DiffError> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.get_ref().map(|b| b.as_ref());
    while let Some(err) = source {
        if let Some(marker) = err.downcast_ref::<SizeLimitExceeded>() {
            return Some(DiffError::new(
                Phase::Size,
                format!("archive exceeds limit of {} bytes", marker.limit),
            ));
        }
        source = err.source();
    }
    None
}

impl<R: AsyncRead + Unpin> AsyncRead for SizeLimited<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            self.seen += read as u64;
            if self.seen > self.limit {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    SizeLimitExceeded { limit: self.limit },
                )));
            }
        }
        poll
    }
}
