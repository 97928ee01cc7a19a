//! CRUNCH: streaming gzip decompression (spec.md §4.2).
//!
//! Must not buffer the whole compressed input before producing output, so
//! this wraps the acquired stream in `async_compression`'s Tokio gzip
//! decoder rather than the teacher's buffer-then-`flate2::read::GzDecoder`
//! approach.

use crate::acquire::{size_error_from_io, BoxAsyncRead};
use crate::error::{DiffError, Phase};
use async_compression::tokio::bufread::GzipDecoder;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Wraps `input` in a streaming gzip decoder, eagerly validating the gzip
/// header so a non-gzip input fails fast with a `DECOMPRESS` error instead
/// of surfacing as a confusing TAR failure downstream.
pub async fn decompress(input: BoxAsyncRead) -> Result<BoxAsyncRead, DiffError> {
    let span = tracing::debug_span!("crunch");
    let _enter = span.enter();

    let decoder = Tagged {
        inner: GzipDecoder::new(BufReader::new(input)),
    };
    let mut decoder = decoder;

    // Probe a single byte to force the header to be parsed now, while we can
    // still attribute a bad header to this stage rather than whatever reads
    // from the returned stream later.
    let mut probe = [0u8; 1];
    let n = decoder.read(&mut probe).await.map_err(map_decode_error)?;

    let primed: BoxAsyncRead = Box::pin(Primed {
        first: if n == 0 { None } else { Some(probe[0]) },
        rest: decoder,
    });

    Ok(primed)
}

fn map_decode_error(e: std::io::Error) -> DiffError {
    if let Some(size_err) = size_error_from_io(&e) {
        return size_err;
    }
    DiffError::with_cause(Phase::Decompress, "Invalid gzip data", e.into())
}

/// Marker wrapped into an `io::Error` so later stages (TEAR, reading through
/// this decoder) can recognize a decode failure and re-tag it as phase
/// `DECOMPRESS` rather than whatever phase they'd otherwise attribute a
/// generic I/O failure to, mirroring `SizeLimitExceeded` in the acquire
/// stage.
#[derive(Debug)]
struct DecompressFailed {
    detail: String,
}

impl std::fmt::Display for DecompressFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid gzip data: {}", self.detail)
    }
}

impl std::error::Error for DecompressFailed {}

/// Walks an `io::Error`'s source chain looking for a [`DecompressFailed`]
/// marker, returning the ready-made `DECOMPRESS` `DiffError` if found.
pub(crate) fn decompress_error_from_io(e: &std::io::Error) -> Option<DiffError> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.get_ref().map(|b| b.as_ref());
    while let Some(err) = source {
        if let Some(marker) = err.downcast_ref::<DecompressFailed>() {
            return Some(DiffError::new(Phase::Decompress, marker.to_string()));
        }
        source = err.source();
    }
    None
}

/// Tags any error from the gzip decoder that isn't already a recognized
/// size-limit violation as a [`DecompressFailed`], preserving the original
/// message.
struct Tagged<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> AsyncRead for Tagged<R> {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        match std::pin::Pin::new(&mut this.inner).poll_read(cx, buf) {
            std::task::Poll::Ready(Err(e)) => {
                if size_error_from_io(&e).is_some() {
                    std::task::Poll::Ready(Err(e))
                } else {
                    let detail = e.to_string();
                    std::task::Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        DecompressFailed { detail },
                    )))
                }
            }
            other => other,
        }
    }
}

/// Re-plays the one byte consumed while priming the decoder ahead of the
/// rest of the decompressed stream.
struct Primed<R> {
    first: Option<u8>,
    rest: R,
}

impl<R: AsyncRead + Unpin> AsyncRead for Primed<R> {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if let Some(byte) = this.first.take() {
            buf.put_slice(&[byte]);
            return std::task::Poll::Ready(Ok(()));
        }
        std::pin::Pin::new(&mut this.rest).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::write::GzipEncoder;
    use tokio::io::AsyncWriteExt;

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(data).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    #[tokio::test]
    async fn decompresses_valid_gzip() {
        let compressed = gzip(b"hello, tarball").await;
        let input: BoxAsyncRead = Box::pin(std::io::Cursor::new(compressed));
        let mut decompressed = decompress(input).await.unwrap();

        let mut out = Vec::new();
        decompressed.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello, tarball");
    }

    #[tokio::test]
    async fn empty_member_decompresses_to_zero_bytes() {
        let compressed = gzip(b"").await;
        let input: BoxAsyncRead = Box::pin(std::io::Cursor::new(compressed));
        let mut decompressed = decompress(input).await.unwrap();

        let mut out = Vec::new();
        decompressed.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn garbage_input_fails_decompress_phase() {
        let input: BoxAsyncRead = Box::pin(std::io::Cursor::new(vec![0xff, 0x00, 0x11, 0x22]));
        let err = decompress(input).await.unwrap_err();
        assert_eq!(err.phase, Phase::Decompress);
    }

    #[tokio::test]
    async fn truncated_gzip_fails_decompress_phase() {
        let mut compressed = gzip(b"some reasonably long payload to compress").await;
        compressed.truncate(compressed.len() - 4);
        let input: BoxAsyncRead = Box::pin(std::io::Cursor::new(compressed));

        let result = decompress(input).await;
        match result {
            Err(err) => assert_eq!(err.phase, Phase::Decompress),
            Ok(mut stream) => {
                let mut out = Vec::new();
                let err = stream.read_to_end(&mut out).await.unwrap_err();
                let tagged = decompress_error_from_io(&err);
                assert!(tagged.is_some());
                assert_eq!(tagged.unwrap().phase, Phase::Decompress);
            }
        }
    }
}
