//! Top-level composition: CHOMP → CRUNCH → TEAR per side, run concurrently
//! and fail-fast, then STOMP/ROAR merge the two resulting `FileMap`s
//! (spec.md §5).

use crate::acquire::{acquire, SourceConfig};
use crate::decompress::decompress;
use crate::error::DiffError;
use crate::extract::{extract, FileMap};
use crate::format::{format_diff, FormatResult};
use crate::options::DiffOptions;

/// Runs CHOMP → CRUNCH → TEAR for one side.
async fn acquire_side(config: &SourceConfig, max_tarball_size: u64) -> Result<FileMap, DiffError> {
    let acquired = acquire(config, max_tarball_size).await?;
    let decompressed = decompress(acquired.stream).await?;
    extract(decompressed).await
}

/// Acquires both sides concurrently, cancelling the other side as soon as
/// either fails (spec.md §5 "Fail-fast").
async fn acquire_both(
    left: &SourceConfig,
    right: &SourceConfig,
    options: &DiffOptions,
) -> Result<(FileMap, FileMap), DiffError> {
    tokio::try_join!(
        acquire_side(left, options.max_tarball_size),
        acquire_side(right, options.max_tarball_size),
    )
}

/// `diff(left, right, options) → string` (spec.md §6).
pub async fn diff(
    left: &SourceConfig,
    right: &SourceConfig,
    options: &DiffOptions,
) -> Result<String, DiffError> {
    let (left_map, right_map) = acquire_both(left, right, options).await?;
    Ok(format_diff(&left_map, &right_map, options).output)
}

/// `diffWithStats(left, right, options) → FormatResult` (spec.md §6).
pub async fn diff_with_stats(
    left: &SourceConfig,
    right: &SourceConfig,
    options: &DiffOptions,
) -> Result<FormatResult, DiffError> {
    let (left_map, right_map) = acquire_both(left, right, options).await?;
    Ok(format_diff(&left_map, &right_map, options))
}

/// `extractPackage(config) → FileMap` (spec.md §6); exposed standalone for
/// callers that only need the unpacked tree.
pub async fn extract_package(config: &SourceConfig, max_tarball_size: u64) -> Result<FileMap, DiffError> {
    acquire_side(config, max_tarball_size).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::{InlineData, InlineSource};
    use async_compression::tokio::write::GzipEncoder;
    use std::io::Cursor as SyncCursor;
    use tokio::io::AsyncWriteExt;

    async fn gzip_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = async_tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = async_tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, SyncCursor::new(data.to_vec()))
                .await
                .unwrap();
        }
        let tar_bytes = builder.into_inner().await.unwrap();

        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(&tar_bytes).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    fn inline(bytes: Vec<u8>) -> SourceConfig {
        SourceConfig::Inline(InlineSource {
            data: InlineData::Bytes(bytes::Bytes::from(bytes)),
        })
    }

    #[tokio::test]
    async fn identical_archives_diff_to_empty_string() {
        let archive = gzip_tar(&[
            ("package/index.js", b"const x = 1;\n"),
            ("package/package.json", b"{\"name\":\"t\"}\n"),
        ])
        .await;

        let left = inline(archive.clone());
        let right = inline(archive);

        let output = diff(&left, &right, &DiffOptions::default()).await.unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn modified_file_surfaces_in_diff_with_stats() {
        let left_archive = gzip_tar(&[("package/index.js", b"const x = 1;")]).await;
        let right_archive = gzip_tar(&[("package/index.js", b"const x = 2;")]).await;

        let left = inline(left_archive);
        let right = inline(right_archive);

        let stats = diff_with_stats(&left, &right, &DiffOptions::default())
            .await
            .unwrap();
        assert_eq!(stats.files_changed, 1);
        assert!(stats.output.contains("diff --git a/index.js b/index.js"));
    }

    #[tokio::test]
    async fn extract_package_returns_file_map() {
        let archive = gzip_tar(&[("package/a.txt", b"hello")]).await;
        let config = inline(archive);
        let files = extract_package(&config, crate::options::MAX_TARBALL_SIZE)
            .await
            .unwrap();
        assert_eq!(files.get("a.txt").unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn symlink_in_either_side_fails_tar_phase() {
        let mut builder = async_tar::Builder::new(Vec::new());
        let mut header = async_tar::Header::new_gnu();
        header.set_entry_type(async_tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_link(&mut header, "package/link.js", "index.js")
            .await
            .unwrap();
        let tar_bytes = builder.into_inner().await.unwrap();

        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(&tar_bytes).await.unwrap();
        encoder.shutdown().await.unwrap();
        let archive = encoder.into_inner();

        let left = inline(archive.clone());
        let right = inline(archive);

        let err = diff(&left, &right, &DiffOptions::default()).await.unwrap_err();
        assert_eq!(err.phase, crate::error::Phase::Tar);
        assert!(err.message.contains("Symlinks are not supported"));
        assert!(err.message.contains("link.js"));
    }
}
