//! TEAR: unpacking a decompressed tar stream into a [`FileMap`] (spec.md
//! §4.3).
//!
//! Grounded on the teacher crate's `async-tar`-based packing (it already
//! depends on `async-tar` to build a `package/`-prefixed tarball); this
//! module reads entries with the same crate instead.

use crate::acquire::{size_error_from_io, BoxAsyncRead};
use crate::decompress::decompress_error_from_io;
use crate::error::{DiffError, Phase};
use async_tar::{Archive, EntryType};
use bytes::Bytes;
use futures::io::AsyncReadExt as _;
use futures::StreamExt;
use indexmap::IndexMap;
use tokio_util::compat::TokioAsyncReadCompatExt;

/// Insertion-ordered map from archive-relative path (with the leading
/// `package/` segment stripped) to file contents (spec.md §3).
pub type FileMap = IndexMap<String, Bytes>;

const PACKAGE_PREFIX: &str = "package/";

pub async fn extract(input: BoxAsyncRead) -> Result<FileMap, DiffError> {
    let span = tracing::debug_span!("tear");
    let _enter = span.enter();

    let archive = Archive::new(input.compat());
    let mut entries = archive.entries().map_err(map_tar_error)?;
    let mut files = FileMap::new();

    while let Some(entry) = entries.next().await {
        let mut entry = entry.map_err(map_tar_error)?;
        let header = entry.header().clone();
        let entry_type = header.entry_type();

        let raw_path = entry
            .path()
            .map_err(map_tar_error)?
            .to_string_lossy()
            .into_owned();

        if entry_type == EntryType::Symlink || entry_type == EntryType::Link {
            let link_name = entry
                .link_name()
                .ok()
                .flatten()
                .map(|p| p.to_string_lossy().into_owned());
            return Err(DiffError::new(
                Phase::Tar,
                format!(
                    "Symlinks are not supported: `{}` -> {}",
                    raw_path,
                    link_name
                        .map(|l| format!("`{}`", l))
                        .unwrap_or_else(|| "(unknown)".to_owned())
                ),
            ));
        }

        if entry_type != EntryType::Regular {
            // Directories and any other non-file entry are silently
            // skipped; their contents (if any) were already fully read by
            // `entries.next()` advancing the underlying reader.
            continue;
        }

        let relative = match raw_path.strip_prefix(PACKAGE_PREFIX) {
            Some(rest) if !rest.is_empty() => rest.to_owned(),
            _ => continue,
        };

        let size_hint = header.size().unwrap_or(0);
        let contents = read_entry(&mut entry, size_hint).await?;
        files.insert(relative, contents);
    }

    Ok(files)
}

/// Reads an entry's full contents, fast-pathing the common case of a single
/// `read` call satisfying the whole (typically small, already-buffered)
/// file.
async fn read_entry<R: futures::io::AsyncRead + Unpin>(
    entry: &mut R,
    size_hint: u64,
) -> Result<Bytes, DiffError> {
    let mut buf = Vec::with_capacity(size_hint.min(8 * 1024 * 1024) as usize);
    entry.read_to_end(&mut buf).await.map_err(map_io_error)?;
    Ok(Bytes::from(buf))
}

fn map_io_error(e: std::io::Error) -> DiffError {
    if let Some(size_err) = size_error_from_io(&e) {
        return size_err;
    }
    if let Some(decompress_err) = decompress_error_from_io(&e) {
        return decompress_err;
    }
    DiffError::with_cause(Phase::Tar, "failed reading tar entry", e.into())
}

fn map_tar_error(e: std::io::Error) -> DiffError {
    map_io_error(e)
}
