#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! Streams two packaged gzip-tar archives and computes a git-compatible
//! unified diff between them, entirely in memory, under a strict byte
//! budget (spec.md §1).
//!
//! The pipeline is five stages: CHOMP (acquire) → CRUNCH (decompress) →
//! TEAR (extract) → STOMP (diff) → ROAR (format). [`diff`] and
//! [`diff_with_stats`] run both archive sides concurrently and fail fast.

mod acquire;
mod binary;
mod decompress;
mod diff;
pub mod error;
mod extract;
mod format;
mod options;
mod pipeline;

pub use acquire::{AuthKind, InlineData, InlineSource, S3Source, SourceConfig, UrlSource};
#[cfg(feature = "fs")]
pub use acquire::FileSource;
pub use binary::{all_extensions, is_binary_extension, is_binary_path, should_print_patch};
pub use diff::{compute_diff, compute_file_diff, compute_tree_diff, decode_bytes, FileDiff, FileStatus};
pub use error::{assert_diff, is_diff_error, sanitize_credentials, DiffError, Phase};
pub use extract::FileMap;
pub use format::FormatResult;
pub use options::{DiffOptions, MAX_TARBALL_SIZE};
pub use pipeline::{diff, diff_with_stats, extract_package};

/// Binary-extension utility kept under its spec name alongside
/// [`all_extensions`] (spec.md §6 `getBinaryExtensions`).
pub fn get_binary_extensions() -> Vec<String> {
    all_extensions()
}
