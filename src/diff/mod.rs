//! STOMP: per-path classification and Myers unified-diff computation
//! (spec.md §4.5).

use crate::binary::{is_binary_path, should_print_patch};
use crate::extract::FileMap;
use crate::options::DiffOptions;
use bytes::Bytes;
use indexmap::IndexSet;
use rayon::prelude::*;
use similar::{Algorithm, TextDiff};

/// The outcome of comparing one path across both archives (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    Modified,
    Added,
    Deleted,
}

#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub status: FileStatus,
    pub is_binary: bool,
    pub patch: Option<String>,
}

/// Lenient UTF-8 decode: malformed sequences become U+FFFD, never an error
/// (spec.md §4.5 step 2, I4-adjacent lenience for untrusted archive bytes).
pub fn decode_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// CRLF → LF, then any remaining lone CR → LF (spec.md §4.5 step 2).
fn normalize_line_endings(s: &str) -> String {
    let s = s.replace("\r\n", "\n");
    s.replace('\r', "\n")
}

fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last_was_space = false;
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_owned()
}

fn split_lines(s: &str) -> Vec<&str> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split_inclusive('\n').collect()
    }
}

/// Builds a git-style unified diff body (without the `diff --git`/`index`
/// preamble, which ROAR owns) between `old_text` and `new_text`, honoring
/// `options.context` and the whitespace-insensitive flags. Returns `None`
/// when the computed diff has zero hunks (spec.md §4.5 step 2, P10).
pub fn compute_diff(
    old_header: &str,
    new_header: &str,
    old_text: &str,
    new_text: &str,
    options: &DiffOptions,
) -> Option<String> {
    let old_norm = normalize_line_endings(old_text);
    let new_norm = normalize_line_endings(new_text);

    let old_lines = split_lines(&old_norm);
    let new_lines = split_lines(&new_norm);

    let (old_keys, new_keys): (Vec<String>, Vec<String>) = if options.ignores_whitespace() {
        (
            old_lines.iter().map(|l| collapse_whitespace(l)).collect(),
            new_lines.iter().map(|l| collapse_whitespace(l)).collect(),
        )
    } else {
        (
            old_lines.iter().map(|l| (*l).to_owned()).collect(),
            new_lines.iter().map(|l| (*l).to_owned()).collect(),
        )
    };
    let old_key_refs: Vec<&str> = old_keys.iter().map(|s| s.as_str()).collect();
    let new_key_refs: Vec<&str> = new_keys.iter().map(|s| s.as_str()).collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old_key_refs, &new_key_refs);

    let groups = diff.grouped_ops(options.context);
    if groups.is_empty() {
        return None;
    }

    let mut body = String::new();
    body.push_str(&format!("--- {}\n", old_header));
    body.push_str(&format!("+++ {}\n", new_header));

    for group in &groups {
        let first = group.first().expect("group is non-empty");
        let last = group.last().expect("group is non-empty");
        let old_start = first.old_range().start;
        let old_end = last.old_range().end;
        let new_start = first.new_range().start;
        let new_end = last.new_range().end;

        body.push_str(&format_hunk_header(
            old_start,
            old_end - old_start,
            new_start,
            new_end - new_start,
        ));

        for op in group {
            for change in op.iter_changes(&old_lines, &new_lines) {
                let marker = match change.tag() {
                    similar::ChangeTag::Equal => ' ',
                    similar::ChangeTag::Delete => '-',
                    similar::ChangeTag::Insert => '+',
                };
                let value = change.value();
                body.push(marker);
                body.push_str(value);
                if !value.ends_with('\n') {
                    body.push('\n');
                }
            }
        }
    }

    Some(body)
}

fn format_hunk_header(old_start: usize, old_len: usize, new_start: usize, new_len: usize) -> String {
    let old_line = if old_len == 0 { old_start } else { old_start + 1 };
    let new_line = if new_len == 0 { new_start } else { new_start + 1 };
    format!("@@ -{},{} +{},{} @@\n", old_line, old_len, new_line, new_len)
}

fn trim_trailing_newline(s: &str) -> &str {
    s.strip_suffix('\n').unwrap_or(s)
}

/// Computes the [`FileDiff`] for a single path given its (possibly absent)
/// content on each side (spec.md §4.5 step 2).
pub fn compute_file_diff(
    path: &str,
    left: Option<&Bytes>,
    right: Option<&Bytes>,
    options: &DiffOptions,
) -> FileDiff {
    let is_binary = is_binary_path(path);
    let src_header = format!("{}{}", options.src_prefix(), path);
    let dst_header = format!("{}{}", options.dst_prefix(), path);

    match (left, right) {
        (Some(l), Some(r)) => {
            if l.as_ref() == r.as_ref() {
                return FileDiff {
                    path: path.to_owned(),
                    status: FileStatus::Unchanged,
                    is_binary,
                    patch: None,
                };
            }
            if is_binary && !should_print_patch(path, options.text) {
                return FileDiff {
                    path: path.to_owned(),
                    status: FileStatus::Modified,
                    is_binary,
                    patch: None,
                };
            }
            let old_text = decode_bytes(l);
            let new_text = decode_bytes(r);
            let patch = compute_diff(&src_header, &dst_header, &old_text, &new_text, options)
                .map(|p| trim_trailing_newline(&p).to_owned());
            let status = if patch.is_some() {
                FileStatus::Modified
            } else {
                FileStatus::Unchanged
            };
            FileDiff {
                path: path.to_owned(),
                status,
                is_binary,
                patch,
            }
        }
        (None, Some(r)) => {
            let patch = if is_binary && !should_print_patch(path, options.text) {
                None
            } else {
                let new_text = decode_bytes(r);
                compute_diff("/dev/null", &dst_header, "", &new_text, options)
                    .map(|p| trim_trailing_newline(&p).to_owned())
            };
            FileDiff {
                path: path.to_owned(),
                status: FileStatus::Added,
                is_binary,
                patch,
            }
        }
        (Some(l), None) => {
            let patch = if is_binary && !should_print_patch(path, options.text) {
                None
            } else {
                let old_text = decode_bytes(l);
                compute_diff(&src_header, "/dev/null", &old_text, "", options)
                    .map(|p| trim_trailing_newline(&p).to_owned())
            };
            FileDiff {
                path: path.to_owned(),
                status: FileStatus::Deleted,
                is_binary,
                patch,
            }
        }
        (None, None) => unreachable!("path must come from the union of both maps"),
    }
}

/// Computes the per-path diff for the union of both maps, sorted ascending
/// lexicographically (spec.md I5, P4), fanning the per-path work out across
/// `rayon`'s thread pool.
pub fn compute_tree_diff(left: &FileMap, right: &FileMap, options: &DiffOptions) -> Vec<FileDiff> {
    let mut paths: IndexSet<&str> = IndexSet::new();
    paths.extend(left.keys().map(|s| s.as_str()));
    paths.extend(right.keys().map(|s| s.as_str()));
    let mut sorted: Vec<&str> = paths.into_iter().collect();
    sorted.sort_unstable();

    sorted
        .into_par_iter()
        .map(|path| compute_file_diff(path, left.get(path), right.get(path), options))
        .collect()
}
