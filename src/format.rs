//! ROAR: assembling per-file diff blocks into the final unified-diff text
//! and aggregate statistics (spec.md §4.6).

use crate::diff::{compute_tree_diff, FileStatus};
use crate::extract::FileMap;
use crate::options::DiffOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatResult {
    pub output: String,
    pub files_changed: usize,
    pub files_added: usize,
    pub files_deleted: usize,
}

pub fn format_diff(left: &FileMap, right: &FileMap, options: &DiffOptions) -> FormatResult {
    let span = tracing::debug_span!("roar");
    let _enter = span.enter();

    let diffs = compute_tree_diff(left, right, options);

    let mut files_changed = 0usize;
    let mut files_added = 0usize;
    let mut files_deleted = 0usize;

    if options.name_only {
        let mut names = Vec::new();
        for d in &diffs {
            if d.status == FileStatus::Unchanged {
                continue;
            }
            files_changed += 1;
            match d.status {
                FileStatus::Added => files_added += 1,
                FileStatus::Deleted => files_deleted += 1,
                _ => {}
            }
            names.push(d.path.clone());
        }
        let output = if names.is_empty() {
            String::new()
        } else {
            format!("{}\n", names.join("\n"))
        };
        return FormatResult {
            output,
            files_changed,
            files_added,
            files_deleted,
        };
    }

    let mut blocks = Vec::new();
    for d in &diffs {
        if d.status == FileStatus::Unchanged {
            continue;
        }

        let src = format!("{}{}", options.src_prefix(), d.path);
        let dst = format!("{}{}", options.dst_prefix(), d.path);

        let show_patch = crate::binary::should_print_patch(&d.path, options.text);

        let block = if d.is_binary && !show_patch {
            Some(binary_block(&d.status, &src, &dst))
        } else {
            d.patch
                .as_ref()
                .map(|patch| text_block(&d.status, &src, &dst, patch))
        };

        let block = match block {
            Some(b) => b,
            None => continue,
        };

        files_changed += 1;
        match d.status {
            FileStatus::Added => files_added += 1,
            FileStatus::Deleted => files_deleted += 1,
            _ => {}
        }
        blocks.push(block);
    }

    let output = blocks.join("\n");

    FormatResult {
        output,
        files_changed,
        files_added,
        files_deleted,
    }
}

fn binary_block(status: &FileStatus, src: &str, dst: &str) -> String {
    let mut s = format!("diff --git {} {}\n", src, dst);
    match status {
        FileStatus::Added => {
            s.push_str("new file mode 100644\n");
            s.push_str("index 0000000..0000000\n");
            s.push_str(&format!("Binary files /dev/null and {} differ\n", dst));
        }
        FileStatus::Deleted => {
            s.push_str("deleted file mode 100644\n");
            s.push_str("index 0000000..0000000\n");
            s.push_str(&format!("Binary files {} and /dev/null differ\n", src));
        }
        FileStatus::Modified => {
            s.push_str("index 0000000..0000000 100644\n");
            s.push_str(&format!("Binary files {} and {} differ\n", src, dst));
        }
        FileStatus::Unchanged => unreachable!("unchanged paths are filtered out before this point"),
    }
    s
}

fn text_block(status: &FileStatus, src: &str, dst: &str, patch: &str) -> String {
    let mut s = format!("diff --git {} {}\n", src, dst);
    match status {
        FileStatus::Added => {
            s.push_str("new file mode 100644\n");
            s.push_str("index 0000000..0000000\n");
        }
        FileStatus::Deleted => {
            s.push_str("deleted file mode 100644\n");
            s.push_str("index 0000000..0000000\n");
        }
        FileStatus::Modified => {
            s.push_str("index 0000000..0000000 100644\n");
        }
        FileStatus::Unchanged => unreachable!("unchanged paths are filtered out before this point"),
    }
    s.push_str(patch);
    s.push('\n');
    s
}
