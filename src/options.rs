//! `DiffOptions` and the size budget constant (spec.md §3, §6).

/// Hard upper bound on the declared and actual byte count of either
/// archive (spec.md I2). `DiffOptions::max_tarball_size` may tighten this
/// per call but never loosen it.
pub const MAX_TARBALL_SIZE: u64 = 20 * 1024 * 1024;

/// Recognized fields for tuning diff computation and output (spec.md §3).
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Emit newline-separated changed paths only.
    pub name_only: bool,
    /// Unified-diff context line count.
    pub context: usize,
    /// Whitespace-insensitive comparison ignoring all whitespace.
    pub ignore_all_space: bool,
    /// Whitespace-insensitive comparison ignoring whitespace-run changes.
    ///
    /// The upstream differ this was ported from exposes a single
    /// whitespace-insensitive mode, so this behaves identically to
    /// `ignore_all_space` (spec.md §9 Open Questions) - both flags are kept
    /// for CLI/API parity with callers that distinguish them.
    pub ignore_space_change: bool,
    /// Suppress the `a/`/`b/` style path prefixes entirely.
    pub no_prefix: bool,
    /// Prefix applied to the "old" side of a diff header.
    pub src_prefix: String,
    /// Prefix applied to the "new" side of a diff header.
    pub dst_prefix: String,
    /// Force text treatment of paths the binary classifier would otherwise
    /// skip.
    pub text: bool,
    /// Per-archive byte budget. Defaults to [`MAX_TARBALL_SIZE`]; may be
    /// lowered by embedding hosts that want a tighter ceiling than the
    /// crate-wide default.
    pub max_tarball_size: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            name_only: false,
            context: 3,
            ignore_all_space: false,
            ignore_space_change: false,
            no_prefix: false,
            src_prefix: "a/".to_owned(),
            dst_prefix: "b/".to_owned(),
            text: false,
            max_tarball_size: MAX_TARBALL_SIZE,
        }
    }
}

impl DiffOptions {
    /// Whether either whitespace-insensitive flag is set.
    pub fn ignores_whitespace(&self) -> bool {
        self.ignore_all_space || self.ignore_space_change
    }

    pub fn src_prefix(&self) -> &str {
        if self.no_prefix {
            ""
        } else {
            &self.src_prefix
        }
    }

    pub fn dst_prefix(&self) -> &str {
        if self.no_prefix {
            ""
        } else {
            &self.dst_prefix
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let o = DiffOptions::default();
        assert_eq!(o.context, 3);
        assert_eq!(o.src_prefix, "a/");
        assert_eq!(o.dst_prefix, "b/");
        assert_eq!(o.max_tarball_size, MAX_TARBALL_SIZE);
        assert!(!o.name_only);
        assert!(!o.text);
    }

    #[test]
    fn no_prefix_overrides_prefix_fields() {
        let mut o = DiffOptions::default();
        o.no_prefix = true;
        assert_eq!(o.src_prefix(), "");
        assert_eq!(o.dst_prefix(), "");
    }
}
