//! The uniform error taxonomy that every pipeline stage surfaces through.
//!
//! Every public function in this crate returns `Result<T, DiffError>`.
//! Internal helpers are free to use `anyhow::Error` as an intermediate cause
//! type, but they must be converted at the nearest phase boundary via
//! [`wrap`] before crossing into a caller-visible `Result`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Identifies which pipeline stage raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Fetch,
    Decompress,
    Tar,
    Diff,
    Auth,
    Size,
}

impl Phase {
    /// The fixed HTTP status mapping for this phase (spec.md §7).
    pub const fn status(self) -> u16 {
        match self {
            Phase::Auth => 401,
            Phase::Size => 413,
            Phase::Fetch => 502,
            Phase::Decompress => 422,
            Phase::Tar => 422,
            Phase::Diff => 500,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Fetch => "FETCH",
            Phase::Decompress => "DECOMPRESS",
            Phase::Tar => "TAR",
            Phase::Diff => "DIFF",
            Phase::Auth => "AUTH",
            Phase::Size => "SIZE",
        };
        f.write_str(s)
    }
}

/// The single error type surfaced across every stage of the pipeline.
///
/// `status` is always `phase.status()` - there is no constructor that lets
/// the two drift apart (I3).
#[derive(thiserror::Error, Debug)]
#[error("{phase}: {message}")]
pub struct DiffError {
    pub phase: Phase,
    pub message: String,
    pub status: u16,
    pub cause: Option<anyhow::Error>,
}

impl DiffError {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        let message = sanitize_credentials(&message.into());
        Self {
            phase,
            status: phase.status(),
            message,
            cause: None,
        }
    }

    pub fn with_cause(phase: Phase, message: impl Into<String>, cause: anyhow::Error) -> Self {
        let mut err = Self::new(phase, message);
        err.cause = Some(cause);
        err
    }

    /// The JSON shape used when delivering this error over HTTP (spec.md §6).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": "DiffError",
            "phase": self.phase,
            "status": self.status,
            "message": self.message,
            "cause": self.cause.as_ref().map(|c| sanitize_credentials(&format!("{:#}", c))),
        })
    }
}

/// `true` iff `x` is (convertible to) a [`DiffError`]. Exposed for parity
/// with the programmatic surface described in spec.md §6; in Rust this is
/// simply a type check, provided as a free function so callers working
/// through a `Box<dyn std::error::Error>` boundary have something to call.
pub fn is_diff_error(x: &(dyn std::error::Error + 'static)) -> bool {
    x.downcast_ref::<DiffError>().is_some()
}

/// Raises a `DiffError` of the given phase unless `cond` holds.
#[macro_export]
macro_rules! assert_diff {
    ($cond:expr, $phase:expr, $($msg:tt)*) => {
        if !($cond) {
            return Err($crate::error::DiffError::new($phase, format!($($msg)*)));
        }
    };
}

/// Function form of `assert_diff!`, for call sites that already have a
/// formatted message string in hand.
pub fn assert_diff(cond: bool, phase: Phase, msg: impl Into<String>) -> Result<(), DiffError> {
    if cond {
        Ok(())
    } else {
        Err(DiffError::new(phase, msg))
    }
}

/// Preserves an existing `DiffError` (optionally prepending context) or
/// wraps an arbitrary cause into a new one, stringifying its message.
pub fn wrap(phase: Phase, cause: anyhow::Error, context: Option<&str>) -> DiffError {
    match cause.downcast::<DiffError>() {
        Ok(existing) => match context {
            Some(ctx) => DiffError {
                message: sanitize_credentials(&format!("{}: {}", ctx, existing.message)),
                ..existing
            },
            None => existing,
        },
        Err(cause) => {
            let message = match context {
                Some(ctx) => format!("{}: {}", ctx, cause),
                None => cause.to_string(),
            };
            DiffError::with_cause(phase, message, cause)
        }
    }
}

// --- credential sanitization -----------------------------------------------

struct Patterns {
    auth_header: Regex,
    bearer_standalone: Regex,
    aws_key_assignment: Regex,
    token_query_param: Regex,
    url_userinfo: Regex,
    credential_assignment: Regex,
}

static PATTERNS: Lazy<Patterns> = Lazy::new(|| Patterns {
    auth_header: Regex::new(r"(?i)(Authorization:\s*(?:Basic|Bearer))\s+\S+").unwrap(),
    bearer_standalone: Regex::new(r"(?i)\bBearer\s+\S+").unwrap(),
    aws_key_assignment: Regex::new(
        r"(?i)\b(aws_access_key_id|aws_secret_access_key)\s*=\s*\S+",
    )
    .unwrap(),
    token_query_param: Regex::new(r"(?i)\btoken=([A-Za-z0-9+/=_-]{8,})").unwrap(),
    url_userinfo: Regex::new(r"([a-zA-Z][a-zA-Z0-9+.-]*://)([^/@\s:]+):([^/@\s]+)@").unwrap(),
    credential_assignment: Regex::new(
        r"(?i)\b(credentials?)\s*=\s*([A-Za-z0-9+/=_-]{12,})",
    )
    .unwrap(),
});

/// Applies every credential-redaction pattern to `s`, globally (every match
/// is replaced, not just the first) and idempotently - running this twice
/// in a row produces the same output as running it once.
pub fn sanitize_credentials(s: &str) -> String {
    let p = &*PATTERNS;

    let s = p
        .auth_header
        .replace_all(s, "${1} [REDACTED]")
        .into_owned();
    let s = p
        .bearer_standalone
        .replace_all(&s, "Bearer [REDACTED]")
        .into_owned();
    let s = p
        .aws_key_assignment
        .replace_all(&s, "${1}=[REDACTED]")
        .into_owned();
    let s = p
        .token_query_param
        .replace_all(&s, "token=[REDACTED]")
        .into_owned();
    let s = p
        .credential_assignment
        .replace_all(&s, "${1}=[REDACTED]")
        .into_owned();
    let s = p
        .url_userinfo
        .replace_all(&s, "${1}[REDACTED]:[REDACTED]@")
        .into_owned();

    s
}
