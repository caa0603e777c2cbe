//! Error handling for the unsubscriber.
//!
//! Two families live here:
//!   * `UnsubscriberError`: fatal glue failures (bad config, unreadable input
//!     files, mailbox API errors). These abort a run and map to an
//!     `ErrorCategory` for structured reporting.
//!   * `RecoveredError`: problems the extraction/classification pipeline
//!     absorbs. They never abort anything; they travel next to the result as
//!     diagnostics so callers can log or count them.
//!
//! Usage:
//!   use unsubscriber::errors::{Result, UnsubscriberError};
//!
//!   fn load() -> Result<()> {
//!       Err(UnsubscriberError::configuration("batch_size must be positive"))
//!   }

use std::io;

use serde::Serialize;
use thiserror::Error;

/// High-level classification for structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Parse,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum UnsubscriberError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No mailbox source configured: pass --messages FILE or an access token")]
    NoMailboxSource,

    // ---------------------------- Parsing -----------------------------------
    #[error("Failed to parse message file {file_path}: {reason}")]
    MessageFile { file_path: String, reason: String },

    #[error("Unexpected response from {endpoint}: {reason}")]
    ApiResponse { endpoint: String, reason: String },

    // ----------------------------- Network ----------------------------------
    #[error("Network error during {operation} for '{target}': {source}")]
    Network {
        operation: String,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Mailbox API returned HTTP {status} for {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Request timed out after {seconds}s: {target}")]
    Timeout { target: String, seconds: u64 },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl UnsubscriberError {
    /// Categorize the error for structured output.
    pub fn category(&self) -> ErrorCategory {
        use UnsubscriberError::*;
        match self {
            Configuration { .. } | NoMailboxSource => ErrorCategory::Input,

            MessageFile { .. } | ApiResponse { .. } => ErrorCategory::Parse,

            Network { .. } | HttpStatus { .. } | Timeout { .. } => ErrorCategory::Network,

            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UnsubscriberError::Timeout { .. } | UnsubscriberError::Network { .. } => true,
            UnsubscriberError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    // ---------------------------- Constructors -----------------------------

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn message_file(file_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MessageFile {
            file_path: file_path.into(),
            reason: reason.into(),
        }
    }

    pub fn api_response(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ApiResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn network(
        operation: impl Into<String>,
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            operation: operation.into(),
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn http_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    pub fn timeout(target: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            target: target.into(),
            seconds,
        }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, UnsubscriberError>;

/// Map standard IO errors into `Io` variant (generic context).
impl From<io::Error> for UnsubscriberError {
    fn from(e: io::Error) -> Self {
        UnsubscriberError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

impl From<crate::config::ConfigError> for UnsubscriberError {
    fn from(e: crate::config::ConfigError) -> Self {
        UnsubscriberError::Configuration {
            message: e.to_string(),
        }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| UnsubscriberError::io(path.into(), operation.into(), e))
    }
}

// --------------------------- Recovered errors -------------------------------

/// A problem the pipeline absorbed instead of failing.
///
/// `location` is a short path into the message tree such as
/// `payload.parts[2].body.data`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveredError {
    #[error("malformed input at {location}: {reason}")]
    MalformedInput { location: String, reason: String },

    #[error("could not decode {location}: {reason}")]
    DecodeFailure { location: String, reason: String },

    #[error("no registrable domain for {url}: {reason}")]
    ClassificationFailure { url: String, reason: String },
}

impl RecoveredError {
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn classification(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClassificationFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Stable snake_case label, used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecoveredError::MalformedInput { .. } => "malformed_input",
            RecoveredError::DecodeFailure { .. } => "decode_failure",
            RecoveredError::ClassificationFailure { .. } => "classification_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(
            UnsubscriberError::configuration("x").category(),
            ErrorCategory::Input
        );
        assert_eq!(
            UnsubscriberError::timeout("gmail", 5).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            UnsubscriberError::message_file("f", "bad").category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            UnsubscriberError::NoMailboxSource.category(),
            ErrorCategory::Input
        );
    }

    #[test]
    fn transient_statuses() {
        assert!(UnsubscriberError::http_status("list", 429).is_transient());
        assert!(UnsubscriberError::http_status("list", 503).is_transient());
        assert!(!UnsubscriberError::http_status("list", 401).is_transient());
        assert!(UnsubscriberError::timeout("list", 30).is_transient());
        assert!(!UnsubscriberError::configuration("nope").is_transient());
    }

    #[test]
    fn display_snippets() {
        let e = UnsubscriberError::http_status("users/me/messages", 403);
        let s = e.to_string();
        assert!(s.contains("users/me/messages"));
        assert!(s.contains("403"));
        let i = UnsubscriberError::internal("boom");
        assert!(i.to_string().contains("Internal error"));
    }

    #[test]
    fn io_context() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let mapped = res.with_path("/tmp/file", "read");
        match mapped.err().unwrap() {
            UnsubscriberError::Io {
                path, operation, ..
            } => {
                assert_eq!(path, "/tmp/file");
                assert_eq!(operation, "read");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn recovered_kinds_and_serialization() {
        let d = RecoveredError::decode("payload.parts[0].body.data", "invalid base64");
        assert_eq!(d.kind(), "decode_failure");
        assert!(d.to_string().contains("payload.parts[0]"));

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "decode_failure");
        assert_eq!(json["location"], "payload.parts[0].body.data");

        let c = RecoveredError::classification("https://10.0.0.1/u", "ip host");
        assert_eq!(c.kind(), "classification_failure");
    }
}
