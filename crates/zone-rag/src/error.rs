//! Error types for the zone query pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias for zone-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a document fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection, DNS, TLS or body read failure
    Transport,
    /// The configured timeout elapsed
    Timeout,
    /// The server answered with a non-success status
    HttpStatus(u16),
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Timeout => write!(f, "timeout"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
        }
    }
}

/// Why the completion service could not produce an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Service unreachable, timed out or returned an error status
    ServiceUnavailable,
    /// Service answered but the payload was unusable
    InvalidResponse,
}

impl fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceUnavailable => write!(f, "service unavailable"),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Zone query errors
#[derive(Debug, Error)]
pub enum Error {
    /// Zone code is not present in the registry
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// Document download failed
    #[error("Failed to fetch '{url}' ({kind}): {message}")]
    Fetch {
        url: String,
        kind: FetchErrorKind,
        message: String,
    },

    /// Document bytes could not be turned into text
    #[error("Failed to decode document: {0}")]
    Decode(String),

    /// Chunk index construction or search failed
    #[error("Index error: {0}")]
    Index(String),

    /// Completion service failure
    #[error("Answer synthesis failed ({kind}): {message}")]
    Synthesis {
        kind: SynthesisErrorKind,
        message: String,
    },

    /// Missing credential, missing capability or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected fault (task join, staging I/O)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index(message.into())
    }

    /// Create a synthesis error
    pub fn synthesis(kind: SynthesisErrorKind, message: impl Into<String>) -> Self {
        Self::Synthesis {
            kind,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify a reqwest failure from a document download
    pub fn from_fetch(url: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::HttpStatus(status.as_u16())
        } else {
            FetchErrorKind::Transport
        };
        Self::fetch(url, kind, err.to_string())
    }

    /// Classify a reqwest failure from a completion or embedding call
    pub fn from_service(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::synthesis(SynthesisErrorKind::InvalidResponse, err.to_string())
        } else {
            Self::synthesis(SynthesisErrorKind::ServiceUnavailable, err.to_string())
        }
    }

    /// Stable machine-readable tag for this error kind
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownZone(_) => "unknown_zone",
            Self::Fetch { .. } => "fetch_error",
            Self::Decode(_) => "decode_error",
            Self::Index(_) => "index_error",
            Self::Synthesis { .. } => "synthesis_error",
            Self::Config(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the evidence selector may fall back to truncation
    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_tags() {
        assert_eq!(Error::UnknownZone("ZZZ".into()).error_type(), "unknown_zone");
        assert_eq!(
            Error::fetch("http://x", FetchErrorKind::HttpStatus(404), "not found").error_type(),
            "fetch_error"
        );
        assert_eq!(Error::config("missing key").error_type(), "configuration_error");
        assert!(Error::index("empty").is_index_error());
        assert!(!Error::decode("bad").is_index_error());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = Error::fetch("http://x/doc.pdf", FetchErrorKind::HttpStatus(404), "Not Found");
        let text = err.to_string();
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("http://x/doc.pdf"));

        let err = Error::synthesis(SynthesisErrorKind::InvalidResponse, "empty body");
        assert!(err.to_string().contains("invalid response"));
    }
}
