//! Error types for device acquisition and persistence sinks.
//!
//! Every expected failure mode ("device didn't answer", "firmware sent junk")
//! is a value of [`FetchError`]. Callers in the serving layer collapse all of
//! them into "no data this cycle"; the variants exist so logs can say why.

use std::time::Duration;

use thiserror::Error;

/// Boxed transport cause (reqwest or io).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse failure taxonomy shared by both device protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Connection refused, host unreachable, or a clock bound expired.
    Transport,
    /// Non-JSON body, blank line-protocol response, undecodable fields.
    MalformedResponse,
    /// An expected section or command result is missing from an acquisition.
    ProtocolMismatch,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::ProtocolMismatch => write!(f, "protocol_mismatch"),
        }
    }
}

/// Failure of a single device request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{target} did not answer within {after:?}")]
    Timeout {
        target: String,
        after: Duration,
    },

    #[error("{target} is unreachable: {source}")]
    Unreachable {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid response from {target}: {reason}")]
    InvalidResponse {
        target: String,
        reason: String,
    },

    #[error("could not decode response from {target}: {reason}")]
    DecodeError {
        target: String,
        reason: String,
    },

    #[error("{target} returned an empty response")]
    EmptyResponse { target: String },

    #[error("`{command}` response from {target} is missing its {expected} section")]
    ProtocolMismatch {
        target: String,
        command: &'static str,
        expected: &'static str,
    },
}

impl FetchError {
    /// Map the variant onto the shared taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. } | Self::Unreachable { .. } => ErrorClass::Transport,
            Self::InvalidResponse { .. }
            | Self::DecodeError { .. }
            | Self::EmptyResponse { .. } => ErrorClass::MalformedResponse,
            Self::ProtocolMismatch { .. } => ErrorClass::ProtocolMismatch,
        }
    }

    /// Short stable name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Unreachable { .. } => "unreachable",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::DecodeError { .. } => "decode_error",
            Self::EmptyResponse { .. } => "empty_response",
            Self::ProtocolMismatch { .. } => "protocol_mismatch",
        }
    }
}

/// Failure of a persistence sink. Never surfaces to an HTTP caller.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("session log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_variants_classify_as_transport() {
        let timeout = FetchError::Timeout {
            target: "10.0.0.2:4028".into(),
            after: Duration::from_secs(3),
        };
        let unreachable = FetchError::Unreachable {
            target: "10.0.0.2:4028".into(),
            source: Box::new(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)),
        };
        assert_eq!(timeout.class(), ErrorClass::Transport);
        assert_eq!(unreachable.class(), ErrorClass::Transport);
    }

    #[test]
    fn malformed_variants_classify_as_malformed() {
        for err in [
            FetchError::InvalidResponse {
                target: "x".into(),
                reason: "not an object".into(),
            },
            FetchError::DecodeError {
                target: "x".into(),
                reason: "bad number".into(),
            },
            FetchError::EmptyResponse { target: "x".into() },
        ] {
            assert_eq!(err.class(), ErrorClass::MalformedResponse, "{err}");
        }
    }

    #[test]
    fn protocol_mismatch_message_names_command() {
        let err = FetchError::ProtocolMismatch {
            target: "10.0.0.2:4028".into(),
            command: "summary",
            expected: "SUMMARY",
        };
        assert_eq!(err.class(), ErrorClass::ProtocolMismatch);
        assert!(err.to_string().contains("`summary`"));
        assert_eq!(err.kind(), "protocol_mismatch");
    }
}
