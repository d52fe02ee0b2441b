//! Error types for megscope-core.
//!
//! Nothing in the acquisition pipeline is fatal: every error defined here is
//! absorbed by the loop that produced it and degrades to an empty or
//! placeholder state.
//!
//! | Error | Acquisition loop | Health monitor | User command |
//! |-------|------------------|----------------|--------------|
//! | [`Error::NotReachable`] | retry next tick | mark non-viable | blocking alert |
//! | [`Error::Api`] | retry next tick | mark non-viable | blocking alert |
//! | [`Error::InvalidResponse`] | retry next tick | mark non-viable | blocking alert |
//! | [`Error::InvalidConfig`] | refuse to start | refuse to start | n/a |
//! | [`Error::Export`] / [`Error::Io`] | n/a | n/a | status message |

use thiserror::Error;

/// Errors produced by the acquisition pipeline and its service boundary.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The acquisition service could not be reached.
    #[error("Service not reachable at {url}: {message}")]
    NotReachable {
        /// The URL that was requested.
        url: String,
        /// Transport-level failure description.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body, or the status text.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid options or configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing delimited export text failed.
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error came from talking to the service.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NotReachable { .. } | Self::Api { .. } | Self::InvalidResponse(_)
        )
    }
}

/// Result type alias using megscope-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let err = Error::NotReachable {
            url: "http://localhost:8000/api/meg/status".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection refused"));

        assert!(
            Error::Api {
                status: 503,
                message: "busy".to_string()
            }
            .is_transport()
        );
        assert!(!Error::InvalidConfig("bad".to_string()).is_transport());
        assert!(Error::InvalidResponse("truncated body".to_string()).is_transport());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
