//! crates/researchmate_core/src/error.rs
//!
//! The error taxonomy shared by the gateway and every controller.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport produced no response at all.
    #[error("Network error: {0}")]
    Network(#[from] PortError),

    /// Non-2xx response. `message` comes from the body's `error`/`detail` field.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 401 on any endpoint other than login. The credential is already cleared.
    #[error("Session expired. Please login again.")]
    AuthExpired,

    /// Client-side pre-check: an authenticated operation was attempted without a credential.
    #[error("Authentication required. Please login first.")]
    AuthRequired,

    #[error("No document selected")]
    NoDocumentSelected,

    /// Empty required input, detected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Only PDF files can be analyzed (got '{0}')")]
    UnsupportedFileType(String),

    #[error("A document is already being uploaded or analyzed")]
    WorkflowBusy,

    /// Registration succeeded but the automatic login that follows it did not.
    #[error("Account created, but signing in failed: {0}")]
    LoginAfterRegister(#[source] Box<ClientError>),

    /// A 2xx body did not match the expected shape.
    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::AuthExpired => Some(401),
            ClientError::LoginAfterRegister(inner) => inner.status(),
            _ => None,
        }
    }

    /// True for failures of the backend path (as opposed to local pre-checks).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_)
                | ClientError::Http { .. }
                | ClientError::AuthExpired
                | ClientError::Decode { .. }
        )
    }
}

/// A convenience type alias for `Result<T, ClientError>`.
pub type ClientResult<T> = Result<T, ClientError>;
