//! services/client/src/error.rs
//!
//! Defines the primary error type for the command-line client.

use crate::config::ConfigError;
use researchmate_core::error::ClientError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the client core.
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Represents a standard Input/Output error (e.g., reading the PDF or the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Sign-in or registration failed; the text is meant for the user.
    #[error("{0}")]
    Auth(String),

    /// The command needs a signed-in session.
    #[error("Not signed in. Run `researchmate login` first.")]
    NotSignedIn,

    /// A file the user pointed at cannot be used.
    #[error("{0}")]
    InvalidInput(String),
}
