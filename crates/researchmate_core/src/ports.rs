//! crates/researchmate_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client core depends on.
//! These traits are the boundary of the hexagonal architecture: the controllers only see
//! these abstractions, so tests and alternative front ends can substitute their own
//! transport, storage, or fallback behaviour without global state.

use crate::domain::{AnalysisResult, Credential, UploadFile};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Failure of a port to produce any result at all (no HTTP response, broken pipe, ...).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// HTTP Transport Port
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// A single file part. The transport sets the multipart content type and boundary.
    Multipart { field: String, file: UploadFile },
}

/// A fully resolved request, ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Any response the server produced, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request. Non-2xx statuses are returned as `Ok`; only the absence of a
    /// response is an error.
    async fn send(&self, request: HttpRequest) -> PortResult<HttpResponse>;
}

//=========================================================================================
// Session Store Port
//=========================================================================================

/// Holds the single active bearer credential.
///
/// Implementations must never panic: `has` returns `false` when the backing storage is
/// unavailable (e.g. before the environment is ready).
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential);
    fn clear(&self);

    fn has(&self) -> bool {
        self.get().is_some()
    }

    /// Clears the store only while it still holds `credential`. Returns whether it did.
    fn clear_if(&self, credential: &Credential) -> bool {
        if self.get().as_ref() == Some(credential) {
            self.clear();
            true
        } else {
            false
        }
    }
}

//=========================================================================================
// Fallback Policy Port
//=========================================================================================

/// Decides what the document workflow does when the backend path fails.
pub trait FallbackPolicy: Send + Sync {
    /// Returns the substitute result, or `None` to surface the failure instead.
    fn synthesize(&self, file: &UploadFile) -> Option<AnalysisResult>;

    /// How long to wait before publishing the substitute result.
    fn delay(&self) -> Duration;
}
