pub mod auth;
pub mod conversation;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod ports;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use auth::{auth_error_message, AuthOrchestrator, AuthSnapshot, AuthState};
pub use conversation::{ConversationController, Thread, FALLBACK_ANSWER};
pub use domain::{
    AnalysisResult, AnalyzedDocument, ConversationTurn, Credential, Document, DocumentId,
    Provenance, QAResponse, QASession, Role, UploadFile, UserIdentity,
};
pub use error::{ClientError, ClientResult};
pub use fallback::{DemoFallback, NoFallback};
pub use gateway::{ApiClient, DEFAULT_API_BASE_URL};
pub use ports::{FallbackPolicy, HttpTransport, PortError, PortResult, SessionStore};
pub use session::MemorySessionStore;
pub use workflow::{DocumentWorkflow, WorkflowSnapshot, WorkflowState};
