//! services/client/src/state.rs
//!
//! Defines the application's shared state: one gateway client and the three controllers
//! built on it, wired from the configuration.

use crate::adapters::{FileSessionStore, ReqwestTransport};
use crate::config::Config;
use crate::error::CliError;
use researchmate_core::fallback::{DemoFallback, NoFallback};
use researchmate_core::ports::{FallbackPolicy, HttpTransport, SessionStore};
use researchmate_core::{ApiClient, AuthOrchestrator, ConversationController, DocumentWorkflow};
use std::sync::Arc;

//=========================================================================================
// AppState
//=========================================================================================

/// The shared application state, created once at startup and passed to every command.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<ApiClient>,
    pub auth: Arc<AuthOrchestrator>,
    pub workflow: Arc<DocumentWorkflow>,
    pub conversation: Arc<ConversationController>,
}

impl AppState {
    /// Wires the real adapters: reqwest transport and the file-backed session store.
    pub fn from_config(config: Config) -> Result<Self, CliError> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        let session = Arc::new(FileSessionStore::new(&config.session_dir));
        Ok(Self::with_adapters(config, transport, session))
    }

    pub fn with_adapters(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        let fallback: Arc<dyn FallbackPolicy> = if config.demo_fallback {
            Arc::new(DemoFallback::new(config.fallback_delay))
        } else {
            Arc::new(NoFallback)
        };
        let client = Arc::new(ApiClient::new(transport, session, config.api_base_url.clone()));

        Self {
            auth: Arc::new(AuthOrchestrator::new(client.clone())),
            workflow: Arc::new(DocumentWorkflow::new(client.clone(), fallback)),
            conversation: Arc::new(ConversationController::new(client.clone())),
            client,
            config: Arc::new(config),
        }
    }
}
