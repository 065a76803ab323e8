//! crates/researchmate_core/src/conversation.rs
//!
//! The conversation controller: one question/answer thread for the active document.
//! The local turn sequence is what gets displayed and sent back as history; the
//! backend's stored sessions are a separate source and are never merged into it.

use crate::domain::{Acknowledgement, ConversationTurn, DocumentId, QAResponse, QASession, QaSessionId};
use crate::error::{ClientError, ClientResult};
use crate::gateway::ApiClient;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Assistant turn appended when a question could not be answered.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while processing your question. Please try again.";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Thread {
    pub document_id: Option<DocumentId>,
    pub turns: Vec<ConversationTurn>,
}

pub struct ConversationController {
    client: Arc<ApiClient>,
    thread: watch::Sender<Thread>,
}

impl ConversationController {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (thread, _) = watch::channel(Thread::default());
        Self { client, thread }
    }

    pub fn subscribe(&self) -> watch::Receiver<Thread> {
        self.thread.subscribe()
    }

    pub fn active_document(&self) -> Option<DocumentId> {
        self.thread.borrow().document_id
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.thread.borrow().turns.clone()
    }

    /// Switching to a different document starts an empty thread.
    pub fn set_active_document(&self, document_id: Option<DocumentId>) {
        self.thread.send_if_modified(|thread| {
            if thread.document_id == document_id {
                return false;
            }
            thread.document_id = document_id;
            thread.turns.clear();
            true
        });
    }

    /// Empties the thread. The active document is kept.
    pub fn clear(&self) {
        self.thread.send_modify(|thread| thread.turns.clear());
    }

    /// Asks `question` about the active document.
    ///
    /// The user turn is appended before the request goes out, and every turn before it is
    /// sent as history. On failure a fixed assistant turn is appended and the error is
    /// still returned.
    pub async fn ask(&self, question: &str) -> ClientResult<QAResponse> {
        let Some(document_id) = self.active_document() else {
            return Err(ClientError::NoDocumentSelected);
        };
        if question.trim().is_empty() {
            return Err(ClientError::Validation("Question must not be empty".to_string()));
        }

        let mut history = Vec::new();
        self.thread.send_modify(|thread| {
            history = thread.turns.clone();
            thread.turns.push(ConversationTurn::user(question));
        });
        debug!(document_id, history = history.len(), "Asking question");

        let answer = self.client.ask_question(question, document_id, &history).await;
        let reply = match &answer {
            Ok(response) => ConversationTurn::assistant(response.answer.clone()),
            Err(e) => {
                warn!(document_id, "Question failed: {}", e);
                ConversationTurn::assistant(FALLBACK_ANSWER)
            }
        };

        // A reply that arrives after the user switched documents belongs to no thread.
        self.thread.send_if_modified(|thread| {
            if thread.document_id != Some(document_id) {
                return false;
            }
            thread.turns.push(reply);
            true
        });
        answer
    }

    //=====================================================================================
    // Stored Sessions
    //=====================================================================================

    /// The backend's stored question/answer sessions for the active document.
    pub async fn backend_history(&self) -> ClientResult<Vec<QASession>> {
        let document_id = self.active_document().ok_or(ClientError::NoDocumentSelected)?;
        self.client.get_qa_history(document_id).await
    }

    pub async fn delete_backend_session(&self, session_id: QaSessionId) -> ClientResult<Acknowledgement> {
        let ack = self.client.delete_qa_session(session_id).await?;
        info!(session_id, "Deleted stored Q&A session.");
        Ok(ack)
    }
}
