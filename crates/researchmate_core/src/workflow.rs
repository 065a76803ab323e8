//! crates/researchmate_core/src/workflow.rs
//!
//! The document workflow controller. Drives one PDF through
//! `idle -> uploading -> uploaded -> analyzing -> completed | failed` and publishes every
//! transition through a `watch` channel.
//!
//! Backend failures during upload or processing are handed to the injected
//! `FallbackPolicy`. A substituted result is tagged `Provenance::Synthetic` and the
//! original failure stays visible in `WorkflowSnapshot::last_error`.

use crate::domain::{
    Acknowledgement, AnalysisResult, AnalyzedDocument, Document, DocumentId, Provenance,
    UploadFile,
};
use crate::error::{ClientError, ClientResult};
use crate::gateway::ApiClient;
use crate::ports::FallbackPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info, warn};

/// Cadence of the cosmetic progress ticker.
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
/// The ticker approaches this value but never reaches it.
pub const PROGRESS_CEILING: f32 = 95.0;

//=========================================================================================
// Published State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Uploading,
    Uploaded,
    Analyzing,
    Completed,
    Failed,
}

impl WorkflowState {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            WorkflowState::Uploading | WorkflowState::Uploaded | WorkflowState::Analyzing
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    /// Cosmetic percentage in `0.0..=100.0`. Not derived from bytes transferred.
    pub progress: f32,
    pub document_id: Option<DocumentId>,
    pub filename: Option<String>,
    pub outcome: Option<AnalyzedDocument>,
    /// Message of the failure that ended the run, or that triggered the fallback.
    pub last_error: Option<String>,
}

impl WorkflowSnapshot {
    pub fn is_uploading(&self) -> bool {
        self.state == WorkflowState::Uploading
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, WorkflowState::Uploaded | WorkflowState::Analyzing)
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct DocumentWorkflow {
    client: Arc<ApiClient>,
    fallback: Arc<dyn FallbackPolicy>,
    snapshot: Arc<watch::Sender<WorkflowSnapshot>>,
}

impl DocumentWorkflow {
    pub fn new(client: Arc<ApiClient>, fallback: Arc<dyn FallbackPolicy>) -> Self {
        let (snapshot, _) = watch::channel(WorkflowSnapshot::default());
        Self {
            client,
            fallback,
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> WorkflowState {
        self.snapshot.borrow().state
    }

    pub fn is_uploading(&self) -> bool {
        self.snapshot.borrow().is_uploading()
    }

    pub fn is_processing(&self) -> bool {
        self.snapshot.borrow().is_processing()
    }

    /// Returns to `idle`. Refused while a run is in flight.
    pub fn reset(&self) -> ClientResult<()> {
        let mut busy = false;
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.state.is_in_flight() {
                busy = true;
                return false;
            }
            *snapshot = WorkflowSnapshot::default();
            true
        });
        if busy {
            Err(ClientError::WorkflowBusy)
        } else {
            Ok(())
        }
    }

    /// Uploads `file`, processes it, and returns the analysis.
    pub async fn upload(&self, file: UploadFile) -> ClientResult<AnalyzedDocument> {
        if !file.is_pdf() {
            warn!(filename = %file.filename, media_type = %file.media_type, "Rejected non-PDF upload.");
            return Err(ClientError::UnsupportedFileType(file.media_type.clone()));
        }
        self.begin(&file)?;
        info!(filename = %file.filename, size = file.size(), "Document workflow started.");

        // --- 1. Upload, with the cosmetic ticker running alongside ---
        let token = CancellationToken::new();
        let _run = RunGuard {
            snapshot: self.snapshot.clone(),
            _ticker: token.clone().drop_guard(),
        };
        let ticker = tokio::spawn(run_progress_ticker(self.snapshot.clone(), token.clone()));
        let uploaded = self.client.upload_document(&file).await;
        token.cancel();
        if let Err(e) = ticker.await {
            warn!("Progress ticker ended abnormally: {}", e);
        }
        self.snapshot.send_modify(|snapshot| snapshot.progress = 100.0);

        let response = match uploaded {
            Ok(response) => response,
            Err(e) => return self.recover(&file, e).await,
        };
        let document_id = match response.document_id {
            Some(id) if response.success => id,
            _ => {
                let e = ClientError::Decode {
                    endpoint: "/documents/upload".to_string(),
                    reason: if response.message.is_empty() {
                        "Upload failed".to_string()
                    } else {
                        response.message
                    },
                };
                return self.recover(&file, e).await;
            }
        };

        // --- 2. Process the stored document ---
        self.transition(WorkflowState::Uploaded, Some(document_id));
        self.transition(WorkflowState::Analyzing, Some(document_id));
        info!(document_id, "Document uploaded; processing.");

        match self.client.process_document(document_id).await {
            Ok(result) => Ok(self.complete(document_id, result, Provenance::Backend, None)),
            Err(e) => self.recover(&file, e).await,
        }
    }

    fn begin(&self, file: &UploadFile) -> ClientResult<()> {
        let mut started = false;
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.state.is_in_flight() {
                return false;
            }
            *snapshot = WorkflowSnapshot {
                state: WorkflowState::Uploading,
                filename: Some(file.filename.clone()),
                ..WorkflowSnapshot::default()
            };
            started = true;
            true
        });
        if started {
            Ok(())
        } else {
            Err(ClientError::WorkflowBusy)
        }
    }

    fn transition(&self, state: WorkflowState, document_id: Option<DocumentId>) {
        self.snapshot.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.document_id = document_id;
        });
    }

    /// Hands a backend failure to the fallback policy. Client-side pre-check failures,
    /// and every failure when the policy declines, end the run as `failed`.
    async fn recover(&self, file: &UploadFile, cause: ClientError) -> ClientResult<AnalyzedDocument> {
        if !cause.is_backend_failure() {
            return Err(self.fail(cause));
        }
        let Some(result) = self.fallback.synthesize(file) else {
            return Err(self.fail(cause));
        };

        warn!(filename = %file.filename, "Analysis failed ({}); substituting a synthetic result.", cause);
        let document_id = self.snapshot.borrow().document_id;
        self.transition(WorkflowState::Analyzing, document_id);
        tokio::time::sleep(self.fallback.delay()).await;

        Ok(self.complete(
            result.document_id,
            result,
            Provenance::Synthetic,
            Some(cause.to_string()),
        ))
    }

    fn complete(
        &self,
        document_id: DocumentId,
        result: AnalysisResult,
        provenance: Provenance,
        cause: Option<String>,
    ) -> AnalyzedDocument {
        let analyzed = AnalyzedDocument {
            document_id,
            result,
            provenance,
        };
        self.snapshot.send_modify(|snapshot| {
            snapshot.state = WorkflowState::Completed;
            snapshot.progress = 100.0;
            snapshot.document_id = Some(document_id);
            snapshot.outcome = Some(analyzed.clone());
            snapshot.last_error = cause;
        });
        info!(document_id, ?provenance, "Document analysis completed.");
        analyzed
    }

    fn fail(&self, cause: ClientError) -> ClientError {
        error!("Document workflow failed: {}", cause);
        let message = cause.to_string();
        self.snapshot.send_modify(|snapshot| {
            snapshot.state = WorkflowState::Failed;
            snapshot.last_error = Some(message);
        });
        cause
    }

    //=====================================================================================
    // Stored Documents
    //=====================================================================================

    pub async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        self.client.list_documents().await
    }

    pub async fn document(&self, document_id: DocumentId) -> ClientResult<Document> {
        self.client.get_document(document_id).await
    }

    pub async fn analysis(&self, document_id: DocumentId) -> ClientResult<AnalysisResult> {
        self.client.get_document_analysis(document_id).await
    }

    pub async fn delete_document(&self, document_id: DocumentId) -> ClientResult<Acknowledgement> {
        let ack = self.client.delete_document(document_id).await?;
        info!(document_id, "Document deleted.");
        Ok(ack)
    }
}

//=========================================================================================
// Progress Ticker
//=========================================================================================

/// Held for the whole of `upload`. If the caller drops the future mid-run, this stops the
/// ticker and moves the still in-flight snapshot to `failed` so the controller is usable again.
struct RunGuard {
    snapshot: Arc<watch::Sender<WorkflowSnapshot>>,
    _ticker: DropGuard,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.snapshot.send_if_modified(|snapshot| {
            if !snapshot.state.is_in_flight() {
                return false;
            }
            warn!(state = ?snapshot.state, "Document workflow abandoned before it finished.");
            snapshot.state = WorkflowState::Failed;
            snapshot.last_error = Some("Upload cancelled before it finished".to_string());
            true
        });
    }
}

fn next_progress(progress: f32) -> f32 {
    progress + (PROGRESS_CEILING - progress) / 4.0
}

async fn run_progress_ticker(snapshot: Arc<watch::Sender<WorkflowSnapshot>>, token: CancellationToken) {
    let mut interval = tokio::time::interval(PROGRESS_TICK);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                snapshot.send_if_modified(|snapshot| {
                    if snapshot.state != WorkflowState::Uploading {
                        return false;
                    }
                    snapshot.progress = next_progress(snapshot.progress);
                    true
                });
            }
        }
    }
}
