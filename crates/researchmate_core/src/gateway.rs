//! crates/researchmate_core/src/gateway.rs
//!
//! The API gateway client: the only channel to the analysis backend.
//!
//! It resolves paths against the configured base URL, attaches the bearer credential,
//! normalizes every failure into a `ClientError`, and clears the stored credential as a
//! side effect of a 401 on any endpoint other than login, provided it is still the one the
//! rejected request carried.

use crate::domain::{
    Acknowledgement, AnalysisResult, ConversationTurn, Credential, Document, DocumentId, HealthStatus,
    LoginResponse, QAResponse, QASession, QaSessionId, UploadFile, UploadResponse, UserIdentity,
};
use crate::error::{ClientError, ClientResult};
use crate::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody, SessionStore};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const LOGIN_PATH: &str = "/auth/login/json";
/// Page size the backend applies to `/qa/user` when none is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

const API_VERSION_SEGMENT: &str = "/api/v1";
const UPLOAD_FIELD: &str = "file";

//=========================================================================================
// Request Description
//=========================================================================================

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    body: RequestBody,
    versioned: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            versioned: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, field: impl Into<String>, file: UploadFile) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            file,
        };
        self
    }

    /// Resolve against the server root instead of the versioned API prefix. Such requests
    /// carry no credential, so their 401s never touch the session.
    pub fn unversioned(mut self) -> Self {
        self.versioned = false;
        self
    }

    fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart { .. })
    }
}

//=========================================================================================
// The Client
//=========================================================================================

/// Explicitly constructed backend client. Share it behind an `Arc`.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionStore>,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionStore>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            session,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Server root, i.e. the base URL without its `/api/v1` segment.
    pub fn root_url(&self) -> &str {
        self.base_url
            .strip_suffix(API_VERSION_SEGMENT)
            .unwrap_or(&self.base_url)
    }

    /// Sends `request` and decodes a successful JSON body into `T`.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let endpoint = request.path.clone();
        let response = self.execute(request).await?;
        decode(&endpoint, &response)
    }

    async fn execute(&self, request: ApiRequest) -> ClientResult<HttpResponse> {
        let multipart = request.is_multipart();
        let ApiRequest {
            method,
            path,
            body,
            versioned,
        } = request;
        let url = if versioned {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}", self.root_url(), path)
        };

        // The credential this request is sent with; a 401 may only revoke this one.
        let sent = if versioned { self.session.get() } else { None };

        let mut headers = Vec::with_capacity(2);
        if let Some(credential) = &sent {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", credential.as_str()),
            ));
        }
        // Multipart bodies get their content type (with boundary) from the transport.
        if !multipart {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        debug!(method = %method, path = %path, "Sending backend request");

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .map_err(|e| {
                warn!(method = %method, path = %path, "Transport failure: {}", e);
                ClientError::Network(e)
            })?;

        if response.is_success() {
            return Ok(response);
        }
        if response.status == 401 && versioned && path != LOGIN_PATH {
            self.revoke(&path, sent.as_ref());
            return Err(ClientError::AuthExpired);
        }
        Err(failure(&path, multipart, &response))
    }

    /// Clears the stored credential, unless it was replaced while the request was out.
    fn revoke(&self, path: &str, sent: Option<&Credential>) {
        let Some(credential) = sent else {
            return;
        };
        if self.session.clear_if(credential) {
            warn!(path = %path, "Backend rejected the credential; clearing the session.");
        } else {
            debug!(path = %path, "Rejected credential was already replaced; keeping the session.");
        }
    }

    //=====================================================================================
    // Authentication
    //=====================================================================================

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        self.request(ApiRequest::post(LOGIN_PATH).json(json!({
            "username": username,
            "password": password,
        })))
        .await
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> ClientResult<UserIdentity> {
        let mut body = json!({
            "email": email,
            "username": username,
            "password": password,
        });
        if let Some(full_name) = full_name {
            body["full_name"] = json!(full_name);
        }
        self.request(ApiRequest::post("/auth/register").json(body)).await
    }

    pub async fn current_user(&self) -> ClientResult<UserIdentity> {
        self.request(ApiRequest::get("/auth/me")).await
    }

    //=====================================================================================
    // Documents
    //=====================================================================================

    /// Uploads a file as multipart field `file`. Fails fast without a credential.
    pub async fn upload_document(&self, file: &UploadFile) -> ClientResult<UploadResponse> {
        if !self.session.has() {
            warn!(filename = %file.filename, "Upload attempted without a credential.");
            return Err(ClientError::AuthRequired);
        }
        info!(filename = %file.filename, size = file.size(), "Uploading document");
        self.request(ApiRequest::post("/documents/upload").multipart(UPLOAD_FIELD, file.clone()))
            .await
    }

    pub async fn process_document(&self, document_id: DocumentId) -> ClientResult<AnalysisResult> {
        self.request(ApiRequest::post(format!("/documents/{}/process", document_id)))
            .await
    }

    pub async fn list_documents(&self) -> ClientResult<Vec<Document>> {
        self.request(ApiRequest::get("/documents/")).await
    }

    pub async fn get_document(&self, document_id: DocumentId) -> ClientResult<Document> {
        self.request(ApiRequest::get(format!("/documents/{}", document_id)))
            .await
    }

    pub async fn get_document_analysis(&self, document_id: DocumentId) -> ClientResult<AnalysisResult> {
        self.request(ApiRequest::get(format!("/documents/{}/analysis", document_id)))
            .await
    }

    pub async fn delete_document(&self, document_id: DocumentId) -> ClientResult<Acknowledgement> {
        self.request(ApiRequest::delete(format!("/documents/{}", document_id)))
            .await
    }

    //=====================================================================================
    // Question Answering
    //=====================================================================================

    pub async fn ask_question(
        &self,
        question: &str,
        document_id: DocumentId,
        conversation_history: &[ConversationTurn],
    ) -> ClientResult<QAResponse> {
        self.request(ApiRequest::post("/qa/").json(json!({
            "question": question,
            "document_id": document_id,
            "conversation_history": conversation_history,
        })))
        .await
    }

    pub async fn get_qa_history(&self, document_id: DocumentId) -> ClientResult<Vec<QASession>> {
        self.request(ApiRequest::get(format!("/qa/document/{}", document_id)))
            .await
    }

    pub async fn get_user_qa_history(&self, skip: u32, limit: u32) -> ClientResult<Vec<QASession>> {
        self.request(ApiRequest::get(format!("/qa/user?skip={}&limit={}", skip, limit)))
            .await
    }

    pub async fn delete_qa_session(&self, session_id: QaSessionId) -> ClientResult<Acknowledgement> {
        self.request(ApiRequest::delete(format!("/qa/{}", session_id)))
            .await
    }

    //=====================================================================================
    // Health
    //=====================================================================================

    pub async fn health_check(&self) -> ClientResult<HealthStatus> {
        self.request(ApiRequest::get("/health").unversioned()).await
    }
}

//=========================================================================================
// Response Helpers
//=========================================================================================

fn failure(path: &str, multipart: bool, response: &HttpResponse) -> ClientError {
    let message = error_message(&response.body).unwrap_or_else(|| {
        if multipart {
            format!("Upload failed: {}", response.status)
        } else {
            format!("HTTP error! status: {}", response.status)
        }
    });
    warn!(path = %path, status = response.status, "Backend request failed: {}", message);
    ClientError::Http {
        status: response.status,
        message,
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, response: &HttpResponse) -> ClientResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Pulls a human-readable message out of an error body: `error` first, then `detail`.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let non_empty = |v: &Value| match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(false) => None,
        other => Some(other.to_string()),
    };
    value
        .get("error")
        .and_then(non_empty)
        .or_else(|| value.get("detail").and_then(non_empty))
}
