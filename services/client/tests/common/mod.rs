//! Test helper module for client integration tests.
//!
//! Spins up an in-process stub of the analysis backend with axum and wires the real
//! reqwest transport and file session store against it.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use client_lib::{
    adapters::{FileSessionStore, ReqwestTransport},
    cli::{commands, Cli},
    config::Config,
    error::CliError,
    state::AppState,
};
use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const CREATED_AT: &str = "2024-05-01T08:00:00";

//=========================================================================================
// Stub Backend
//=========================================================================================

pub struct StubUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

pub struct StubDocument {
    pub id: i64,
    pub owner: i64,
    pub filename: String,
    pub size: usize,
    pub status: &'static str,
}

#[derive(Default)]
pub struct BackendData {
    pub users: Vec<StubUser>,
    pub tokens: HashMap<String, i64>,
    pub documents: Vec<StubDocument>,
    pub qa_sessions: Vec<Value>,
    /// `conversation_history` length of every question received, in order.
    pub history_lengths: Vec<usize>,
    pub uploads: usize,
    pub fail_processing: bool,
    next_id: i64,
}

impl BackendData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

type Shared = Arc<Mutex<BackendData>>;

pub struct StubBackend {
    pub base_url: String,
    pub data: Shared,
}

impl StubBackend {
    pub async fn spawn() -> Self {
        let data: Shared = Arc::new(Mutex::new(BackendData::default()));

        let api = Router::new()
            .route("/auth/login/json", post(login))
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .route("/documents/", get(list_documents))
            .route("/documents/upload", post(upload))
            .route("/documents/{id}", get(get_document).delete(delete_document))
            .route("/documents/{id}/process", post(process))
            .route("/documents/{id}/analysis", get(get_analysis))
            .route("/qa/", post(ask))
            .route("/qa/user", get(user_history))
            .route("/qa/document/{id}", get(document_history))
            .route("/qa/{id}", axum::routing::delete(delete_qa));
        let app = Router::new()
            .route("/health", get(health))
            .nest("/api/v1", api)
            .with_state(data.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api/v1", addr),
            data,
        }
    }

    pub fn add_user(&self, username: &str, password: &str) -> i64 {
        let mut data = self.data.lock().unwrap();
        let id = data.next_id();
        data.users.push(StubUser {
            id,
            email: format!("{}@example.edu", username),
            username: username.to_string(),
            password: password.to_string(),
            full_name: None,
        });
        id
    }

    /// Invalidates every issued token, as an expiry would.
    pub fn revoke_tokens(&self) {
        self.data.lock().unwrap().tokens.clear();
    }

    pub fn fail_processing(&self) {
        self.data.lock().unwrap().fail_processing = true;
    }

    pub fn uploads(&self) -> usize {
        self.data.lock().unwrap().uploads
    }

    pub fn history_lengths(&self) -> Vec<usize> {
        self.data.lock().unwrap().history_lengths.clone()
    }
}

/// A base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/v1", addr)
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authenticate(data: &Shared, headers: &HeaderMap) -> Result<i64, Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let data = data.lock().unwrap();
    token
        .and_then(|t| data.tokens.get(&t).copied())
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

fn user_json(user: &StubUser) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "full_name": user.full_name,
        "is_active": true,
        "created_at": CREATED_AT
    })
}

fn document_json(doc: &StubDocument) -> Value {
    json!({
        "id": doc.id,
        "filename": format!("stored-{}.pdf", doc.id),
        "original_filename": doc.filename,
        "file_size": doc.size,
        "processing_status": doc.status,
        "word_count": null,
        "page_count": null,
        "created_at": CREATED_AT,
        "processed_at": null
    })
}

fn analysis_json(doc: &StubDocument) -> Value {
    json!({
        "document_id": doc.id,
        "summary": {
            "id": 1,
            "summary_text": format!("Stub summary of {}", doc.filename),
            "bullet_points": ["First point", "Second point"],
            "created_at": CREATED_AT,
            "document_id": doc.id
        },
        "keywords": [
            {"id": 1, "keyword": "graphs", "score": 0.9, "extraction_method": "tfidf", "created_at": CREATED_AT, "document_id": doc.id}
        ],
        "processing_status": "completed",
        "error_message": null
    })
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "ResearchMate API", "version": "1.0.0"}))
}

async fn login(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = data.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let Some(id) = data
        .users
        .iter()
        .find(|u| u.username == username && u.password == password)
        .map(|u| u.id)
    else {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    };
    let token = format!("token-{}-{}", id, data.next_id());
    data.tokens.insert(token.clone(), id);
    Json(json!({"access_token": token, "token_type": "bearer"})).into_response()
}

async fn register(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut data = data.lock().unwrap();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    if data.users.iter().any(|u| u.email == email || u.username == username) {
        return detail(StatusCode::BAD_REQUEST, "Email or username already registered");
    }
    let id = data.next_id();
    let user = StubUser {
        id,
        email,
        username,
        password: body["password"].as_str().unwrap_or_default().to_string(),
        full_name: body["full_name"].as_str().map(str::to_string),
    };
    let response = user_json(&user);
    data.users.push(user);
    Json(response).into_response()
}

async fn me(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let id = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let data = data.lock().unwrap();
    match data.users.iter().find(|u| u.id == id) {
        Some(user) => Json(user_json(user)).into_response(),
        None => detail(StatusCode::NOT_FOUND, "User not found"),
    }
}

async fn upload(State(data): State<Shared>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut file = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            file = Some((filename, content_type, size));
        }
    }
    let Some((filename, content_type, size)) = file else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "Field required");
    };
    if content_type != "application/pdf" {
        return detail(StatusCode::BAD_REQUEST, "Only PDF files are allowed");
    }

    let mut data = data.lock().unwrap();
    data.uploads += 1;
    let id = data.next_id();
    data.documents.push(StubDocument {
        id,
        owner,
        filename: filename.clone(),
        size,
        status: "uploaded",
    });
    Json(json!({
        "success": true,
        "document_id": id,
        "filename": filename,
        "message": "File uploaded successfully"
    }))
    .into_response()
}

async fn process(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut data = data.lock().unwrap();
    if data.fail_processing {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Error processing document");
    }
    match data.documents.iter_mut().find(|d| d.id == id && d.owner == owner) {
        Some(doc) => {
            doc.status = "completed";
            Json(analysis_json(doc)).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn list_documents(State(data): State<Shared>, headers: HeaderMap) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let data = data.lock().unwrap();
    let docs: Vec<Value> = data
        .documents
        .iter()
        .filter(|d| d.owner == owner)
        .map(document_json)
        .collect();
    Json(Value::Array(docs)).into_response()
}

async fn get_document(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let data = data.lock().unwrap();
    match data.documents.iter().find(|d| d.id == id && d.owner == owner) {
        Some(doc) => Json(document_json(doc)).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn get_analysis(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let data = data.lock().unwrap();
    match data.documents.iter().find(|d| d.id == id && d.owner == owner) {
        Some(doc) if doc.status == "completed" => Json(analysis_json(doc)).into_response(),
        Some(_) => detail(StatusCode::NOT_FOUND, "Analysis not found"),
        None => detail(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn delete_document(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut data = data.lock().unwrap();
    let before = data.documents.len();
    data.documents.retain(|d| !(d.id == id && d.owner == owner));
    if data.documents.len() == before {
        return detail(StatusCode::NOT_FOUND, "Document not found");
    }
    Json(json!({"success": true, "message": "Document deleted successfully"})).into_response()
}

async fn ask(State(data): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut data = data.lock().unwrap();
    let document_id = body["document_id"].as_i64().unwrap_or_default();
    if !data.documents.iter().any(|d| d.id == document_id && d.owner == owner) {
        return detail(StatusCode::NOT_FOUND, "Document not found");
    }
    let history = body["conversation_history"].as_array().map(Vec::len).unwrap_or_default();
    data.history_lengths.push(history);

    let question = body["question"].as_str().unwrap_or_default().to_string();
    let answer = format!("Answer {} to: {}", data.history_lengths.len(), question);
    let id = data.next_id();
    data.qa_sessions.push(json!({
        "id": id,
        "question": question,
        "answer": answer,
        "confidence_score": 0.9,
        "created_at": CREATED_AT,
        "document_id": document_id,
        "owner": owner
    }));
    Json(json!({
        "question": question,
        "answer": answer,
        "confidence_score": 0.9,
        "context_used": "stub context"
    }))
    .into_response()
}

async fn document_history(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let data = data.lock().unwrap();
    let sessions: Vec<Value> = data
        .qa_sessions
        .iter()
        .filter(|s| s["document_id"] == id && s["owner"] == owner)
        .cloned()
        .collect();
    Json(Value::Array(sessions)).into_response()
}

async fn user_history(
    State(data): State<Shared>,
    headers: HeaderMap,
    Query(page): Query<HashMap<String, usize>>,
) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let skip = page.get("skip").copied().unwrap_or(0);
    let limit = page.get("limit").copied().unwrap_or(100);
    let data = data.lock().unwrap();
    let sessions: Vec<Value> = data
        .qa_sessions
        .iter()
        .filter(|s| s["owner"] == owner)
        .skip(skip)
        .take(limit)
        .cloned()
        .collect();
    Json(Value::Array(sessions)).into_response()
}

async fn delete_qa(State(data): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let owner = match authenticate(&data, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut data = data.lock().unwrap();
    let before = data.qa_sessions.len();
    data.qa_sessions.retain(|s| !(s["id"] == id && s["owner"] == owner));
    if data.qa_sessions.len() == before {
        return detail(StatusCode::NOT_FOUND, "QA session not found");
    }
    Json(json!({"success": true, "message": "QA session deleted successfully"})).into_response()
}

//=========================================================================================
// Client Under Test
//=========================================================================================

/// One user profile: a session directory shared by every simulated CLI invocation.
pub struct TestClient {
    pub base_url: String,
    pub demo_fallback: bool,
    pub session_dir: TempDir,
}

impl TestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            demo_fallback: true,
            session_dir: tempfile::tempdir().expect("Failed to create session dir"),
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.demo_fallback = false;
        self
    }

    pub fn config(&self) -> Config {
        Config {
            api_base_url: self.base_url.clone(),
            log_level: tracing::Level::INFO,
            session_dir: self.session_dir.path().to_path_buf(),
            request_timeout: Duration::from_secs(5),
            demo_fallback: self.demo_fallback,
            fallback_delay: Duration::from_millis(10),
        }
    }

    /// A fresh application state, as a new process would build it.
    pub fn state(&self) -> AppState {
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
        let session = Arc::new(FileSessionStore::new(self.session_dir.path()));
        AppState::with_adapters(self.config(), transport, session)
    }

    pub fn token_path(&self) -> PathBuf {
        self.session_dir.path().join("access_token")
    }

    /// Runs one CLI invocation with `stdin` as its input; returns the result and stdout.
    pub async fn run(&self, args: &[&str], stdin: &str) -> (Result<(), CliError>, String) {
        let cli = Cli::parse_from(std::iter::once("researchmate").chain(args.iter().copied()));
        let state = self.state();
        let mut input = stdin.as_bytes();
        let mut out = Vec::new();
        let result = commands::run(&state, cli.command, &mut input, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    pub async fn sign_in(&self, username: &str, password: &str) {
        let (result, _) = self.run(&["login", username, "--password", password], "").await;
        result.expect("login failed");
    }
}

pub fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
