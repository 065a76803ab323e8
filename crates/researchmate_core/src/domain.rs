//! crates/researchmate_core/src/domain.rs
//!
//! Defines the core data structures exchanged with the analysis backend.
//! Field names follow the backend's snake_case JSON so the same types serve as
//! both the domain model and the wire contract.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type DocumentId = i64;
pub type QaSessionId = i64;

/// The only media type the upload workflow accepts.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

//=========================================================================================
// Session and Identity
//=========================================================================================

/// An opaque bearer token. Exactly one may be active per client instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in log lines through `{:?}`; never print the secret.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The identity of the signed-in user, as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Payload returned by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

//=========================================================================================
// Documents and Analysis
//=========================================================================================

/// Processing state of a document as tracked by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessingStatus::Uploaded => "uploaded",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        };
        f.pad(label)
    }
}

/// A PDF stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(rename = "file_size")]
    pub size: u64,
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub char_count: Option<u64>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub id: Option<i64>,
    pub summary_text: String,
    #[serde(default)]
    pub bullet_points: Option<Vec<String>>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(default)]
    pub id: Option<i64>,
    pub keyword: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub extraction_method: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub document_id: Option<DocumentId>,
}

/// The terminal artifact attached to a document once processing finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document_id: DocumentId,
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    pub processing_status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Where an `AnalysisResult` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Produced by the backend's processing pipeline.
    Backend,
    /// Substituted locally by the fallback policy after a failure.
    Synthetic,
}

/// A finished run of the document workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedDocument {
    pub document_id: DocumentId,
    pub result: AnalysisResult,
    pub provenance: Provenance,
}

impl AnalyzedDocument {
    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }
}

/// Response of `POST /documents/upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    pub filename: String,
    pub message: String,
    #[serde(default)]
    pub processing_job_id: Option<i64>,
}

/// A file picked by the user, ready to be sent as a multipart part.
#[derive(Clone)]
pub struct UploadFile {
    pub filename: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

//=========================================================================================
// Question Answering
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the local conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One assistant answer. Never persisted beyond the in-memory thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAResponse {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub context_used: Option<String>,
}

/// A question/answer pair as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QASession {
    pub id: QaSessionId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub document_id: DocumentId,
}

//=========================================================================================
// Misc Backend Payloads
//=========================================================================================

/// Generic `{success, message}` body returned by delete endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}

//=========================================================================================
// Timestamp (de)serialization
//=========================================================================================

/// The backend emits ISO-8601 timestamps, sometimes without an offset.
/// Offset-less values are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Utc.from_utc_datetime(&naive)),
        }
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
