use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per successful tailoring run. Created exactly once; this service
/// never updates it (download counters etc. belong to other features).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TailoringRecordRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    /// The stored-file reference the run started from, when reference-based.
    pub source_resume_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
    pub tailored_markdown: String,
    pub s3_pdf_key: String,
    pub s3_markdown_key: Option<String>,
    pub status: String,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// Job record consulted when the caller supplies `jobId` but no job fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
}

/// Newer stored-file shape: uploads tracked with an explicit bucket + key.
#[derive(Debug, Clone, FromRow)]
pub struct UploadedFileRow {
    pub id: Uuid,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Older stored-file shape: resumes tracked by public URL only. The storage
/// key must be recovered from the URL path.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeFileRow {
    pub id: Uuid,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}
