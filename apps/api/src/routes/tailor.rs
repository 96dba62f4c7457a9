//! Axum route handlers for the tailoring API.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::TailoringRecordRow;
use crate::pipeline::acquire::SourceSpec;
use crate::pipeline::{PipelineOutcome, TailorRequest};
use crate::records::RecordStore;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// JSON entry mode. At least one of `resumeId` / `resumeContent` is required;
/// job fields left out are resolved from `jobId` or fall back to
/// placeholders.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorJsonRequest {
    pub user_id: Option<Uuid>,
    pub resume_id: Option<Uuid>,
    pub resume_content: Option<String>,
    pub job_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorResponse {
    pub success: bool,
    pub tailored_resume_id: Uuid,
    pub download_url: String,
    pub markdown_url: Option<String>,
    pub score: f64,
}

impl From<PipelineOutcome> for TailorResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        TailorResponse {
            success: true,
            tailored_resume_id: outcome.record_id,
            download_url: outcome.download_url,
            markdown_url: outcome.markdown_url,
            score: outcome.score,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/tailor
///
/// Reference-based entry mode: the resume comes from a stored-file reference
/// or inline text content.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorJsonRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    let source = match (request.resume_id, request.resume_content) {
        (Some(resume_id), _) => SourceSpec::Reference { resume_id },
        (None, Some(text)) if !text.trim().is_empty() => SourceSpec::InlineText { text },
        _ => {
            return Err(AppError::BadRequest(
                "Either resumeId or resumeContent is required".to_string(),
            ))
        }
    };

    let outcome = state
        .pipeline
        .run(TailorRequest {
            user_id: request.user_id,
            source,
            job_id: request.job_id,
            job_title: request.job_title,
            company_name: request.company_name,
            job_description: request.job_description,
        })
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /api/v1/tailor/upload
///
/// Direct-upload entry mode: multipart fields `file`, `userId`, `jobTitle`,
/// `companyName`, `jobDescription`.
pub async fn handle_tailor_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TailorResponse>, AppError> {
    let mut file: Option<(Bytes, String, String)> = None;
    let mut user_id: Option<Uuid> = None;
    let mut job_id: Option<Uuid> = None;
    let mut job_title: Option<String> = None;
    let mut company_name: Option<String> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .unwrap_or("resume")
                    .to_string();
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((bytes, file_name, media_type));
            }
            "userId" => user_id = Some(parse_uuid_field(&name, field).await?),
            "jobId" => job_id = Some(parse_uuid_field(&name, field).await?),
            "jobTitle" => job_title = Some(text_field(&name, field).await?),
            "companyName" => company_name = Some(text_field(&name, field).await?),
            "jobDescription" => job_description = Some(text_field(&name, field).await?),
            _ => {} // unknown fields ignored
        }
    }

    let (bytes, file_name, media_type) =
        file.ok_or_else(|| AppError::BadRequest("Missing required field 'file'".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    let outcome = state
        .pipeline
        .run(TailorRequest {
            user_id,
            source: SourceSpec::Upload {
                bytes,
                file_name,
                media_type,
            },
            job_id,
            job_title,
            company_name,
            job_description,
        })
        .await?;

    Ok(Json(outcome.into()))
}

/// GET /api/v1/tailor/:id
///
/// Returns the stored record for a completed run.
pub async fn handle_get_tailored(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TailoringRecordRow>, AppError> {
    let record = state
        .pipeline
        .records()
        .get_tailoring_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tailored resume {id}")))?;
    Ok(Json(record))
}

async fn text_field(name: &str, field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid field '{name}': {e}")))
}

async fn parse_uuid_field(
    name: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<Uuid, AppError> {
    let text = text_field(name, field).await?;
    text.trim()
        .parse::<Uuid>()
        .map_err(|_| AppError::BadRequest(format!("Field '{name}' must be a UUID")))
}
