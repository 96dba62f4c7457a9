use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Which external capability a transport-level failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Tailoring,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Tailoring => "tailoring",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level error type covering the full pipeline taxonomy.
///
/// Implements `IntoResponse` so axum handlers can return `Result<T, AppError>`.
/// Failures are always transport-200: success/failure is signaled in-body so
/// the frontend only ever parses one envelope shape.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing or invalid field: {0}")]
    BadRequest(String),

    #[error("Reference carries no resolvable storage locator: {0}")]
    ReferenceInvalid(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction produced no usable text ({len} chars)")]
    ExtractionEmpty { len: usize },

    #[error("Tailoring produced no usable document ({len} chars)")]
    TailoringEmpty { len: usize },

    #[error("External {stage} service error (status {status:?}): {detail}")]
    ExternalService {
        stage: Stage,
        status: Option<u16>,
        detail: String,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code surfaced to the client.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ReferenceInvalid(_) => "REFERENCE_INVALID",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ExtractionEmpty { .. } => "EXTRACTION_EMPTY",
            AppError::TailoringEmpty { .. } => "TAILORING_EMPTY",
            AppError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            AppError::Render(_) => "RENDER_ERROR",
            AppError::StorageWriteFailed(_) => "STORAGE_WRITE_FAILED",
            AppError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short human-readable message, safe to show to end users.
    fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::ReferenceInvalid(_) => {
                "The referenced resume could not be resolved".to_string()
            }
            AppError::NotFound(what) => format!("{what} was not found"),
            AppError::ExtractionEmpty { .. } => {
                "We could not read any text from the uploaded resume".to_string()
            }
            AppError::TailoringEmpty { .. } => {
                "The tailoring step returned an empty document".to_string()
            }
            AppError::ExternalService { stage, .. } => {
                format!("The {} service is currently unavailable", stage.as_str())
            }
            AppError::Render(_) => "The PDF could not be generated".to_string(),
            AppError::StorageWriteFailed(_) => "The PDF could not be saved".to_string(),
            AppError::PersistenceFailed(_) => "The result could not be recorded".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4();
        let code = self.code();
        let technical = self.to_string();

        tracing::error!(%request_id, code, "request failed: {technical}");

        let mut body = json!({
            "success": false,
            "error": self.user_message(),
            "errorCode": code,
            "technicalError": technical,
            "requestId": request_id,
        });

        if let AppError::ExternalService { stage, status, .. } = &self {
            body["stage"] = json!(stage.as_str());
            body["providerStatus"] = json!(status);
        }

        // Transport is always 200; failure is signaled in-body.
        Json(body).into_response()
    }
}
