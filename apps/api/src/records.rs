//! Record-store seam over Postgres. Only the handful of tables the pipeline
//! reads/writes are modeled here; the wider application schema is owned by
//! other services.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{JobRow, ResumeFileRow, TailoringRecordRow, UploadedFileRow};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// Read-path failures (job/file lookups) are internal faults; only the
// record insert maps to `PersistenceFailed`, which the pipeline does
// explicitly at the insert site.
impl From<RecordError> for crate::errors::AppError {
    fn from(e: RecordError) -> Self {
        crate::errors::AppError::Internal(e.into())
    }
}

impl RecordError {
    /// Unwraps the underlying database error for the one call site that
    /// reports it as a persistence failure.
    pub fn into_database_error(self) -> sqlx::Error {
        match self {
            RecordError::Database(e) => e,
        }
    }
}

/// A stored-file reference as recorded historically. Either `key` (newer
/// rows) or `url` (older rows) may be present; a row with neither is an
/// invalid reference.
#[derive(Debug, Clone, Default)]
pub struct StoredFileRef {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub url: Option<String>,
    pub file_name: Option<String>,
    pub media_type: Option<String>,
}

/// Fields for the single row inserted per successful run.
#[derive(Debug, Clone)]
pub struct NewTailoringRecord {
    pub user_id: Option<Uuid>,
    pub source_resume_id: Option<Uuid>,
    pub job_title: String,
    pub company_name: String,
    pub job_description: String,
    pub tailored_markdown: String,
    pub s3_pdf_key: String,
    pub s3_markdown_key: Option<String>,
    pub score: f64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_job(&self, id: Uuid) -> Result<Option<JobRow>, RecordError>;

    /// Resolves a stored-file reference, consulting both historical record
    /// shapes: `uploaded_files` (bucket + key) first, then `resumes` (URL).
    async fn find_stored_file(&self, id: Uuid) -> Result<Option<StoredFileRef>, RecordError>;

    async fn insert_tailoring_record(
        &self,
        record: NewTailoringRecord,
    ) -> Result<Uuid, RecordError>;

    async fn get_tailoring_record(
        &self,
        id: Uuid,
    ) -> Result<Option<TailoringRecordRow>, RecordError>;
}

pub struct PgRecords {
    pool: PgPool,
}

impl PgRecords {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecords {
    async fn find_job(&self, id: Uuid) -> Result<Option<JobRow>, RecordError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT id, title, company, description FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_stored_file(&self, id: Uuid) -> Result<Option<StoredFileRef>, RecordError> {
        let uploaded = sqlx::query_as::<_, UploadedFileRow>(
            "SELECT id, s3_bucket, s3_key, file_name, mime_type FROM uploaded_files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = uploaded {
            return Ok(Some(StoredFileRef {
                bucket: row.s3_bucket,
                key: row.s3_key,
                url: None,
                file_name: row.file_name,
                media_type: row.mime_type,
            }));
        }

        let resume = sqlx::query_as::<_, ResumeFileRow>(
            "SELECT id, file_url, file_name, mime_type FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(resume.map(|row| StoredFileRef {
            bucket: None,
            key: None,
            url: row.file_url,
            file_name: row.file_name,
            media_type: row.mime_type,
        }))
    }

    async fn insert_tailoring_record(
        &self,
        record: NewTailoringRecord,
    ) -> Result<Uuid, RecordError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tailored_resumes
                (id, user_id, source_resume_id, job_title, company_name, job_description,
                 tailored_markdown, s3_pdf_key, s3_markdown_key, status, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'completed', $10)
            "#,
        )
        .bind(id)
        .bind(record.user_id)
        .bind(record.source_resume_id)
        .bind(&record.job_title)
        .bind(&record.company_name)
        .bind(&record.job_description)
        .bind(&record.tailored_markdown)
        .bind(&record.s3_pdf_key)
        .bind(&record.s3_markdown_key)
        .bind(record.score)
        .execute(&self.pool)
        .await?;

        info!("Inserted tailoring record {id}");
        Ok(id)
    }

    async fn get_tailoring_record(
        &self,
        id: Uuid,
    ) -> Result<Option<TailoringRecordRow>, RecordError> {
        Ok(
            sqlx::query_as::<_, TailoringRecordRow>(
                "SELECT * FROM tailored_resumes WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?,
        )
    }
}
