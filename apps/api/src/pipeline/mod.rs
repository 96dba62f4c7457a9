//! Pipeline orchestrator — the full tailoring flow.
//!
//! Flow: acquire source → extract text → tailor content → sanitize → render
//! → persist. Strictly linear; both entry modes (direct upload vs. stored
//! reference) collapse into the same sequence after acquisition. Any step's
//! failure short-circuits; there are no automatic retries — resubmission is
//! always safe because every run writes under fresh unique keys.

pub mod acquire;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::TextExtractor;
use crate::pipeline::acquire::{acquire_source, SourceSpec};
use crate::records::{NewTailoringRecord, RecordStore};
use crate::render::{render_markdown, RenderOptions};
use crate::sanitize::sanitize_markdown;
use crate::scoring::keyword_match_score;
use crate::storage::ObjectStore;
use crate::tailoring::{ContentTailor, JobContext};

/// One tailoring request, already past transport-level parsing. Job fields
/// left `None` are resolved from the job record (when `job_id` is present)
/// or fall back to placeholders.
#[derive(Debug, Clone)]
pub struct TailorRequest {
    pub user_id: Option<Uuid>,
    pub source: SourceSpec,
    pub job_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub job_description: Option<String>,
}

/// Result of a successful run. `markdown_url` is `None` when the best-effort
/// markdown export upload failed — the primary deliverable is unaffected.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record_id: Uuid,
    pub download_url: String,
    pub markdown_url: Option<String>,
    pub score: f64,
    pub page_count: usize,
}

/// All collaborators injected explicitly so tests can substitute fakes.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    extractor: Arc<dyn TextExtractor>,
    tailor: Arc<dyn ContentTailor>,
    primary_bucket: String,
    fallback_bucket: String,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        extractor: Arc<dyn TextExtractor>,
        tailor: Arc<dyn ContentTailor>,
        primary_bucket: String,
        fallback_bucket: String,
    ) -> Self {
        Self {
            store,
            records,
            extractor,
            tailor,
            primary_bucket,
            fallback_bucket,
        }
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    /// Runs the full pipeline for one request.
    pub async fn run(&self, request: TailorRequest) -> Result<PipelineOutcome, AppError> {
        let job = self.resolve_job(&request).await?;
        info!(
            "Tailoring for '{}' at '{}'",
            job.job_title, job.company_name
        );

        let source = acquire_source(
            &request.source,
            self.records.as_ref(),
            self.store.as_ref(),
            &self.primary_bucket,
            &self.fallback_bucket,
        )
        .await?;
        info!(
            "Acquired source '{}' ({:?}, {} bytes)",
            source.file_name,
            source.kind,
            source.bytes.len()
        );

        let resume_text = self.extractor.extract(&source).await?;
        info!("Extracted {} chars of resume text", resume_text.len());

        let tailored = self.tailor.tailor(&resume_text, &job).await?;
        info!("Tailored document: {} chars", tailored.len());

        let markdown = sanitize_markdown(&tailored);

        // The engine is pure; the one date on the page is computed here.
        let options = RenderOptions {
            subtitle: format!(
                "Tailored for {} at {} \u{00b7} {}",
                job.job_title,
                job.company_name,
                Utc::now().format("%Y-%m-%d")
            ),
        };
        let rendered =
            render_markdown(&markdown, &options).map_err(|e| AppError::Render(e.to_string()))?;
        info!(
            "Rendered {} pages ({} bytes)",
            rendered.page_count,
            rendered.bytes.len()
        );

        let score = keyword_match_score(&job.job_description, &markdown);

        self.persist(&request, job, markdown, rendered.bytes, rendered.page_count, score)
            .await
    }

    /// Fills missing job fields from the job record when `job_id` is given;
    /// otherwise placeholders apply.
    async fn resolve_job(&self, request: &TailorRequest) -> Result<JobContext, AppError> {
        let missing_fields = request.job_title.is_none()
            || request.company_name.is_none()
            || request.job_description.is_none();

        if let (Some(job_id), true) = (request.job_id, missing_fields) {
            let job = self
                .records
                .find_job(job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job {job_id}")))?;
            return Ok(JobContext::resolve(
                request.job_title.clone().or(Some(job.title)),
                request.company_name.clone().or(Some(job.company)),
                request.job_description.clone().or(Some(job.description)),
            ));
        }

        Ok(JobContext::resolve(
            request.job_title.clone(),
            request.company_name.clone(),
            request.job_description.clone(),
        ))
    }

    /// Persists the artifacts: PDF upload and record insert are fatal, the
    /// markdown export upload is logged-and-continue.
    async fn persist(
        &self,
        request: &TailorRequest,
        job: JobContext,
        markdown: String,
        pdf_bytes: Vec<u8>,
        page_count: usize,
        score: f64,
    ) -> Result<PipelineOutcome, AppError> {
        let artifact_id = Uuid::new_v4();
        let pdf_key = format!("tailored/{artifact_id}.pdf");
        let markdown_key = format!("tailored/{artifact_id}.md");

        self.store
            .upload(
                &self.primary_bucket,
                &pdf_key,
                pdf_bytes,
                "application/pdf",
            )
            .await
            .map_err(|e| AppError::StorageWriteFailed(e.to_string()))?;
        info!("Uploaded PDF to {}/{}", self.primary_bucket, pdf_key);

        let stored_markdown_key = match self
            .store
            .upload(
                &self.primary_bucket,
                &markdown_key,
                markdown.clone().into_bytes(),
                "text/markdown",
            )
            .await
        {
            Ok(()) => Some(markdown_key),
            Err(e) => {
                // Convenience export only — the run still succeeds.
                warn!("Markdown export upload failed (continuing): {e}");
                None
            }
        };

        let source_resume_id = match &request.source {
            SourceSpec::Reference { resume_id } => Some(*resume_id),
            _ => None,
        };

        let record_id = self
            .records
            .insert_tailoring_record(NewTailoringRecord {
                user_id: request.user_id,
                source_resume_id,
                job_title: job.job_title,
                company_name: job.company_name,
                job_description: job.job_description,
                tailored_markdown: markdown,
                s3_pdf_key: pdf_key.clone(),
                s3_markdown_key: stored_markdown_key.clone(),
                score,
            })
            .await
            .map_err(|e| AppError::PersistenceFailed(e.into_database_error()))?;

        Ok(PipelineOutcome {
            record_id,
            download_url: self.store.public_url(&self.primary_bucket, &pdf_key),
            markdown_url: stored_markdown_key
                .map(|k| self.store.public_url(&self.primary_bucket, &k)),
            score,
            page_count,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests — fake-backed end-to-end runs
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::extraction::{ensure_plausible_extraction, SourceDocument};
    use crate::models::{JobRow, TailoringRecordRow};
    use crate::records::{RecordError, StoredFileRef};
    use crate::storage::StoreError;
    use crate::tailoring::ensure_plausible_tailoring;

    // ── Fakes ──────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
        fail_markdown_uploads: bool,
    }

    impl MemoryStore {
        fn with_object(bucket: &str, key: &str, bytes: &[u8]) -> Self {
            let store = MemoryStore::default();
            store
                .objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
            store
        }

        fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn upload(
            &self,
            bucket: &str,
            key: &str,
            bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), StoreError> {
            if self.fail_markdown_uploads && key.ends_with(".md") {
                return Err(StoreError::Other("markdown upload refused".into()));
            }
            self.objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), bytes);
            Ok(())
        }

        async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
            self.get(bucket, key).ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        }

        fn public_url(&self, bucket: &str, key: &str) -> String {
            format!("http://store.test/{bucket}/{key}")
        }
    }

    #[derive(Default)]
    struct FakeRecords {
        jobs: HashMap<Uuid, JobRow>,
        files: HashMap<Uuid, StoredFileRef>,
        inserted: Mutex<Vec<(Uuid, NewTailoringRecord)>>,
        fail_reads: bool,
        fail_inserts: bool,
    }

    #[async_trait]
    impl RecordStore for FakeRecords {
        async fn find_job(&self, id: Uuid) -> Result<Option<JobRow>, RecordError> {
            if self.fail_reads {
                return Err(RecordError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self.jobs.get(&id).cloned())
        }

        async fn find_stored_file(
            &self,
            id: Uuid,
        ) -> Result<Option<StoredFileRef>, RecordError> {
            Ok(self.files.get(&id).cloned())
        }

        async fn insert_tailoring_record(
            &self,
            record: NewTailoringRecord,
        ) -> Result<Uuid, RecordError> {
            if self.fail_inserts {
                return Err(RecordError::Database(sqlx::Error::PoolClosed));
            }
            let id = Uuid::new_v4();
            self.inserted.lock().unwrap().push((id, record));
            Ok(id)
        }

        async fn get_tailoring_record(
            &self,
            _id: Uuid,
        ) -> Result<Option<TailoringRecordRow>, RecordError> {
            Ok(None)
        }
    }

    /// Echoes the source bytes as text, gated like the real adapter.
    struct PassthroughExtractor;

    #[async_trait]
    impl TextExtractor for PassthroughExtractor {
        async fn extract(&self, source: &SourceDocument) -> Result<String, AppError> {
            ensure_plausible_extraction(String::from_utf8_lossy(&source.bytes).into_owned())
        }
    }

    /// Produces a fixed template-shaped document carrying the first extracted
    /// line as the name, gated like the real adapter.
    struct TemplateTailor;

    #[async_trait]
    impl ContentTailor for TemplateTailor {
        async fn tailor(&self, resume_text: &str, job: &JobContext) -> Result<String, AppError> {
            let name = resume_text.lines().next().unwrap_or("Candidate").trim();
            let markdown = format!(
                "**{name}**\n{name_lower}@example.com | 555-0100\n\n\
                 ## Professional Summary\nEngineer aligned with the {title} role at {company}.\n\n\
                 ## Key Skills\n- Rust\n- Distributed systems\n\n\
                 ## Professional Experience\n### **{title}** \u{2014} Previous Co (2019\u{2013}2024)\n\
                 - Shipped systems matching: {jd}\n\n\
                 ## Education\n### BS Computer Science \u{2014} State University\n",
                name = name,
                name_lower = name.to_lowercase().replace(' ', "."),
                title = job.job_title,
                company = job.company_name,
                jd = job.job_description.chars().take(80).collect::<String>(),
            );
            ensure_plausible_tailoring(markdown)
        }
    }

    /// Builds a pipeline over the given fakes, returning the handles so
    /// tests can assert on stored objects and inserted records.
    fn pipeline_with(
        store: MemoryStore,
        records: FakeRecords,
    ) -> (Pipeline, Arc<MemoryStore>, Arc<FakeRecords>) {
        let store = Arc::new(store);
        let records = Arc::new(records);
        let pipeline = Pipeline::new(
            store.clone(),
            records.clone(),
            Arc::new(PassthroughExtractor),
            Arc::new(TemplateTailor),
            "artifacts".to_string(),
            "artifacts-legacy".to_string(),
        );
        (pipeline, store, records)
    }

    fn resume_text() -> String {
        let mut text = String::from("Jordan Smith\njordan@example.com\n\n");
        for i in 0..100 {
            text.push_str(&format!(
                "Led project {i} delivering measurable outcomes across the platform while \
                 mentoring engineers and improving reliability budgets quarter over quarter.\n"
            ));
        }
        text
    }

    fn upload_request(job_description: &str) -> TailorRequest {
        TailorRequest {
            user_id: Some(Uuid::new_v4()),
            source: SourceSpec::Upload {
                bytes: Bytes::from(resume_text().into_bytes()),
                file_name: "resume.txt".into(),
                media_type: "text/plain".into(),
            },
            job_id: None,
            job_title: Some("Backend Engineer".into()),
            company_name: Some("Acme".into()),
            job_description: Some(job_description.to_string()),
        }
    }

    const JOB_DESCRIPTION: &str =
        "Acme is hiring a Backend Engineer to design and operate distributed services in Rust. \
         You will own ingestion pipelines, improve reliability and latency, collaborate with \
         product teams, and mentor junior engineers. Experience with PostgreSQL, object \
         storage, observability tooling, and incident response is expected. We value clear \
         writing, pragmatic engineering judgment, measured rollouts behind feature flags, \
         rigorous code review, capacity planning, cost awareness, and a habit of leaving \
         systems simpler than you found them. Familiarity with queueing, caching, schema \
         design, load testing, profiling, and deployment automation rounds out the role.";

    // ── End-to-end ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_end_to_end_upload_run() {
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), FakeRecords::default());
        let outcome = pipeline.run(upload_request(JOB_DESCRIPTION)).await.unwrap();

        assert!(outcome.page_count >= 1);
        assert!(outcome.download_url.ends_with(".pdf"));
        assert!(outcome.markdown_url.is_some());
        assert!(outcome.score > 0.0);
    }

    #[tokio::test]
    async fn test_end_to_end_record_and_artifact_contents() {
        let (pipeline, store, records) =
            pipeline_with(MemoryStore::default(), FakeRecords::default());
        let outcome = pipeline.run(upload_request(JOB_DESCRIPTION)).await.unwrap();

        let guard = records.inserted.lock().unwrap();
        let (record_id, inserted) = guard.first().cloned().expect("record inserted");
        drop(guard);
        assert_eq!(record_id, outcome.record_id);
        assert!(!inserted.s3_pdf_key.is_empty());
        assert_eq!(inserted.job_title, "Backend Engineer");

        let pdf = store.get("artifacts", &inserted.s3_pdf_key).expect("pdf stored");
        let text = String::from_utf8_lossy(&pdf);
        // The candidate's first extracted line renders as the name (words
        // are painted as individual text operations).
        assert!(text.contains("(Jordan) Tj"), "name missing from PDF");
        assert!(text.contains("(Smith) Tj"), "name missing from PDF");
        assert!(text.contains("/Type /Catalog"));
    }

    #[tokio::test]
    async fn test_markdown_upload_failure_is_non_fatal() {
        let store = MemoryStore {
            fail_markdown_uploads: true,
            ..Default::default()
        };
        let (pipeline, _, records) = pipeline_with(store, FakeRecords::default());
        let outcome = pipeline.run(upload_request(JOB_DESCRIPTION)).await.unwrap();

        assert!(outcome.markdown_url.is_none());
        assert!(outcome.download_url.ends_with(".pdf"));
        let guard = records.inserted.lock().unwrap();
        assert!(guard.first().unwrap().1.s3_markdown_key.is_none());
    }

    #[tokio::test]
    async fn test_short_extraction_is_rejected() {
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), FakeRecords::default());
        let mut request = upload_request(JOB_DESCRIPTION);
        request.source = SourceSpec::Upload {
            bytes: Bytes::from_static(b"tiny"),
            file_name: "resume.txt".into(),
            media_type: "text/plain".into(),
        };
        let err = pipeline.run(request).await.unwrap_err();
        assert_eq!(err.code(), "EXTRACTION_EMPTY");
    }

    #[tokio::test]
    async fn test_reference_source_resolves_through_variants() {
        // Object stored under the decoded key; record carries the encoded one.
        let store = MemoryStore::with_object(
            "artifacts",
            "uploads/My Resume.txt",
            resume_text().as_bytes(),
        );
        let resume_id = Uuid::new_v4();
        let mut records = FakeRecords::default();
        records.files.insert(
            resume_id,
            StoredFileRef {
                bucket: None,
                key: Some("uploads/My%20Resume.txt".into()),
                url: None,
                file_name: Some("My Resume.txt".into()),
                media_type: Some("text/plain".into()),
            },
        );
        let (pipeline, _, records) = pipeline_with(store, records);
        let mut request = upload_request(JOB_DESCRIPTION);
        request.source = SourceSpec::Reference { resume_id };

        let outcome = pipeline.run(request).await.unwrap();
        assert!(outcome.page_count >= 1);

        let guard = records.inserted.lock().unwrap();
        let (_, inserted) = guard.first().cloned().expect("record inserted");
        assert_eq!(inserted.source_resume_id, Some(resume_id));
        assert!(!inserted.s3_pdf_key.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_reference_is_not_found() {
        let resume_id = Uuid::new_v4();
        let mut records = FakeRecords::default();
        records.files.insert(
            resume_id,
            StoredFileRef {
                key: Some("uploads/missing.pdf".into()),
                ..Default::default()
            },
        );
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), records);
        let mut request = upload_request(JOB_DESCRIPTION);
        request.source = SourceSpec::Reference { resume_id };

        let err = pipeline.run(request).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reference_without_locator_is_invalid() {
        let resume_id = Uuid::new_v4();
        let mut records = FakeRecords::default();
        records.files.insert(resume_id, StoredFileRef::default());
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), records);
        let mut request = upload_request(JOB_DESCRIPTION);
        request.source = SourceSpec::Reference { resume_id };

        let err = pipeline.run(request).await.unwrap_err();
        assert_eq!(err.code(), "REFERENCE_INVALID");
    }

    #[tokio::test]
    async fn test_job_id_resolves_missing_fields() {
        let job_id = Uuid::new_v4();
        let mut records = FakeRecords::default();
        records.jobs.insert(
            job_id,
            JobRow {
                id: job_id,
                title: "Platform Engineer".into(),
                company: "Initech".into(),
                description: JOB_DESCRIPTION.into(),
            },
        );
        let (pipeline, _, records) = pipeline_with(MemoryStore::default(), records);
        let request = TailorRequest {
            user_id: None,
            source: SourceSpec::InlineText {
                text: resume_text(),
            },
            job_id: Some(job_id),
            job_title: None,
            company_name: None,
            job_description: None,
        };

        let outcome = pipeline.run(request).await.unwrap();
        let guard = records.inserted.lock().unwrap();
        let (_, inserted) = guard.first().unwrap();
        assert_eq!(inserted.job_title, "Platform Engineer");
        assert_eq!(inserted.company_name, "Initech");
        drop(guard);
        assert!(outcome.score > 0.0);
    }

    #[tokio::test]
    async fn test_missing_job_lookup_is_not_found() {
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), FakeRecords::default());
        let request = TailorRequest {
            user_id: None,
            source: SourceSpec::InlineText {
                text: resume_text(),
            },
            job_id: Some(Uuid::new_v4()),
            job_title: None,
            company_name: None,
            job_description: None,
        };
        let err = pipeline.run(request).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_insert_failure_is_persistence_failed() {
        let records = FakeRecords {
            fail_inserts: true,
            ..Default::default()
        };
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), records);
        let err = pipeline.run(upload_request(JOB_DESCRIPTION)).await.unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_FAILED");
    }

    #[tokio::test]
    async fn test_read_failure_is_internal() {
        // A transient database fault during the job lookup is an internal
        // fault, not a persistence failure.
        let records = FakeRecords {
            fail_reads: true,
            ..Default::default()
        };
        let (pipeline, _, _) = pipeline_with(MemoryStore::default(), records);
        let mut request = upload_request(JOB_DESCRIPTION);
        request.job_id = Some(Uuid::new_v4());
        request.job_title = None;
        let err = pipeline.run(request).await.unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_placeholders_apply_without_job_context() {
        let (pipeline, _, records) =
            pipeline_with(MemoryStore::default(), FakeRecords::default());
        let request = TailorRequest {
            user_id: None,
            source: SourceSpec::InlineText {
                text: resume_text(),
            },
            job_id: None,
            job_title: None,
            company_name: None,
            job_description: None,
        };
        pipeline.run(request).await.unwrap();
        let guard = records.inserted.lock().unwrap();
        let (_, inserted) = guard.first().unwrap();
        assert_eq!(inserted.job_title, "Professional Role");
        assert_eq!(inserted.company_name, "Company");
    }
}
