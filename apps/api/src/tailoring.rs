//! Tailoring adapter: extracted resume text + job context → a constrained-
//! markdown resume following the fixed structural template.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{AppError, Stage};
use crate::extraction::external_error;
use crate::llm_client::LlmClient;

/// Tailoring output below this many chars (after trim) is rejected.
/// Heuristic threshold preserved from the original behavior.
pub const MIN_TAILORED_LEN: usize = 50;

/// Placeholder values when the caller supplies no job fields.
pub const DEFAULT_JOB_TITLE: &str = "Professional Role";
pub const DEFAULT_COMPANY: &str = "Company";

/// Resolved job context for one tailoring run.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_title: String,
    pub company_name: String,
    pub job_description: String,
}

impl JobContext {
    pub fn resolve(
        job_title: Option<String>,
        company_name: Option<String>,
        job_description: Option<String>,
    ) -> Self {
        Self {
            job_title: non_empty(job_title).unwrap_or_else(|| DEFAULT_JOB_TITLE.to_string()),
            company_name: non_empty(company_name).unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
            job_description: non_empty(job_description).unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Prompts
// ────────────────────────────────────────────────────────────────────────────

const TAILORING_SYSTEM: &str =
    "You are an expert resume writer. You rewrite an existing resume so it is \
    tailored to a specific job, without inventing anything. \
    You MUST return pure Markdown only. \
    Do NOT wrap the output in code fences. \
    Do NOT include explanations, preambles, or commentary.";

/// The fixed structural template every tailored resume reproduces: heading
/// set, ordering, and markdown conventions. The renderer understands exactly
/// this dialect.
const RESUME_TEMPLATE: &str = r#"**Full Name**
email | phone | location

## Professional Summary
Two to four tailored sentences.

## Key Skills
- Skill group one
- Skill group two

## Professional Experience
### **Job Title** — Company (dates)
- Achievement bullet with **key terms** in bold
- Achievement bullet

## Education
### Degree — Institution (dates)

## Certifications
- Certification name (optional section — omit if none)"#;

/// Tailoring prompt. Replace `{job_title}`, `{company}`, `{job_description}`,
/// `{resume_text}` before sending.
const TAILORING_PROMPT_TEMPLATE: &str = r#"Rewrite the resume below, tailored for this position:

POSITION: {job_title} at {company}

JOB DESCRIPTION:
{job_description}

HARD RULES:
1. Preserve ALL factual content from the resume — never invent roles, employers, dates, degrees, or metrics
2. Weave job-description keywords in ONLY where they fit the existing facts naturally — no keyword stuffing
3. Reproduce EXACTLY this structure, heading set, ordering, and Markdown conventions:

{template}

4. Use `## ` for section headings, `### ` for role headings, `- ` for bullets, `**bold**` and `*italic*` for emphasis, `---` for separator rules
5. Return pure Markdown only — no code fences, no commentary

RESUME:
{resume_text}"#;

// ────────────────────────────────────────────────────────────────────────────
// Adapter
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ContentTailor: Send + Sync {
    async fn tailor(&self, resume_text: &str, job: &JobContext) -> Result<String, AppError>;
}

/// Production tailor backed by the LLM client.
pub struct AnthropicTailor {
    llm: LlmClient,
}

impl AnthropicTailor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentTailor for AnthropicTailor {
    async fn tailor(&self, resume_text: &str, job: &JobContext) -> Result<String, AppError> {
        debug!(
            "Tailoring resume ({} chars) for '{}' at '{}'",
            resume_text.len(),
            job.job_title,
            job.company_name
        );

        let prompt = TAILORING_PROMPT_TEMPLATE
            .replace("{job_title}", &job.job_title)
            .replace("{company}", &job.company_name)
            .replace("{job_description}", &job.job_description)
            .replace("{template}", RESUME_TEMPLATE)
            .replace("{resume_text}", resume_text);

        let markdown = self
            .llm
            .call_text(TAILORING_SYSTEM, &prompt)
            .await
            .map_err(|e| external_error(Stage::Tailoring, e))?;

        ensure_plausible_tailoring(markdown)
    }
}

/// Gate on implausibly short output, mirroring the extraction gate.
pub fn ensure_plausible_tailoring(markdown: String) -> Result<String, AppError> {
    if markdown.trim().len() < MIN_TAILORED_LEN {
        return Err(AppError::TailoringEmpty {
            len: markdown.trim().len(),
        });
    }
    Ok(markdown)
}
