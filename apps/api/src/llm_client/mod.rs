//! LLM client — the single point of entry for all Claude API calls.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! The extraction and tailoring adapters MUST go through this module.
//!
//! Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_FILES_URL: &str = "https://api.anthropic.com/v1/files";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Beta flag required for file-reference document blocks.
const FILES_BETA: &str = "files-api-2025-04-14";
/// The model used for all LLM calls. Intentionally hardcoded.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 8192;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Provider HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response shapes
// ────────────────────────────────────────────────────────────────────────────

/// A single content block in a user message. Text is sent inline; images are
/// inlined base64; large binary documents are uploaded first and referenced
/// by file id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: BlockSource },
    Document { source: BlockSource },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockSource {
    Base64 { media_type: String, data: String },
    File { file_id: String },
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a [ContentBlock],
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ResponseBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FileUploadResponse {
    id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages + Files APIs with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a call to the Messages API with arbitrary content blocks.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    /// This transport-level backoff is the only retry anywhere in the
    /// service; pipeline stages are never re-run (see DESIGN.md).
    pub async fn call(
        &self,
        system: &str,
        content: Vec<ContentBlock>,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &content,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("anthropic-beta", FILES_BETA)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Convenience wrapper: single text prompt, returns trimmed text output.
    pub async fn call_text(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .call(
                system,
                vec![ContentBlock::Text {
                    text: prompt.to_string(),
                }],
            )
            .await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(strip_markdown_fences(text).to_string())
    }

    /// Uploads raw bytes to the Files API, returning the opaque file id used
    /// in file-reference document blocks. Not retried — the caller's message
    /// call is the expensive part, and a fresh upload is cheap to redo.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        media_type: &str,
    ) -> Result<String, LlmError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(media_type)
            .map_err(LlmError::Http)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(ANTHROPIC_FILES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", FILES_BETA)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let uploaded: FileUploadResponse = response.json().await?;
        debug!("Uploaded file to provider: {}", uploaded.id);
        Ok(uploaded.id)
    }
}

/// Strips ``` ... ``` code fences (with or without a language tag) that
/// models sometimes wrap plain output in despite instructions.
pub fn strip_markdown_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence line, if any.
    let stripped = match stripped.split_once('\n') {
        Some((_tag, rest)) => rest,
        None => stripped,
    };
    stripped
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or_else(|| stripped.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_with_language_tag() {
        let input = "```markdown\n# Jane Doe\n```";
        assert_eq!(strip_markdown_fences(input), "# Jane Doe");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n# Jane Doe\n```";
        assert_eq!(strip_markdown_fences(input), "# Jane Doe");
    }

    #[test]
    fn test_strip_fences_no_fences() {
        let input = "# Jane Doe";
        assert_eq!(strip_markdown_fences(input), "# Jane Doe");
    }

    #[test]
    fn test_strip_fences_unterminated() {
        let input = "```markdown\n# Jane Doe";
        assert_eq!(strip_markdown_fences(input), "# Jane Doe");
    }

    #[test]
    fn test_content_block_serialization_shapes() {
        let text = serde_json::to_value(ContentBlock::Text {
            text: "hi".into(),
        })
        .unwrap();
        assert_eq!(text["type"], "text");

        let image = serde_json::to_value(ContentBlock::Image {
            source: BlockSource::Base64 {
                media_type: "image/png".into(),
                data: "AAAA".into(),
            },
        })
        .unwrap();
        assert_eq!(image["type"], "image");
        assert_eq!(image["source"]["type"], "base64");
        assert_eq!(image["source"]["media_type"], "image/png");

        let doc = serde_json::to_value(ContentBlock::Document {
            source: BlockSource::File {
                file_id: "file_123".into(),
            },
        })
        .unwrap();
        assert_eq!(doc["type"], "document");
        assert_eq!(doc["source"]["type"], "file");
        assert_eq!(doc["source"]["file_id"], "file_123");
    }
}
