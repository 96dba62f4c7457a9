//! Text-extraction adapter: raw source bytes → normalized plain text, via
//! the external extraction capability. The request shape is chosen once by
//! coarse media classification; every kind maps to exactly one dispatch arm.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AppError, Stage};
use crate::llm_client::{BlockSource, ContentBlock, LlmClient, LlmError};

/// Extraction output below this many chars (after trim) is treated as a
/// failed extraction rather than a usable resume. Heuristic threshold
/// preserved from the original behavior.
pub const MIN_EXTRACTED_LEN: usize = 10;

/// Plain text beyond this size is truncated before being sent inline.
const MAX_INLINE_TEXT_BYTES: usize = 200_000;

const EXTRACTION_SYSTEM: &str =
    "You are a document text extractor. You receive a candidate resume as text, \
    an image, or a binary document. Return ONLY the plain text content of the \
    document, using OCR if needed. Preserve line breaks and reading order. \
    Do NOT summarize, annotate, or add commentary.";

const EXTRACTION_INSTRUCTION: &str =
    "Extract the complete plain text of this resume. Preserve line breaks.";

// ────────────────────────────────────────────────────────────────────────────
// Source classification
// ────────────────────────────────────────────────────────────────────────────

/// Coarse media classification, determined once at acquisition and matched
/// exhaustively afterwards — adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Text,
    Image,
    DocumentBinary,
    Unknown,
}

impl MediaKind {
    /// Classifies from the declared media type, falling back to the file
    /// extension when the type is missing or generic.
    pub fn classify(media_type: &str, file_name: &str) -> Self {
        let mt = media_type.to_ascii_lowercase();
        let name = file_name.to_ascii_lowercase();

        if mt.starts_with("text/") || mt == "application/json" {
            return MediaKind::Text;
        }
        if mt.starts_with("image/") {
            return MediaKind::Image;
        }
        if mt == "application/pdf"
            || mt == "application/msword"
            || mt.contains("officedocument")
            || mt.contains("opendocument")
        {
            return MediaKind::DocumentBinary;
        }

        if name.ends_with(".txt") || name.ends_with(".md") {
            return MediaKind::Text;
        }
        if name.ends_with(".png") || name.ends_with(".jpg") || name.ends_with(".jpeg") {
            return MediaKind::Image;
        }
        if name.ends_with(".pdf") || name.ends_with(".doc") || name.ends_with(".docx") {
            return MediaKind::DocumentBinary;
        }
        MediaKind::Unknown
    }
}

/// A resolved source document: raw bytes plus declared media type. Owned by
/// one request; discarded after extraction.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub bytes: Bytes,
    pub media_type: String,
    pub file_name: String,
    pub kind: MediaKind,
}

impl SourceDocument {
    pub fn new(bytes: Bytes, media_type: String, file_name: String) -> Self {
        let kind = MediaKind::classify(&media_type, &file_name);
        Self {
            bytes,
            media_type,
            file_name,
            kind,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, source: &SourceDocument) -> Result<String, AppError>;
}

/// Production extractor backed by the LLM client.
pub struct AnthropicExtractor {
    llm: LlmClient,
}

impl AnthropicExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    async fn build_blocks(&self, source: &SourceDocument) -> Result<Vec<ContentBlock>, LlmError> {
        let blocks = match source.kind {
            MediaKind::Text => {
                let text = String::from_utf8_lossy(&source.bytes);
                let text = truncate_on_char_boundary(&text, MAX_INLINE_TEXT_BYTES);
                vec![ContentBlock::Text {
                    text: format!("{EXTRACTION_INSTRUCTION}\n\n{text}"),
                }]
            }
            // Unknown falls back to the image-style inline path: the provider
            // sees the declared media type and the raw bytes.
            MediaKind::Image | MediaKind::Unknown => vec![
                ContentBlock::Image {
                    source: BlockSource::Base64 {
                        media_type: source.media_type.clone(),
                        data: BASE64.encode(&source.bytes),
                    },
                },
                ContentBlock::Text {
                    text: EXTRACTION_INSTRUCTION.to_string(),
                },
            ],
            MediaKind::DocumentBinary => {
                // Binary documents are uploaded out-of-band and referenced by
                // an opaque handle; inlining them blows the request size.
                let file_id = self
                    .llm
                    .upload_file(
                        source.bytes.to_vec(),
                        &source.file_name,
                        &source.media_type,
                    )
                    .await?;
                vec![
                    ContentBlock::Document {
                        source: BlockSource::File { file_id },
                    },
                    ContentBlock::Text {
                        text: EXTRACTION_INSTRUCTION.to_string(),
                    },
                ]
            }
        };
        Ok(blocks)
    }
}

#[async_trait]
impl TextExtractor for AnthropicExtractor {
    async fn extract(&self, source: &SourceDocument) -> Result<String, AppError> {
        debug!(
            "Extracting text from {} ({:?}, {} bytes)",
            source.file_name,
            source.kind,
            source.bytes.len()
        );

        let blocks = self
            .build_blocks(source)
            .await
            .map_err(|e| external_error(Stage::Extraction, e))?;

        let response = self
            .llm
            .call(EXTRACTION_SYSTEM, blocks)
            .await
            .map_err(|e| external_error(Stage::Extraction, e))?;

        let text = response.text().unwrap_or_default().trim().to_string();
        ensure_plausible_extraction(text)
    }
}

/// Gate on implausibly short output — empty results and provider error
/// strings are both shorter than any real resume.
pub fn ensure_plausible_extraction(text: String) -> Result<String, AppError> {
    if text.trim().len() < MIN_EXTRACTED_LEN {
        return Err(AppError::ExtractionEmpty {
            len: text.trim().len(),
        });
    }
    Ok(text)
}

pub(crate) fn external_error(stage: Stage, e: LlmError) -> AppError {
    AppError::ExternalService {
        stage,
        status: e.status(),
        detail: e.to_string(),
    }
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_media_type() {
        assert_eq!(MediaKind::classify("text/plain", "resume"), MediaKind::Text);
        assert_eq!(
            MediaKind::classify("image/png", "resume"),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::classify("application/pdf", "resume"),
            MediaKind::DocumentBinary
        );
        assert_eq!(
            MediaKind::classify(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "resume"
            ),
            MediaKind::DocumentBinary
        );
    }

    #[test]
    fn test_classify_falls_back_to_extension() {
        assert_eq!(
            MediaKind::classify("application/octet-stream", "resume.pdf"),
            MediaKind::DocumentBinary
        );
        assert_eq!(
            MediaKind::classify("application/octet-stream", "resume.txt"),
            MediaKind::Text
        );
        assert_eq!(
            MediaKind::classify("application/octet-stream", "resume.bin"),
            MediaKind::Unknown
        );
    }

    #[test]
    fn test_min_length_gate_rejects_short_output() {
        let err = ensure_plausible_extraction("Error".to_string()).unwrap_err();
        assert_eq!(err.code(), "EXTRACTION_EMPTY");
    }

    #[test]
    fn test_min_length_gate_accepts_real_text() {
        let text = "Jane Doe\nSenior Engineer with ten years of experience.".to_string();
        assert_eq!(ensure_plausible_extraction(text.clone()).unwrap(), text);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "aé".repeat(10);
        let truncated = truncate_on_char_boundary(&text, 4);
        assert!(truncated.len() <= 4);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_source_document_classifies_once() {
        let doc = SourceDocument::new(
            Bytes::from_static(b"hello"),
            "text/plain".to_string(),
            "resume.txt".to_string(),
        );
        assert_eq!(doc.kind, MediaKind::Text);
    }
}
