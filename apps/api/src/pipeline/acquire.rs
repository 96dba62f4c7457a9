//! Source acquisition: turns an inbound source spec (direct upload, inline
//! text, or stored-file reference) into a `SourceDocument`.
//!
//! Historically recorded storage keys are messy — some rows carry URL-encoded
//! keys, some decoded, some a legacy `uploads/` prefix, some only a public
//! URL, and objects may live in a legacy bucket. Resolution is an explicit,
//! bounded, ordered list of (bucket, key) candidates tried until one
//! downloads; exhaustion is `NotFound`, a reference with no locator at all is
//! `ReferenceInvalid`.

use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::SourceDocument;
use crate::records::{RecordStore, StoredFileRef};
use crate::storage::{ObjectStore, StoreError};

/// Legacy key prefix some historical rows carry that the bucket layout no
/// longer uses.
const LEGACY_PREFIX: &str = "uploads/";

/// The three ways a request can hand us a resume.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    Upload {
        bytes: Bytes,
        file_name: String,
        media_type: String,
    },
    InlineText {
        text: String,
    },
    Reference {
        resume_id: Uuid,
    },
}

pub async fn acquire_source(
    spec: &SourceSpec,
    records: &dyn RecordStore,
    store: &dyn ObjectStore,
    primary_bucket: &str,
    fallback_bucket: &str,
) -> Result<SourceDocument, AppError> {
    match spec {
        SourceSpec::Upload {
            bytes,
            file_name,
            media_type,
        } => Ok(SourceDocument::new(
            bytes.clone(),
            media_type.clone(),
            file_name.clone(),
        )),
        SourceSpec::InlineText { text } => Ok(SourceDocument::new(
            Bytes::from(text.clone().into_bytes()),
            "text/plain".to_string(),
            "resume.txt".to_string(),
        )),
        SourceSpec::Reference { resume_id } => {
            resolve_reference(*resume_id, records, store, primary_bucket, fallback_bucket).await
        }
    }
}

async fn resolve_reference(
    resume_id: Uuid,
    records: &dyn RecordStore,
    store: &dyn ObjectStore,
    primary_bucket: &str,
    fallback_bucket: &str,
) -> Result<SourceDocument, AppError> {
    let file_ref = records
        .find_stored_file(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stored resume {resume_id}")))?;

    let base_key = base_key(&file_ref)
        .ok_or_else(|| AppError::ReferenceInvalid(format!("stored resume {resume_id}")))?;

    let candidates = candidate_locations(
        &base_key,
        file_ref.bucket.as_deref(),
        primary_bucket,
        fallback_bucket,
    );

    for (bucket, key) in &candidates {
        match store.download(bucket, key).await {
            Ok(bytes) => {
                info!("Resolved stored resume {resume_id} at {bucket}/{key}");
                let file_name = file_ref
                    .file_name
                    .clone()
                    .unwrap_or_else(|| file_name_from_key(key));
                let media_type = file_ref
                    .media_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                return Ok(SourceDocument::new(
                    Bytes::from(bytes),
                    media_type,
                    file_name,
                ));
            }
            Err(StoreError::NotFound { .. }) => {
                debug!("No object at {bucket}/{key}, trying next candidate");
            }
            Err(StoreError::Other(detail)) => {
                // Transient storage faults on one candidate do not rule the
                // others out; the exhaustion error reports the reference.
                debug!("Download failed at {bucket}/{key}: {detail}");
            }
        }
    }

    Err(AppError::NotFound(format!(
        "Stored resume {resume_id} (tried {} locations)",
        candidates.len()
    )))
}

/// The key as recorded, recovered from the URL path for legacy rows.
fn base_key(file_ref: &StoredFileRef) -> Option<String> {
    if let Some(key) = &file_ref.key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    file_ref.url.as_deref().and_then(key_from_url)
}

/// Recovers a storage key from a public URL: the path after the bucket
/// segment (first path segment on path-style endpoints).
fn key_from_url(url: &str) -> Option<String> {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let (_host, path) = after_scheme.split_once('/')?;
    let key = path.split_once('/').map(|(_bucket, key)| key).unwrap_or(path);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Ordered (bucket, key) candidates: path-encoding variants of the key, each
/// tried first in the bucket implied by the reference, then in the fallback
/// bucket. Duplicates are removed preserving order, so the list is bounded
/// and each location is tried once.
fn candidate_locations(
    base_key: &str,
    ref_bucket: Option<&str>,
    primary_bucket: &str,
    fallback_bucket: &str,
) -> Vec<(String, String)> {
    let mut keys = vec![
        base_key.to_string(),
        percent_decode(base_key),
        percent_encode(base_key),
    ];
    if let Some(stripped) = base_key.strip_prefix(LEGACY_PREFIX) {
        keys.push(stripped.to_string());
    }

    let first_bucket = ref_bucket.unwrap_or(primary_bucket);
    let mut out: Vec<(String, String)> = Vec::new();
    for bucket in [first_bucket, fallback_bucket] {
        for key in &keys {
            let candidate = (bucket.to_string(), key.clone());
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

fn file_name_from_key(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Decodes `%XX` escapes; malformed escapes pass through literally.
fn percent_decode(key: &str) -> String {
    let bytes = key.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encodes everything outside the unreserved set (plus `/`), matching what
/// upload clients historically stored.
fn percent_encode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
