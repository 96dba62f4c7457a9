//! Keyword-match scoring — pure-Rust, deterministic, no LLM call.
//!
//! Measures how much of the job description's keyword inventory made it into
//! the tailored document. The score is informational (stored on the record
//! and returned to the caller); it never gates the pipeline.

use std::collections::BTreeSet;

/// Words too generic to count as job-description keywords.
const STOPWORDS: &[&str] = &[
    "about", "ability", "across", "after", "all", "also", "and", "are", "been", "best", "both",
    "build", "business", "candidate", "company", "experience", "for", "from", "have", "help",
    "ideal", "include", "including", "into", "join", "looking", "more", "must", "our", "over",
    "plus", "role", "skills", "strong", "team", "that", "the", "their", "them", "they", "this",
    "through", "understanding", "well", "will", "with", "work", "working", "years", "you", "your",
];

const MIN_KEYWORD_LEN: usize = 4;

/// Scores the tailored markdown against the job description, 0–100.
///
/// Keywords are lowercased alphanumeric tokens of length ≥ 4 minus a small
/// stopword list; the score is the matched fraction scaled to 100. An empty
/// keyword inventory scores 0 (nothing to match against).
pub fn keyword_match_score(job_description: &str, tailored_markdown: &str) -> f64 {
    let keywords = extract_keywords(job_description);
    if keywords.is_empty() {
        return 0.0;
    }

    let document = tailored_markdown.to_lowercase();
    let matched = keywords
        .iter()
        .filter(|kw| document.contains(kw.as_str()))
        .count();

    (matched as f64 / keywords.len() as f64 * 100.0).round()
}

/// Unique, ordered keyword inventory from a job description.
fn extract_keywords(job_description: &str) -> BTreeSet<String> {
    job_description
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .map(str::to_lowercase)
        .filter(|w| w.len() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(&w.as_str()))
        .collect()
}
