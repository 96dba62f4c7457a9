//! Sanitization pass between tailoring and rendering.

use unicode_normalization::UnicodeNormalization;

/// Normalizes tailored markdown before it reaches the renderer: canonical
/// composition (NFC) plus removal of non-printable control characters.
/// Tab and newline survive; carriage returns are dropped, so CRLF input
/// comes out with bare `\n` line endings. Pure and total — no failure mode.
pub fn sanitize_markdown(input: &str) -> String {
    input
        .nfc()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
