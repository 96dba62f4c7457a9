//! Parse phase of the rendering engine: constrained markdown → `LayoutDocument`.
//!
//! The dialect is deliberately small (see the tailoring template): `##`/`###`
//! headings, `---` rules, `- `/`* `/`•` bullets, `**bold**`/`*italic*` inline
//! spans, and a leading name/contact block before the first heading. Every
//! line classifies into *some* block — malformed input degrades to
//! `Paragraph`, never to an error.

/// Inline style of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
}

/// A contiguous run of text sharing one inline style.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            style: SpanStyle::Plain,
        }
    }
}

/// One classified logical line of the tailored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    NameHeader { name: String, contact_line: String },
    SectionHeading { text: String, level: u8 },
    Rule,
    Bullet { spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
    Blank,
}

/// The engine's normalized intermediate representation. Built once per
/// document, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LayoutDocument {
    pub blocks: Vec<Block>,
}

/// Bare lines matching these titles (case-insensitive) count as level-2
/// headings even without `##` markers — extraction output and some models
/// emit resume sections as plain uppercase lines.
const KNOWN_SECTION_TITLES: &[&str] = &[
    "professional summary",
    "summary",
    "key skills",
    "skills",
    "professional experience",
    "experience",
    "education",
    "certifications",
    "projects",
    "references",
];

/// Parses a sanitized constrained-markdown document.
///
/// All leading lines up to (but excluding) the first heading form the
/// name/contact block: first non-blank line is the candidate name (markers
/// stripped), the following contiguous non-blank lines are joined with a
/// bullet separator into the contact line. Everything from the first heading
/// onward is classified line by line.
pub fn parse_document(markdown: &str) -> LayoutDocument {
    let lines: Vec<&str> = markdown.lines().collect();
    let first_heading = lines
        .iter()
        .position(|l| is_heading_line(l))
        .unwrap_or(lines.len());

    let mut blocks = Vec::with_capacity(lines.len() + 1);

    let (header, leftover) = parse_name_header(&lines[..first_heading]);
    if let Some(header) = header {
        blocks.push(header);
    }
    // Pre-heading lines that are neither name nor contact still render.
    for line in leftover {
        blocks.push(classify_line(line));
    }

    for line in &lines[first_heading..] {
        blocks.push(classify_line(line));
    }

    LayoutDocument { blocks }
}

/// Classifies one body line into exactly one `Block` variant.
///
/// Priority: blank → rule → `###` → `##` → known section title → bullet →
/// paragraph. Total — never fails.
pub fn classify_line(line: &str) -> Block {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Block::Blank;
    }
    if trimmed == "---" {
        return Block::Rule;
    }
    if let Some(text) = trimmed.strip_prefix("###") {
        let text = text.trim();
        if !text.is_empty() {
            return Block::SectionHeading {
                text: strip_bold_wrap(text).to_string(),
                level: 3,
            };
        }
    }
    if let Some(text) = trimmed.strip_prefix("##") {
        let text = text.trim();
        if !text.is_empty() {
            return Block::SectionHeading {
                text: strip_bold_wrap(text).to_string(),
                level: 2,
            };
        }
    }
    let bare = strip_bold_wrap(trimmed);
    if KNOWN_SECTION_TITLES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(bare))
    {
        return Block::SectionHeading {
            text: bare.to_string(),
            level: 2,
        };
    }
    if let Some(rest) = bullet_text(trimmed) {
        return Block::Bullet {
            spans: scan_spans(rest),
        };
    }
    Block::Paragraph {
        spans: scan_spans(trimmed),
    }
}

/// Splits text into styled spans by scanning for `**bold**` and `*italic*`
/// runs. Unmatched markers are kept as literal text; no characters are lost
/// or duplicated.
pub fn scan_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(idx) = rest.find('*') {
        plain.push_str(&rest[..idx]);
        let at_marker = &rest[idx..];

        if let Some(after) = at_marker.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                if end > 0 {
                    flush_plain(&mut spans, &mut plain);
                    spans.push(Span {
                        text: after[..end].to_string(),
                        style: SpanStyle::Bold,
                    });
                    rest = &after[end + 2..];
                    continue;
                }
            }
        } else if let Some(after) = at_marker.strip_prefix('*') {
            if let Some(end) = after.find('*') {
                if end > 0 {
                    flush_plain(&mut spans, &mut plain);
                    spans.push(Span {
                        text: after[..end].to_string(),
                        style: SpanStyle::Italic,
                    });
                    rest = &after[end + 1..];
                    continue;
                }
            }
        }

        // No matching closer — the marker is literal text.
        plain.push('*');
        rest = &at_marker[1..];
    }

    plain.push_str(rest);
    flush_plain(&mut spans, &mut plain);
    spans
}

fn flush_plain(spans: &mut Vec<Span>, plain: &mut String) {
    if !plain.is_empty() {
        spans.push(Span::plain(std::mem::take(plain)));
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Name/contact block
// ────────────────────────────────────────────────────────────────────────────

/// Builds the `NameHeader` from the pre-heading region. Returns the header
/// (if the region has any content) and any lines left over after the
/// contiguous contact run.
fn parse_name_header<'a>(region: &[&'a str]) -> (Option<Block>, Vec<&'a str>) {
    let mut iter = region.iter().copied().peekable();

    // Skip leading blanks.
    let name_line = loop {
        match iter.next() {
            Some(l) if l.trim().is_empty() => continue,
            Some(l) => break l,
            None => return (None, Vec::new()),
        }
    };

    let name = strip_bold_wrap(name_line.trim().trim_start_matches('#').trim()).to_string();

    let mut contact_parts: Vec<&str> = Vec::new();
    for line in iter.by_ref() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        contact_parts.push(trimmed);
    }

    let contact_line = contact_parts
        .iter()
        .map(|p| strip_bold_wrap(p))
        .collect::<Vec<_>>()
        .join(" \u{2022} ");

    let leftover: Vec<&str> = iter.filter(|l| !l.trim().is_empty()).collect();
    (Some(Block::NameHeader { name, contact_line }), leftover)
}

// ────────────────────────────────────────────────────────────────────────────
// Line predicates
// ────────────────────────────────────────────────────────────────────────────

fn is_heading_line(line: &str) -> bool {
    matches!(classify_line(line), Block::SectionHeading { .. })
}

fn bullet_text(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("\u{2022} "))
        .or_else(|| trimmed.strip_prefix('\u{2022}'))
        .map(str::trim_start)
}

/// Removes a `**...**` wrapper when it encloses the whole string.
fn strip_bold_wrap(s: &str) -> &str {
    s.strip_prefix("**")
        .and_then(|inner| inner.strip_suffix("**"))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_detection_marked_and_bare() {
        assert_eq!(
            classify_line("## Education"),
            Block::SectionHeading {
                text: "Education".into(),
                level: 2
            }
        );
        assert_eq!(
            classify_line("### **Senior Developer**"),
            Block::SectionHeading {
                text: "Senior Developer".into(),
                level: 3
            }
        );
        assert_eq!(
            classify_line("SKILLS"),
            Block::SectionHeading {
                text: "SKILLS".into(),
                level: 2
            }
        );
    }

    #[test]
    fn test_bullet_and_blank_detection() {
        assert!(matches!(
            classify_line("- Built a thing"),
            Block::Bullet { .. }
        ));
        assert!(matches!(classify_line("* Built a thing"), Block::Bullet { .. }));
        assert!(matches!(
            classify_line("\u{2022} Built a thing"),
            Block::Bullet { .. }
        ));
        assert_eq!(classify_line("   "), Block::Blank);
        assert_eq!(classify_line("---"), Block::Rule);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let lines = [
            "## Education",
            "### **Senior Developer**",
            "SKILLS",
            "- Built a thing",
            "",
            "---",
            "Just a paragraph with *style*.",
        ];
        for line in lines {
            assert_eq!(classify_line(line), classify_line(line));
        }
    }

    #[test]
    fn test_italic_line_is_not_a_bullet() {
        // "* " is a bullet prefix; "*italic*" is not.
        let block = classify_line("*Available on request*");
        match block {
            Block::Paragraph { spans } => {
                assert_eq!(spans, vec![Span {
                    text: "Available on request".into(),
                    style: SpanStyle::Italic
                }]);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_span_round_trip() {
        let spans = scan_spans("**Bold** and *italic* and plain");
        assert_eq!(
            spans,
            vec![
                Span {
                    text: "Bold".into(),
                    style: SpanStyle::Bold
                },
                Span {
                    text: " and ".into(),
                    style: SpanStyle::Plain
                },
                Span {
                    text: "italic".into(),
                    style: SpanStyle::Italic
                },
                Span {
                    text: " and plain".into(),
                    style: SpanStyle::Plain
                },
            ]
        );
        // No text lost or duplicated.
        let total: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(total, "Bold and italic and plain");
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        let spans = scan_spans("5 * 3 = 15");
        // Lone closer never found a pair with content, so everything is plain.
        let total: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(total, "5 * 3 = 15");
        assert!(spans.iter().all(|s| s.style == SpanStyle::Plain));
    }

    #[test]
    fn test_name_header_extraction() {
        let doc = parse_document(
            "**Jane Doe**\njane@example.com\n555-0100 | Portland, OR\n\n## Professional Summary\nSeasoned engineer.",
        );
        match &doc.blocks[0] {
            Block::NameHeader { name, contact_line } => {
                assert_eq!(name, "Jane Doe");
                assert_eq!(
                    contact_line,
                    "jane@example.com \u{2022} 555-0100 | Portland, OR"
                );
            }
            other => panic!("expected name header, got {other:?}"),
        }
        assert!(doc
            .blocks
            .iter()
            .any(|b| matches!(b, Block::SectionHeading { text, .. } if text == "Professional Summary")));
    }

    #[test]
    fn test_name_header_strips_h1_marker() {
        let doc = parse_document("# John Smith\n\n## Summary\nHi.");
        match &doc.blocks[0] {
            Block::NameHeader { name, .. } => assert_eq!(name, "John Smith"),
            other => panic!("expected name header, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_known_title_terminates_name_block() {
        let doc = parse_document("Jane Doe\njane@example.com\nPROFESSIONAL SUMMARY\nText.");
        match &doc.blocks[0] {
            Block::NameHeader { contact_line, .. } => {
                assert_eq!(contact_line, "jane@example.com");
            }
            other => panic!("expected name header, got {other:?}"),
        }
        assert!(matches!(
            &doc.blocks[1],
            Block::SectionHeading { level: 2, .. }
        ));
    }

    #[test]
    fn test_document_with_no_heading_keeps_all_content() {
        let doc = parse_document("Jane Doe\njane@example.com\n\nShipped many things.");
        assert!(matches!(&doc.blocks[0], Block::NameHeader { .. }));
        assert!(doc
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Paragraph { .. })));
    }
}
