//! Minimal PDF writer backing the layout pass.
//!
//! Emits uncompressed content streams against the built-in Helvetica family
//! (no font embedding — see the project non-goals). Output is deterministic:
//! no creation timestamps, no document IDs, object order fixed by insertion.
//!
//! Object layout: 1 catalog, 2 page tree, 3–5 fonts (F1/F2/F3), then an
//! interleaved (page, content) pair per page.

use std::fmt::Write;

use crate::render::fonts::FontVariant;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

const RULE_LINE_WIDTH: f32 = 0.7;

/// Builds a multi-page PDF. Drawing always targets the most recent page.
pub struct PdfBuilder {
    /// One content stream per page, built up as text.
    pages: Vec<String>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            pages: vec![String::new()],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self) {
        self.pages.push(String::new());
    }

    /// Draws `text` with its baseline at `(x, y)` (origin bottom-left).
    pub fn draw_text(
        &mut self,
        variant: FontVariant,
        size: f32,
        x: f32,
        y: f32,
        text: &str,
    ) -> Result<(), std::fmt::Error> {
        let content = self.pages.last_mut().expect("builder always has a page");
        writeln!(
            content,
            "BT /{} {} Tf {} {} Td ({}) Tj ET",
            variant.resource(),
            fmt_num(size),
            fmt_num(x),
            fmt_num(y),
            encode_text(text)
        )
    }

    /// Draws a horizontal rule from `(x1, y)` to `(x2, y)`.
    pub fn draw_rule(&mut self, x1: f32, x2: f32, y: f32) -> Result<(), std::fmt::Error> {
        let content = self.pages.last_mut().expect("builder always has a page");
        writeln!(
            content,
            "{} w {} {} m {} {} l S",
            fmt_num(RULE_LINE_WIDTH),
            fmt_num(x1),
            fmt_num(y),
            fmt_num(x2),
            fmt_num(y)
        )
    }

    /// Assembles the final byte stream: header, objects, xref, trailer.
    pub fn finish(self) -> Result<Vec<u8>, std::fmt::Error> {
        let n_pages = self.pages.len();
        // 1 catalog + 1 page tree + 3 fonts + 2 per page.
        let n_objects = 5 + 2 * n_pages;
        let page_obj = |i: usize| 6 + 2 * i;
        let content_obj = |i: usize| 7 + 2 * i;

        let mut objects: Vec<String> = Vec::with_capacity(n_objects);

        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

        let kids = (0..n_pages)
            .map(|i| format!("{} 0 R", page_obj(i)))
            .collect::<Vec<_>>()
            .join(" ");
        objects.push(format!(
            "<< /Type /Pages /Kids [{kids}] /Count {n_pages} >>"
        ));

        for variant in [FontVariant::Regular, FontVariant::Bold, FontVariant::Oblique] {
            objects.push(format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                variant.base_font()
            ));
        }

        for (i, content) in self.pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R >> >> \
                 /Contents {} 0 R >>",
                fmt_num(PAGE_WIDTH),
                fmt_num(PAGE_HEIGHT),
                content_obj(i)
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                content.len(),
                content
            ));
        }

        // Everything below is ASCII (text is octal-escaped), so string length
        // and byte offsets coincide.
        let mut out = String::new();
        writeln!(out, "%PDF-1.4")?;

        let mut offsets = Vec::with_capacity(n_objects);
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            writeln!(out, "{} 0 obj\n{}\nendobj", i + 1, body)?;
        }

        let xref_offset = out.len();
        writeln!(out, "xref")?;
        writeln!(out, "0 {}", n_objects + 1)?;
        writeln!(out, "0000000000 65535 f ")?;
        for offset in &offsets {
            writeln!(out, "{offset:010} 00000 n ")?;
        }
        writeln!(out, "trailer")?;
        writeln!(out, "<< /Size {} /Root 1 0 R >>", n_objects + 1)?;
        writeln!(out, "startxref")?;
        writeln!(out, "{xref_offset}")?;
        write!(out, "%%EOF")?;

        Ok(out.into_bytes())
    }
}

/// Formats a coordinate with minimal digits (trailing zeros trimmed) so the
/// output stays compact and stable.
fn fmt_num(v: f32) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escapes text for a literal PDF string under WinAnsi encoding.
///
/// ASCII passes through (with `\`, `(`, `)` escaped); common typographic
/// characters map to their WinAnsi slots as octal escapes; Latin-1 maps
/// byte-for-byte; anything else degrades to `?`. The sanitizer has already
/// removed control characters.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(c),
            '\u{2022}' => out.push_str("\\225"), // bullet
            '\u{2013}' => out.push_str("\\226"), // en dash
            '\u{2014}' => out.push_str("\\227"), // em dash
            '\u{2018}' => out.push_str("\\221"),
            '\u{2019}' => out.push_str("\\222"),
            '\u{201C}' => out.push_str("\\223"),
            '\u{201D}' => out.push_str("\\224"),
            '\u{2026}' => out.push_str("\\205"), // ellipsis
            '\u{00A0}'..='\u{00FF}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}
