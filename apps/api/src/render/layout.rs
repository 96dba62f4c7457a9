//! Layout phase of the rendering engine: walks the `LayoutDocument` with a
//! page cursor, word-wrapping styled spans and breaking pages, and paints
//! everything through the `PdfBuilder`.
//!
//! The pass is pure given its inputs — no clock, no randomness. The one
//! date-like string on the page (the subtitle) is supplied by the caller.

use crate::render::fonts::{self, FontVariant};
use crate::render::parse::{Block, LayoutDocument, Span, SpanStyle};
use crate::render::pdf::{PdfBuilder, PAGE_HEIGHT, PAGE_WIDTH};

pub const MARGIN: f32 = 56.0;
pub const LINE_GAP: f32 = 5.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const NAME_SIZE: f32 = 20.0;
const SUBTITLE_SIZE: f32 = 11.0;
const CONTACT_SIZE: f32 = 9.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// Hanging indent for bullet continuation lines.
const BULLET_INDENT: f32 = 14.0;
/// Vertical gap a `Blank` block advances by.
const BLANK_GAP: f32 = 6.0;
/// Gap before and after a horizontal rule.
const RULE_GAP: f32 = 4.0;
/// Leading gap above a section heading.
const HEADING_LEAD: f32 = 10.0;

/// Caller-supplied strings rendered under the name. Keeping the date out of
/// the engine keeps the engine deterministic.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Job/company context line, e.g. "Tailored for Backend Engineer at Acme".
    pub subtitle: String,
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Renders a parsed document to PDF bytes. Fails only if the page writer
/// reports a fault; malformed content never errors.
pub fn render_document(
    doc: &LayoutDocument,
    options: &RenderOptions,
) -> Result<RenderedPdf, std::fmt::Error> {
    let mut renderer = Renderer::new();
    for block in &doc.blocks {
        renderer.draw_block(block, options)?;
    }
    let page_count = renderer.pdf.page_count();
    Ok(RenderedPdf {
        bytes: renderer.pdf.finish()?,
        page_count,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Line breaking (pure)
// ────────────────────────────────────────────────────────────────────────────

/// A word or intra-word whitespace run with its measured width at one size.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    style: SpanStyle,
    width: f32,
    is_space: bool,
}

/// A token placed at an absolute x position on a committed line.
#[derive(Debug, Clone)]
struct PlacedToken {
    x: f32,
    text: String,
    style: SpanStyle,
}

/// Splits spans into word/whitespace tokens, preserving each token's style
/// (and therefore its measured width under the corresponding font variant).
fn tokenize(spans: &[Span], size: f32) -> Vec<Token> {
    let mut tokens = Vec::new();
    for span in spans {
        let mut current = String::new();
        let mut current_is_space = false;
        for c in span.text.chars() {
            let is_space = c.is_whitespace();
            if !current.is_empty() && is_space != current_is_space {
                tokens.push(make_token(std::mem::take(&mut current), span.style, size));
            }
            current_is_space = is_space;
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(make_token(current, span.style, size));
        }
    }
    tokens
}

fn make_token(text: String, style: SpanStyle, size: f32) -> Token {
    let is_space = text.chars().all(char::is_whitespace);
    let width = fonts::measure(FontVariant::for_style(style), &text, size);
    Token {
        text,
        style,
        width,
        is_space,
    }
}

/// Greedily packs tokens into lines starting at `indent`. A token is
/// appended while it fits inside the content width; otherwise the line is
/// committed and the token starts the next one. Whitespace at the start of
/// a line is dropped, so no line consists of (or begins with) whitespace.
fn break_into_lines(spans: &[Span], size: f32, indent: f32) -> Vec<Vec<PlacedToken>> {
    let limit = MARGIN + CONTENT_WIDTH;
    let mut lines: Vec<Vec<PlacedToken>> = Vec::new();
    let mut line: Vec<PlacedToken> = Vec::new();
    let mut x = indent;

    for token in tokenize(spans, size) {
        if token.is_space && line.is_empty() {
            continue;
        }
        if x + token.width > limit && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            x = indent;
            if token.is_space {
                continue;
            }
        }
        if !token.is_space {
            line.push(PlacedToken {
                x,
                text: token.text.clone(),
                style: token.style,
            });
        }
        x += token.width;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ────────────────────────────────────────────────────────────────────────────
// Cursor / page painting
// ────────────────────────────────────────────────────────────────────────────

struct Renderer {
    pdf: PdfBuilder,
    /// Top of the next line, in page coordinates (origin bottom-left).
    y: f32,
}

impl Renderer {
    fn new() -> Self {
        Self {
            pdf: PdfBuilder::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Every line commit is a potential page-break point: if the line would
    /// cross the bottom margin, a new page is appended and the cursor resets
    /// to the top before the line is drawn.
    fn ensure_room(&mut self, line_height: f32) {
        if self.y - line_height < MARGIN {
            self.pdf.add_page();
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn at_bottom(&self) -> bool {
        self.y <= MARGIN
    }

    /// Draws wrapped span lines at `indent`. When `bullet_glyph` is set, the
    /// glyph is painted at the left margin beside the first line only — the
    /// hanging-indent shape.
    fn draw_spans(
        &mut self,
        spans: &[Span],
        size: f32,
        indent: f32,
        bullet_glyph: bool,
    ) -> Result<(), std::fmt::Error> {
        let line_height = size + LINE_GAP;
        for (i, line) in break_into_lines(spans, size, indent).iter().enumerate() {
            self.ensure_room(line_height);
            let baseline = self.y - size;
            if bullet_glyph && i == 0 {
                self.pdf
                    .draw_text(FontVariant::Regular, size, MARGIN, baseline, "\u{2022}")?;
            }
            for token in line {
                self.pdf.draw_text(
                    FontVariant::for_style(token.style),
                    size,
                    token.x,
                    baseline,
                    &token.text,
                )?;
            }
            self.y -= line_height;
        }
        Ok(())
    }

    /// Single bold line (headings, the name) — wrapped like everything else
    /// so absurdly long input still lays out.
    fn draw_bold_line(&mut self, text: &str, size: f32) -> Result<(), std::fmt::Error> {
        let spans = [Span {
            text: text.to_string(),
            style: SpanStyle::Bold,
        }];
        self.draw_spans(&spans, size, MARGIN, false)
    }

    fn draw_rule(&mut self) -> Result<(), std::fmt::Error> {
        self.y -= RULE_GAP;
        self.ensure_room(0.0);
        self.pdf.draw_rule(MARGIN, PAGE_WIDTH - MARGIN, self.y)?;
        self.y -= RULE_GAP;
        Ok(())
    }

    fn draw_block(
        &mut self,
        block: &Block,
        options: &RenderOptions,
    ) -> Result<(), std::fmt::Error> {
        match block {
            Block::NameHeader { name, contact_line } => {
                self.draw_bold_line(name, NAME_SIZE)?;
                if !options.subtitle.is_empty() {
                    self.draw_bold_line(&options.subtitle, SUBTITLE_SIZE)?;
                }
                if !contact_line.is_empty() {
                    let spans = crate::render::parse::scan_spans(contact_line);
                    self.draw_spans(&spans, CONTACT_SIZE, MARGIN, false)?;
                }
                self.draw_rule()
            }
            Block::SectionHeading { text, level } => {
                self.y -= HEADING_LEAD;
                let heading = if *level == 2 {
                    text.to_uppercase()
                } else {
                    text.clone()
                };
                self.draw_bold_line(&heading, HEADING_SIZE)?;
                self.draw_rule()
            }
            Block::Rule => self.draw_rule(),
            Block::Bullet { spans } => {
                self.draw_spans(spans, BODY_SIZE, MARGIN + BULLET_INDENT, true)
            }
            Block::Paragraph { spans } => self.draw_spans(spans, BODY_SIZE, MARGIN, false),
            Block::Blank => {
                // No page break on blank lines unless we are already past the
                // bottom; whitespace never opens a page.
                if !self.at_bottom() {
                    self.y -= BLANK_GAP;
                }
                Ok(())
            }
        }
    }
}
