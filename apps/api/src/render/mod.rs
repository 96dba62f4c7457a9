//! Layout/rendering engine: constrained markdown in, paginated PDF bytes out.
//!
//! Three passes, all deterministic and free of external dependencies:
//! parse (`parse.rs`), line breaking + pagination (`layout.rs`), and page
//! painting (`pdf.rs`) against static Helvetica metrics (`fonts.rs`).

pub mod fonts;
pub mod layout;
pub mod parse;
pub mod pdf;

pub use layout::{render_document, RenderOptions, RenderedPdf};
pub use parse::parse_document;

/// Parses and renders in one call — the shape the pipeline consumes.
pub fn render_markdown(
    markdown: &str,
    options: &RenderOptions,
) -> Result<RenderedPdf, std::fmt::Error> {
    render_document(&parse_document(markdown), options)
}
