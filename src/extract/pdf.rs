//! First-page text recovery from PDF bytes.
//!
//! Real-world PDFs are inconsistent enough that no single library reads
//! them all, so three backends are tried in order and the first one that
//! produces non-empty text wins. Contact addresses almost always sit on
//! the title page, so only the first page is ever decoded.

use pdf::content::{Op, TextDrawAdjusted};
use pdf::file::FileOptions;

/// A single PDF text extraction strategy.
pub trait PdfTextBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text of the first page, or `None` when this backend cannot read
    /// the document
    fn first_page_text(&self, bytes: &[u8]) -> Option<String>;
}

/// `pdf-extract` backend; extracts the whole document and truncates at
/// the first form-feed page separator.
pub struct PdfExtractBackend;

impl PdfTextBackend for PdfExtractBackend {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn first_page_text(&self, bytes: &[u8]) -> Option<String> {
        let text = pdf_extract::extract_text_from_mem(bytes).ok()?;
        let first_page = match text.find('\u{c}') {
            Some(idx) => &text[..idx],
            None => text.as_str(),
        };
        Some(first_page.to_string())
    }
}

/// `lopdf` backend; page numbers are 1-based.
pub struct LopdfBackend;

impl PdfTextBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn first_page_text(&self, bytes: &[u8]) -> Option<String> {
        let doc = lopdf::Document::load_mem(bytes).ok()?;
        doc.extract_text(&[1]).ok()
    }
}

/// `pdf` crate backend; walks the first page's content operations and
/// collects the drawn text runs.
pub struct PdfCrateBackend;

impl PdfTextBackend for PdfCrateBackend {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn first_page_text(&self, bytes: &[u8]) -> Option<String> {
        let file = FileOptions::cached().load(bytes.to_vec()).ok()?;
        let resolver = file.resolver();
        let page = file.get_page(0).ok()?;
        let content = page.contents.as_ref()?;
        let ops = content.operations(&resolver).ok()?;

        let mut out = String::new();
        for op in &ops {
            match op {
                Op::TextDraw { text } => {
                    out.push_str(&text.to_string_lossy());
                    out.push(' ');
                }
                Op::TextDrawAdjusted { array } => {
                    for item in array {
                        if let TextDrawAdjusted::Text(text) = item {
                            out.push_str(&text.to_string_lossy());
                        }
                    }
                    out.push(' ');
                }
                _ => {}
            }
        }
        Some(out)
    }
}

/// First-page text via the backend chain, or `None` when every backend
/// fails or yields only whitespace.
pub fn first_page_text(bytes: &[u8]) -> Option<String> {
    let backends: [&dyn PdfTextBackend; 3] =
        [&PdfExtractBackend, &LopdfBackend, &PdfCrateBackend];

    for backend in backends {
        match backend.first_page_text(bytes) {
            Some(text) if !text.trim().is_empty() => {
                tracing::debug!(backend = backend.name(), chars = text.len(), "pdf text extracted");
                return Some(text);
            }
            Some(_) => {
                tracing::debug!(backend = backend.name(), "backend produced empty text");
            }
            None => {
                tracing::debug!(backend = backend.name(), "backend failed to read document");
            }
        }
    }
    None
}
