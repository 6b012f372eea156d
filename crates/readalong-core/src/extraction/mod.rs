pub mod ocr;
pub mod pdftotext;

use crate::error::ReadAlongError;
use crate::model::{PositionedGlyph, WordBox};
use crate::words::WordBoxBuilder;

/// Glyphs of one page, in reading order.
#[derive(Debug, Clone, Default)]
pub struct PageGlyphs {
    pub page: usize,
    pub glyphs: Vec<PositionedGlyph>,
}

/// Text layer of a document: logical text plus positioned glyphs.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub full_text: String,
    pub pages: Vec<PageGlyphs>,
    pub page_count: usize,
}

impl Extraction {
    /// True when no page carries a single non-blank glyph, e.g. a scanned
    /// document without a text layer. This is the OCR fallback trigger.
    pub fn is_empty(&self) -> bool {
        self.pages
            .iter()
            .flat_map(|p| p.glyphs.iter())
            .all(PositionedGlyph::is_blank)
    }

    pub fn glyph_count(&self) -> usize {
        self.pages.iter().map(|p| p.glyphs.len()).sum()
    }

    /// Run the word box builder over every page, flushing at page boundaries.
    pub fn word_boxes(&self) -> Vec<WordBox> {
        let mut builder = WordBoxBuilder::new();
        for page in &self.pages {
            builder.page_break(page.page);
            for glyph in &page.glyphs {
                builder.push(glyph);
            }
        }
        builder.finish()
    }
}

/// Trait for PDF text extraction backends.
pub trait PdfExtractor: Send + Sync {
    /// Extract the full text and per-page glyph positions from PDF bytes.
    fn extract(&self, pdf_bytes: &[u8]) -> Result<Extraction, ReadAlongError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
