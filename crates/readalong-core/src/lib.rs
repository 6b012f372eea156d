pub mod align;
pub mod config;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod highlight;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod speech;
pub mod text;
pub mod words;

use align::AlignCursor;
use error::ReadAlongError;
use extraction::ocr::{ocr_text, OcrFallback};
use extraction::PdfExtractor;
use model::{AlignedUnit, Document, GeometrySource, HighlightMode};
use serde::Serialize;
use tracing::{info, warn};

/// Main API entry point: turn PDF bytes into a document ready for playback.
///
/// Word geometry comes from the text layer. When the text layer has no
/// positioned glyphs (a scanned document) and `ocr` is given, pages are
/// recognized instead. Extraction failures abort without a partial result.
pub fn analyze_pdf(
    pdf_bytes: &[u8],
    extractor: &dyn PdfExtractor,
    ocr: Option<&OcrFallback>,
) -> Result<Document, ReadAlongError> {
    let extraction = extractor.extract(pdf_bytes)?;
    info!(
        backend = extractor.backend_name(),
        pages = extraction.page_count,
        glyphs = extraction.glyph_count(),
        "text layer extracted"
    );

    let mut full_text = extraction.full_text.clone();
    let mut geometry_source = GeometrySource::TextLayer;
    let mut word_boxes = extraction.word_boxes();

    if extraction.is_empty() {
        match ocr {
            Some(ocr) => {
                warn!(
                    pages = extraction.page_count,
                    "no positioned text found, falling back to OCR"
                );
                word_boxes = ocr.word_boxes(extraction.page_count)?;
                geometry_source = GeometrySource::Ocr;
                if full_text.trim().is_empty() {
                    full_text = ocr_text(&word_boxes);
                }
            }
            None => warn!("no positioned text found and OCR is not configured"),
        }
    }

    let sentences = text::segment_sentences(&full_text);

    Ok(Document {
        page_count: extraction.page_count,
        full_text,
        sentences,
        word_boxes,
        geometry_source,
    })
}

/// One unit of a dry-run alignment over a whole document.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUnit {
    pub sentence_index: usize,
    pub text: String,
    /// `None` when the unit matched no word box.
    pub aligned: Option<AlignedUnit>,
}

/// Align every unit the way playback would, without pacing or output.
pub fn align_document(document: &Document, mode: HighlightMode) -> Vec<PlannedUnit> {
    let mut cursor = AlignCursor::new();
    let mut units = Vec::new();

    for (sentence_index, sentence) in document.sentences.iter().enumerate() {
        match mode {
            HighlightMode::Sentence => {
                let alignment = cursor.align(&text::tokenize(sentence), &document.word_boxes);
                units.push(PlannedUnit {
                    sentence_index,
                    text: sentence.clone(),
                    aligned: alignment.into_unit(sentence),
                });
            }
            HighlightMode::Word => {
                for (word, token) in text::words_with_tokens(sentence) {
                    let alignment =
                        cursor.align(std::slice::from_ref(&token), &document.word_boxes);
                    units.push(PlannedUnit {
                        sentence_index,
                        text: word.to_string(),
                        aligned: alignment.into_unit(word),
                    });
                }
            }
        }
    }

    units
}
