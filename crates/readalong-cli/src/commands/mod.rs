pub mod align;
pub mod analyze;
pub mod read;
pub mod settings;

use crate::OcrArgs;
use readalong_core::error::ReadAlongError;
use readalong_core::extraction::ocr::{OcrFallback, PdftoppmRenderer, TesseractOcr};
use readalong_core::extraction::pdftotext::PdftotextExtractor;
use readalong_core::model::Document;
use std::path::Path;

/// OCR fallback over pdftoppm + tesseract, unless disabled.
pub fn ocr_fallback(pdf_bytes: &[u8], args: OcrArgs) -> Result<Option<OcrFallback>, ReadAlongError> {
    if args.no_ocr {
        return Ok(None);
    }
    let renderer = PdftoppmRenderer::new(pdf_bytes, args.ocr_dpi)?;
    Ok(Some(OcrFallback::new(
        Box::new(renderer),
        Box::new(TesseractOcr::default()),
    )))
}

/// pdftotext extractor, checked to be installed.
pub fn extractor() -> Result<PdftotextExtractor, ReadAlongError> {
    let extractor = PdftotextExtractor::new();
    extractor.ensure_available()?;
    Ok(extractor)
}

/// Read and analyze a PDF with the default backends.
pub fn load_document(pdf_file: &Path, ocr: OcrArgs) -> Result<Document, ReadAlongError> {
    let extractor = extractor()?;
    let pdf_bytes = std::fs::read(pdf_file)?;
    let ocr = ocr_fallback(&pdf_bytes, ocr)?;
    readalong_core::analyze_pdf(&pdf_bytes, &extractor, ocr.as_ref())
}
