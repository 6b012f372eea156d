use std::path::PathBuf;

use crate::output;
use crate::OcrArgs;

pub fn run(
    pdf_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
    ocr: OcrArgs,
) -> Result<(), readalong_core::error::ReadAlongError> {
    let document = super::load_document(&pdf_file, ocr)?;

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&document)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Analyzed {} page(s), {} sentence(s), {} word box(es), written to {}",
                document.page_count,
                document.sentences.len(),
                document.word_boxes.len(),
                path.display()
            );
            if document.word_boxes.is_empty() {
                eprintln!("  warning: no word geometry found, highlights will be unavailable");
            }
        }
        None => match output_format {
            "json" => output::json::print(&document)?,
            _ => println!("{}", output::table::format_document(&document)),
        },
    }

    Ok(())
}
