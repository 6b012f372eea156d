use readalong_core::error::ReadAlongError;
use readalong_core::model::HighlightMode;
use std::path::PathBuf;

use crate::output;
use crate::OcrArgs;

pub fn run(
    pdf_file: PathBuf,
    mode: &str,
    output_format: &str,
    ocr: OcrArgs,
) -> Result<(), ReadAlongError> {
    let mode = HighlightMode::from_str_loose(mode).ok_or_else(|| {
        ReadAlongError::SettingsInvalid(format!("unknown highlight mode '{mode}' (word, sentence)"))
    })?;

    let document = super::load_document(&pdf_file, ocr)?;
    let units = readalong_core::align_document(&document, mode);

    match output_format {
        "json" => output::json::print(&units)?,
        _ => println!("{}", output::table::format_alignment(&units)),
    }

    let misses = units.iter().filter(|u| u.aligned.is_none()).count();
    if misses > 0 {
        eprintln!("{misses} of {} unit(s) matched no word box", units.len());
    }
    Ok(())
}
