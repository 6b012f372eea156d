use crate::error::ReadAlongError;
use crate::model::{ReaderSettings, MAX_WPM, MAX_ZOOM, MIN_WPM, MIN_ZOOM};
use std::path::Path;

/// Load reader settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<ReaderSettings, ReadAlongError> {
    let content = std::fs::read_to_string(path).map_err(|e| ReadAlongError::SettingsLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let settings: ReaderSettings =
        serde_json::from_str(&content).map_err(|e| ReadAlongError::SettingsLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Parse reader settings from a JSON string (no file path context).
pub fn parse_settings(json: &str) -> Result<ReaderSettings, ReadAlongError> {
    let settings: ReaderSettings = serde_json::from_str(json)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Check that zoom and reading speed are within their allowed ranges.
pub fn validate_settings(settings: &ReaderSettings) -> Result<(), ReadAlongError> {
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&settings.target_zoom) {
        return Err(ReadAlongError::SettingsInvalid(format!(
            "target_zoom {} out of range ({MIN_ZOOM}..={MAX_ZOOM})",
            settings.target_zoom
        )));
    }

    if !(MIN_WPM..=MAX_WPM).contains(&settings.words_per_minute) {
        return Err(ReadAlongError::SettingsInvalid(format!(
            "words_per_minute {} out of range ({MIN_WPM}..={MAX_WPM})",
            settings.words_per_minute
        )));
    }

    Ok(())
}
