use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReadAlongError {
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("OCR failed on page {page}: {reason}")]
    Ocr { page: usize, reason: String },

    #[error("{0} not found. Install it to enable OCR fallback for scanned documents")]
    OcrToolNotFound(String),

    #[error("speech output unavailable: {0}")]
    SpeechUnavailable(String),

    #[error("failed to load settings from {path}: {reason}")]
    SettingsLoad { path: PathBuf, reason: String },

    #[error("invalid settings: {0}")]
    SettingsInvalid(String),

    #[error("playback task failed: {0}")]
    Playback(String),

    #[error("no document loaded")]
    NoDocument,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
