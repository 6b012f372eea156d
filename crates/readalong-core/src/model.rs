use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const MIN_ZOOM: f32 = 1.2;
pub const MAX_ZOOM: f32 = 4.0;
pub const MIN_WPM: u32 = 80;
pub const MAX_WPM: u32 = 260;

/// Bounds applied to the per-word pacing delay, in milliseconds.
pub const MIN_WORD_DELAY_MS: u64 = 120;
pub const MAX_WORD_DELAY_MS: u64 = 900;

/// One character of extracted text with its position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedGlyph {
    pub page: usize,
    pub character: char,
    pub rect: Rect,
}

impl PositionedGlyph {
    pub fn new(page: usize, character: char, rect: Rect) -> Self {
        PositionedGlyph {
            page,
            character,
            rect,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.character.is_whitespace()
    }
}

/// A word as it appears on the page: raw text plus the union of its glyph boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub page: usize,
    pub text: String,
    pub rect: Rect,
}

/// A sentence or word matched against the page geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedUnit {
    /// Page of the last matched box.
    pub page: usize,
    pub source_text: String,
    /// Matched rectangles in reading order. Never empty.
    pub boxes: Vec<Rect>,
}

impl AlignedUnit {
    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_all(&self.boxes)
    }
}

/// Where a document's word geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    TextLayer,
    Ocr,
}

impl fmt::Display for GeometrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometrySource::TextLayer => write!(f, "text layer"),
            GeometrySource::Ocr => write!(f, "OCR"),
        }
    }
}

/// A loaded document, ready for playback. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub page_count: usize,
    pub full_text: String,
    pub sentences: Vec<String>,
    pub word_boxes: Vec<WordBox>,
    pub geometry_source: GeometrySource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    #[default]
    Word,
    Sentence,
}

impl fmt::Display for HighlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightMode::Word => write!(f, "word"),
            HighlightMode::Sentence => write!(f, "sentence"),
        }
    }
}

impl HighlightMode {
    pub fn from_str_loose(s: &str) -> Option<HighlightMode> {
        match s.trim().to_lowercase().as_str() {
            "word" | "words" | "w" => Some(HighlightMode::Word),
            "sentence" | "sentences" | "s" => Some(HighlightMode::Sentence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowMode {
    /// Advance when the speech engine finishes the current unit.
    #[default]
    SpeechDriven,
    /// Advance on a fixed cadence derived from words per minute.
    FixedTimer,
}

impl fmt::Display for FollowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowMode::SpeechDriven => write!(f, "speech"),
            FollowMode::FixedTimer => write!(f, "timer"),
        }
    }
}

impl FollowMode {
    pub fn from_str_loose(s: &str) -> Option<FollowMode> {
        match s.trim().to_lowercase().as_str() {
            "speech" | "tts" | "speech_driven" => Some(FollowMode::SpeechDriven),
            "timer" | "auto" | "autotimer" | "fixed_timer" => Some(FollowMode::FixedTimer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub target_zoom: f32,
    pub highlight_mode: HighlightMode,
    pub follow_mode: FollowMode,
    pub words_per_minute: u32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            target_zoom: 2.2,
            highlight_mode: HighlightMode::Word,
            follow_mode: FollowMode::SpeechDriven,
            words_per_minute: 170,
        }
    }
}

impl ReaderSettings {
    /// Delay spent on a single word under fixed-timer pacing.
    ///
    /// `60000 / wpm` with integer division, clamped to 120..=900 ms.
    pub fn per_word_delay(&self) -> Duration {
        let ms = 60_000 / u64::from(self.words_per_minute.max(1));
        Duration::from_millis(ms.clamp(MIN_WORD_DELAY_MS, MAX_WORD_DELAY_MS))
    }

    /// Copy with zoom and wpm coerced into their allowed ranges.
    pub fn clamped(&self) -> ReaderSettings {
        ReaderSettings {
            target_zoom: if self.target_zoom.is_finite() {
                self.target_zoom.clamp(MIN_ZOOM, MAX_ZOOM)
            } else {
                ReaderSettings::default().target_zoom
            },
            words_per_minute: self.words_per_minute.clamp(MIN_WPM, MAX_WPM),
            ..*self
        }
    }
}
