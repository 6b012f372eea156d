//! Approximate alignment of logical text against extracted word boxes.
//!
//! The sentence text and the positional word stream are derived
//! independently and often disagree: hyphenated words split in two, ligatures
//! break words apart, OCR inserts stray symbols. Both streams are in reading
//! order, so a single forward pass with two pointers is enough:
//!
//! - `i` walks the word boxes from the caller's start position,
//! - `j` walks the normalized target tokens from zero.
//!
//! A box is accepted for the current token when its normalized text equals
//! the token, or is a non-empty prefix of it. Every box is visited at most
//! once per call and unmatched boxes are skipped. Nothing is ever rescanned.

use crate::geometry::Rect;
use crate::model::{AlignedUnit, WordBox};
use crate::text::normalize;

/// Outcome of one [`align`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    /// Rectangles of the accepted boxes, in reading order.
    pub rects: Vec<Rect>,
    /// Indices of the accepted boxes in the full box sequence.
    pub matched: Vec<usize>,
    /// Boxes visited by this call, starting at `start`.
    pub consumed: usize,
    /// Page of the last accepted box.
    pub page: Option<usize>,
}

impl Alignment {
    pub fn is_miss(&self) -> bool {
        self.rects.is_empty()
    }

    /// Index just past the last accepted box.
    pub fn end(&self) -> Option<usize> {
        self.matched.last().map(|i| i + 1)
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_all(&self.rects)
    }

    /// Package a hit as an [`AlignedUnit`]. `None` on a miss.
    pub fn into_unit(self, source_text: &str) -> Option<AlignedUnit> {
        let page = self.page?;
        if self.rects.is_empty() {
            return None;
        }
        Some(AlignedUnit {
            page,
            source_text: source_text.to_string(),
            boxes: self.rects,
        })
    }
}

fn accepts(word: &str, token: &str) -> bool {
    !word.is_empty() && (word == token || token.starts_with(word))
}

/// Match `target` tokens against `boxes`, scanning from `start`.
///
/// Tokens must already be normalized (see [`crate::text::tokenize`]). Empty
/// tokens are unmatchable and skipped without consuming a box. A `start`
/// past the end yields an empty alignment with `consumed == 0`.
pub fn align<T: AsRef<str>>(target: &[T], boxes: &[WordBox], start: usize) -> Alignment {
    let start = start.min(boxes.len());
    let mut out = Alignment::default();
    let mut i = start;
    let mut j = 0;

    while i < boxes.len() && j < target.len() {
        let token = target[j].as_ref();
        if token.is_empty() {
            j += 1;
            continue;
        }

        let word_box = &boxes[i];
        if accepts(&normalize(&word_box.text), token) {
            out.rects.push(word_box.rect);
            out.matched.push(i);
            out.page = Some(word_box.page);
            j += 1;
        }
        i += 1;
    }

    out.consumed = i - start;
    out
}

/// Alignment position owned by a single playback run.
///
/// Successive calls resume where the previous hit ended, so reading order is
/// preserved and the box sequence is walked once overall. A miss leaves the
/// position untouched, otherwise one unmatched sentence would exhaust the
/// sequence for everything after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignCursor {
    position: usize,
}

impl AlignCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: usize) -> Self {
        AlignCursor { position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.position)
    }

    /// Align `target` from the current position and advance past the last hit.
    pub fn align<T: AsRef<str>>(&mut self, target: &[T], boxes: &[WordBox]) -> Alignment {
        let alignment = align(target, boxes, self.position);
        if let Some(end) = alignment.end() {
            self.position = end;
        }
        alignment
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}
