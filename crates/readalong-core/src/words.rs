use crate::geometry::Rect;
use crate::model::{PositionedGlyph, WordBox};

/// Incremental word box accumulator, scoped to one page at a time.
#[derive(Debug, Default)]
pub struct WordBoxBuilder {
    page: usize,
    buf: String,
    rect: Option<Rect>,
    words: Vec<WordBox>,
}

impl WordBoxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next glyph in reading order.
    pub fn push(&mut self, glyph: &PositionedGlyph) {
        if glyph.page != self.page {
            self.flush();
            self.page = glyph.page;
        }

        if glyph.is_blank() {
            self.flush();
            return;
        }

        self.buf.push(glyph.character);
        self.rect = Some(match self.rect {
            Some(r) => r.union(&glyph.rect),
            None => glyph.rect,
        });
    }

    /// Explicit page transition signalled by the extractor.
    pub fn page_break(&mut self, next_page: usize) {
        self.flush();
        self.page = next_page;
    }

    /// Number of words emitted so far.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.buf.is_empty()
    }

    /// Flush any pending run and return the words in input order.
    pub fn finish(mut self) -> Vec<WordBox> {
        self.flush();
        self.words
    }

    fn flush(&mut self) {
        if let Some(rect) = self.rect.take() {
            if !self.buf.is_empty() {
                self.words.push(WordBox {
                    page: self.page,
                    text: std::mem::take(&mut self.buf),
                    rect,
                });
            }
        }
        self.buf.clear();
    }
}

/// Build word boxes from a whole glyph stream.
///
/// A stream without any non-blank glyph yields an empty vector.
pub fn build_word_boxes<'a, I>(glyphs: I) -> Vec<WordBox>
where
    I: IntoIterator<Item = &'a PositionedGlyph>,
{
    let mut builder = WordBoxBuilder::new();
    for glyph in glyphs {
        builder.push(glyph);
    }
    builder.finish()
}
