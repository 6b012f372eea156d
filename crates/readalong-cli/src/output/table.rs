use readalong_core::geometry::Rect;
use readalong_core::highlight::HighlightEvent;
use readalong_core::model::Document;
use readalong_core::PlannedUnit;
use std::fmt::Write;

/// Longest sentence preview shown in tables.
const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn rect(r: &Rect) -> String {
    format!(
        "[{:.1}, {:.1}, {:.1}, {:.1}]",
        r.left, r.top, r.right, r.bottom
    )
}

pub fn format_document(document: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Document ===\n");
    let _ = writeln!(out, "  Pages:      {}", document.page_count);
    let _ = writeln!(out, "  Geometry:   {}", document.geometry_source);
    let _ = writeln!(out, "  Word boxes: {}", document.word_boxes.len());
    let _ = writeln!(out, "  Sentences:  {}\n", document.sentences.len());

    if !document.word_boxes.is_empty() {
        let _ = writeln!(out, "=== Word boxes per page ===\n");
        let mut counts = vec![0usize; document.page_count];
        for word in &document.word_boxes {
            if let Some(count) = counts.get_mut(word.page) {
                *count += 1;
            }
        }
        for (page, count) in counts.iter().enumerate() {
            let _ = writeln!(out, "  page {:<4} {count}", page + 1);
        }
        let _ = writeln!(out);
    }

    if !document.sentences.is_empty() {
        let _ = writeln!(out, "=== Sentences ===\n");
        let width = document.sentences.len().to_string().len();
        for (i, sentence) in document.sentences.iter().enumerate() {
            let _ = writeln!(out, "  {:>width$}  {}", i + 1, preview(sentence));
        }
    }

    out.trim_end().to_string()
}

pub fn format_alignment(units: &[PlannedUnit]) -> String {
    let mut out = String::new();
    let max_text = units
        .iter()
        .map(|u| preview(&u.text).chars().count())
        .max()
        .unwrap_or(10);

    for unit in units {
        let text = preview(&unit.text);
        match &unit.aligned {
            Some(aligned) => {
                let bounds = aligned.bounds().map(|b| rect(&b)).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {:>4}  {:<width$}  p{:<4} {} box(es) {}",
                    unit.sentence_index + 1,
                    text,
                    aligned.page + 1,
                    aligned.boxes.len(),
                    bounds,
                    width = max_text
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "  {:>4}  {:<width$}  -- no match",
                    unit.sentence_index + 1,
                    text,
                    width = max_text
                );
            }
        }
    }

    let hits = units.iter().filter(|u| u.aligned.is_some()).count();
    let _ = writeln!(out, "\n  Aligned {hits} of {} unit(s)", units.len());
    out.trim_end().to_string()
}

/// Tracks the zoom a viewer would have while following highlights.
pub struct Viewport {
    zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { zoom: 1.0 }
    }
}

impl Viewport {
    /// Move to `event` and describe the new view.
    pub fn follow(&mut self, event: &HighlightEvent) -> String {
        let target = event.viewport_target(self.zoom);
        self.zoom = target.zoom;
        format!(
            "p{:<4} @({:.0}, {:.0}) x{:.1}  {}",
            target.page + 1,
            target.center_x,
            target.center_y,
            target.zoom,
            preview(&event.text)
        )
    }
}
