use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A request to highlight the unit currently being read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightEvent {
    /// Position of this unit in the run (sentences or words, depending on mode).
    pub unit_index: usize,
    pub sentence_index: usize,
    pub page: usize,
    pub text: String,
    /// Individual rectangles for the overlay. Never empty.
    pub rects: Vec<Rect>,
    /// Union of `rects`, used to center the viewport.
    pub bounds: Rect,
    pub recommended_zoom: f32,
}

/// Where the viewport should move to show a highlight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTarget {
    pub page: usize,
    pub center_x: f32,
    pub center_y: f32,
    pub zoom: f32,
}

impl HighlightEvent {
    /// Center on the highlight; never zoom out below what the user has.
    pub fn viewport_target(&self, current_zoom: f32) -> ViewportTarget {
        let (center_x, center_y) = self.bounds.center();
        ViewportTarget {
            page: self.page,
            center_x,
            center_y,
            zoom: self.recommended_zoom.max(current_zoom),
        }
    }
}

/// Consumer of highlight events, typically a viewport with an overlay.
pub trait HighlightPort: Send + Sync {
    fn on_highlight(&self, event: &HighlightEvent);

    /// Playback finished or was stopped; the overlay may be cleared.
    fn on_finished(&self) {}
}

impl HighlightPort for mpsc::UnboundedSender<HighlightEvent> {
    fn on_highlight(&self, event: &HighlightEvent) {
        // A closed receiver just means nobody is watching anymore.
        let _ = self.send(event.clone());
    }
}
