//! OverlayRenderer trait — draws hint labels over a display.
//!
//! One [`Overlay`] is opened per session and closed on teardown. The
//! renderer owns all visual policy: which labels are shown for a typed
//! prefix and how overlapping labels cycle on rotate.

use super::Hint;
use crate::geometry::Rect;

/// Visual parameters for an overlay, taken from the session config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub text_size: f32,
}

/// Opens overlays.
pub trait OverlayRenderer: Send + Sync {
    /// Show an empty overlay covering `display`.
    fn open(&self, display: Rect, style: OverlayStyle) -> Box<dyn Overlay>;
}

/// A visible overlay belonging to one session.
pub trait Overlay: Send {
    /// Install the session's full hint set. Called once.
    fn set_hints(&mut self, hints: &[Hint]);

    /// Re-filter labels for the current typed prefix (as typed, not
    /// normalised).
    fn set_typed_prefix(&mut self, prefix: &str);

    /// Cycle label stacking / visibility for overlapping targets.
    fn rotate(&mut self);

    /// Hide and dispose of the overlay.
    fn close(self: Box<Self>);
}

/// Renders the overlay as log lines instead of drawing on screen.
///
/// Useful headless and as the reference for what a graphical renderer
/// has to show: the labels still matching the prefix, in stacking order.
pub struct LogOverlayRenderer;

impl OverlayRenderer for LogOverlayRenderer {
    fn open(&self, area: Rect, style: OverlayStyle) -> Box<dyn Overlay> {
        tracing::info!(
            x = area.x,
            y = area.y,
            width = area.width,
            height = area.height,
            text_size = style.text_size,
            "overlay shown"
        );
        Box::new(LogOverlay::default())
    }
}

#[derive(Debug, Default)]
struct LogOverlay {
    labels: Vec<String>,
    prefix: String,
    rotation: usize,
}

impl LogOverlay {
    /// Labels matching the prefix, starting from the current rotation.
    fn visible_labels(&self) -> Vec<&str> {
        let prefix = self.prefix.to_uppercase();
        let matching: Vec<&str> = self
            .labels
            .iter()
            .map(String::as_str)
            .filter(|label| label.starts_with(&prefix))
            .collect();

        if matching.is_empty() {
            return matching;
        }

        let split = self.rotation % matching.len();
        let mut rotated = matching[split..].to_vec();
        rotated.extend_from_slice(&matching[..split]);
        rotated
    }

    fn render(&self) {
        let visible = self.visible_labels();
        tracing::info!(
            prefix = %self.prefix,
            matching = visible.len(),
            labels = %visible.join(" "),
            "overlay"
        );
    }
}

impl Overlay for LogOverlay {
    fn set_hints(&mut self, hints: &[Hint]) {
        self.labels = hints.iter().map(|h| h.label().to_string()).collect();
        self.render();
    }

    fn set_typed_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        self.render();
    }

    fn rotate(&mut self) {
        self.rotation = self.rotation.wrapping_add(1);
        self.render();
    }

    fn close(self: Box<Self>) {
        tracing::info!("overlay hidden");
    }
}
