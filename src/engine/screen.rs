//! Which display the overlay goes on.

use crate::geometry::Rect;

/// One attached display in global coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Display {
    pub frame: Rect,
    pub primary: bool,
}

/// The primary display: the first flagged primary, else the first listed.
pub fn primary_display(displays: &[Display]) -> Option<&Display> {
    displays.iter().find(|d| d.primary).or_else(|| displays.first())
}

/// Pick the display for an overlay targeting `window`.
///
/// With no window the primary display wins. Otherwise the display with
/// the largest intersection with the window frame wins; ties go to the
/// display listed first. Returns `None` only when `displays` is empty.
pub fn select_display(window: Option<Rect>, displays: &[Display]) -> Option<Rect> {
    let Some(window) = window else {
        return primary_display(displays).map(|d| d.frame);
    };

    let mut best: Option<(&Display, f64)> = None;
    for display in displays {
        let area = display.frame.intersection_area(&window);
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((display, area)),
        }
    }

    best.map(|(d, _)| d.frame)
}
