//! Action execution — pointer operations on a resolved hint.

use super::intent::HintAction;
use crate::geometry::Point;
use crate::provider::{Hint, PointerDriver, ProviderError, TargetElement};

/// Errors from executing a hint action.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ActionError {
    /// The element exposes neither a clipped nor a raw frame.
    #[error("target {label} has no frame")]
    NoFrame { label: String },

    #[error(transparent)]
    Pointer(#[from] ProviderError),
}

/// Where an element is clicked: the center of its clipped frame, or of
/// its raw frame when no clipped frame is known.
pub fn target_point(element: &dyn TargetElement) -> Option<Point> {
    element
        .clipped_frame()
        .or_else(|| element.frame())
        .map(|frame| frame.center())
}

/// Move the pointer to the hint's target point, then click once
/// according to `action`. No retries.
pub fn execute(
    hint: &Hint,
    action: HintAction,
    pointer: &dyn PointerDriver,
) -> Result<(), ActionError> {
    let point = target_point(hint.element()).ok_or_else(|| ActionError::NoFrame {
        label: hint.label().to_string(),
    })?;

    tracing::debug!(
        label = hint.label(),
        action = action.as_str(),
        x = point.x,
        y = point.y,
        "executing hint action"
    );

    pointer.move_to(point)?;
    match action {
        HintAction::Primary => pointer.primary_click(point)?,
        HintAction::Secondary => pointer.secondary_click(point)?,
        HintAction::DoublePrimary => pointer.double_primary_click(point)?,
    }

    Ok(())
}
