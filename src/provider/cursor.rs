//! Pointer cursor visibility.

use std::sync::Arc;

/// Global hide/unhide of the system pointer cursor.
///
/// Implementations must tolerate redundant calls.
pub trait CursorVisibility: Send + Sync {
    fn hide(&self);
    fn show(&self);
}

/// Keeps the cursor hidden for as long as it lives.
///
/// Dropping the guard shows the cursor again, so every path that
/// discards session state restores it.
#[must_use = "the cursor is shown again as soon as the guard is dropped"]
pub struct HiddenCursor {
    service: Arc<dyn CursorVisibility>,
}

impl HiddenCursor {
    pub fn hide(service: Arc<dyn CursorVisibility>) -> Self {
        service.hide();
        Self { service }
    }
}

impl Drop for HiddenCursor {
    fn drop(&mut self) {
        self.service.show();
    }
}
