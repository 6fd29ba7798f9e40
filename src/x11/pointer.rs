//! Pointer synthesis (XTest) and cursor visibility (XFixes).

use std::sync::Arc;

use x11rb::CURRENT_TIME;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, Window};
use x11rb::protocol::{xfixes, xtest};
use x11rb::rust_connection::RustConnection;

use super::{X11Context, X11Error};
use crate::geometry::Point;
use crate::provider::{CursorVisibility, PointerDriver, ProviderError};

const BUTTON_PRIMARY: u8 = 1;
const BUTTON_SECONDARY: u8 = 3;

/// Pointer driver injecting events through the XTest extension.
pub struct XTestPointer {
    conn: Arc<RustConnection>,
    root: Window,
}

impl XTestPointer {
    /// Check the server supports XTest and build the driver.
    pub fn new(ctx: &X11Context) -> Result<Self, X11Error> {
        xtest::get_version(&**ctx.conn(), 2, 2)
            .map_err(|_| X11Error::MissingExtension("XTEST"))?
            .reply()
            .map_err(|_| X11Error::MissingExtension("XTEST"))?;

        Ok(Self {
            conn: ctx.conn().clone(),
            root: ctx.root(),
        })
    }

    fn fake(&self, event_type: u8, detail: u8, point: Point) -> Result<(), ProviderError> {
        xtest::fake_input(
            &*self.conn,
            event_type,
            detail,
            CURRENT_TIME,
            self.root,
            to_coord(point.x),
            to_coord(point.y),
            0,
        )
        .map_err(|e| ProviderError::Pointer(format!("xtest fake_input: {e}")))?;
        Ok(())
    }

    fn click(&self, button: u8, point: Point) -> Result<(), ProviderError> {
        self.fake(xproto::BUTTON_PRESS_EVENT, button, point)?;
        self.fake(xproto::BUTTON_RELEASE_EVENT, button, point)
    }

    fn flush(&self) -> Result<(), ProviderError> {
        self.conn
            .flush()
            .map_err(|e| ProviderError::Pointer(format!("flush: {e}")))
    }
}

impl PointerDriver for XTestPointer {
    fn move_to(&self, point: Point) -> Result<(), ProviderError> {
        // detail 0 = absolute motion on `root`.
        self.fake(xproto::MOTION_NOTIFY_EVENT, 0, point)?;
        self.flush()
    }

    fn primary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.click(BUTTON_PRIMARY, point)?;
        self.flush()
    }

    fn secondary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.click(BUTTON_SECONDARY, point)?;
        self.flush()
    }

    fn double_primary_click(&self, point: Point) -> Result<(), ProviderError> {
        self.click(BUTTON_PRIMARY, point)?;
        self.click(BUTTON_PRIMARY, point)?;
        self.flush()
    }
}

/// Round to the nearest pixel, saturating at the protocol's i16 range.
fn to_coord(v: f64) -> i16 {
    v.round() as i16
}

/// Cursor visibility through XFixes `HideCursor` / `ShowCursor`.
///
/// The server reference-counts hides per client, and releases them all
/// when the connection closes.
pub struct XFixesCursor {
    conn: Arc<RustConnection>,
    root: Window,
}

impl XFixesCursor {
    /// Negotiate XFixes (required before any XFixes request) and build
    /// the service.
    pub fn new(ctx: &X11Context) -> Result<Self, X11Error> {
        xfixes::query_version(&**ctx.conn(), 4, 0)
            .map_err(|_| X11Error::MissingExtension("XFIXES"))?
            .reply()
            .map_err(|_| X11Error::MissingExtension("XFIXES"))?;

        Ok(Self {
            conn: ctx.conn().clone(),
            root: ctx.root(),
        })
    }

    fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            tracing::warn!(error = %e, "flush after cursor change failed");
        }
    }
}

impl CursorVisibility for XFixesCursor {
    fn hide(&self) {
        if let Err(e) = xfixes::hide_cursor(&*self.conn, self.root) {
            tracing::warn!(error = %e, "XFixesHideCursor failed");
        }
        self.flush();
    }

    fn show(&self) {
        if let Err(e) = xfixes::show_cursor(&*self.conn, self.root) {
            tracing::warn!(error = %e, "XFixesShowCursor failed");
        }
        self.flush();
    }
}
