//! X11 adapters — every platform collaborator hint mode needs on Linux.
//!
//! One [`X11Context`] connection is shared by all adapters:
//! - [`X11KeyboardSource`]: exclusive keyboard grab + event thread.
//! - [`XTestPointer`]: synthetic pointer motion and clicks.
//! - [`XFixesCursor`]: pointer cursor hide/show.
//!
//! Window geometry and display enumeration live on the context itself.

pub mod context;
pub mod input;
pub mod keymap;
pub mod pointer;

pub use context::X11Context;
pub use input::X11KeyboardSource;
pub use keymap::Keymap;
pub use pointer::{XFixesCursor, XTestPointer};

/// X11 adapter error.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    /// Could not open the display.
    #[error("x11 connect failed: {0}")]
    Connect(String),

    /// A request or its reply failed.
    #[error("x11 {request}: {detail}")]
    Request {
        request: &'static str,
        detail: String,
    },

    /// The server lacks an extension hint mode depends on.
    #[error("x11 extension {0} unavailable")]
    MissingExtension(&'static str),
}

impl X11Error {
    /// `map_err` helper: tag an error with the request that produced it.
    pub(crate) fn request<E: std::fmt::Display>(request: &'static str) -> impl FnOnce(E) -> Self {
        move |e| X11Error::Request {
            request,
            detail: e.to_string(),
        }
    }
}
