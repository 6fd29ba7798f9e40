//! Keyboard capture — exclusive grab plus a polling event thread.
//!
//! `GrabKeyboard` on the root window routes every key to us and keeps it
//! away from the focused client for the lifetime of the grab. A dedicated
//! thread polls the connection fd and forwards translated key events to
//! the session's channel.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tokio::sync::mpsc::UnboundedSender;
use x11rb::CURRENT_TIME;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{self, GrabMode, GrabStatus};
use x11rb::rust_connection::RustConnection;

use super::{Keymap, X11Context, X11Error};
use crate::provider::{
    InputEventSource, InputSubscription, KeyEventKind, KeyGrab, ProviderError, RawKeyEvent,
};

/// Attempts at grabbing the keyboard before giving up.
///
/// Activation usually happens from a hotkey whose own passive grab is
/// still held for a moment after the press.
const GRAB_ATTEMPTS: u32 = 10;
const GRAB_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Input Event Source backed by an X11 keyboard grab.
pub struct X11KeyboardSource {
    ctx: Arc<X11Context>,
}

impl X11KeyboardSource {
    pub fn new(ctx: Arc<X11Context>) -> Self {
        Self { ctx }
    }

    fn grab(&self) -> Result<(), X11Error> {
        let conn = self.ctx.conn();
        let mut status = GrabStatus::ALREADY_GRABBED;

        for attempt in 1..=GRAB_ATTEMPTS {
            status = xproto::grab_keyboard(
                &**conn,
                false, // owner_events
                self.ctx.root(),
                CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .map_err(X11Error::request("grab_keyboard"))?
            .reply()
            .map_err(X11Error::request("grab_keyboard reply"))?
            .status;

            if status == GrabStatus::SUCCESS {
                return Ok(());
            }

            tracing::debug!(attempt, ?status, "keyboard grab refused, retrying");
            std::thread::sleep(GRAB_RETRY_DELAY);
        }

        Err(X11Error::Request {
            request: "grab_keyboard",
            detail: format!("{status:?}"),
        })
    }
}

impl InputEventSource for X11KeyboardSource {
    fn subscribe(&self) -> Result<InputSubscription, ProviderError> {
        let to_input = |e: X11Error| ProviderError::Input(e.to_string());

        // Reload per grab so layout switches between sessions are honoured.
        let keymap = Keymap::load(self.ctx.conn()).map_err(to_input)?;
        self.grab().map_err(to_input)?;

        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        let thread = match spawn_event_thread(self.ctx.conn().clone(), keymap, stop.clone(), tx) {
            Ok(thread) => thread,
            Err(e) => {
                ungrab(self.ctx.conn());
                return Err(ProviderError::Input(format!("spawn event thread: {e}")));
            }
        };

        tracing::debug!("keyboard grabbed");
        Ok(InputSubscription {
            events: rx,
            grab: Box::new(X11KeyGrab {
                conn: self.ctx.conn().clone(),
                stop,
                thread,
            }),
        })
    }
}

/// An active keyboard grab and its event thread.
struct X11KeyGrab {
    conn: Arc<RustConnection>,
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl KeyGrab for X11KeyGrab {
    fn release(self: Box<Self>) {
        let Self { conn, stop, thread } = *self;
        stop.store(true, Ordering::Relaxed);
        ungrab(&conn);

        // The thread notices the flag within one poll timeout.
        if thread.join().is_err() {
            tracing::warn!("x11 event thread panicked");
        }
        tracing::debug!("keyboard released");
    }
}

fn ungrab(conn: &RustConnection) {
    if let Err(e) = xproto::ungrab_keyboard(conn, CURRENT_TIME) {
        tracing::debug!(error = %e, "UngrabKeyboard failed");
    }
    if let Err(e) = conn.flush() {
        tracing::debug!(error = %e, "flush after ungrab failed");
    }
}

/// Spawn a dedicated thread that polls the X11 connection for events.
///
/// Uses `nix::poll()` on the X11 connection fd with a 100ms timeout.
/// When readable, drains all available events via `poll_for_event()`,
/// forwarding key presses and releases. Checks the `stop` flag each
/// iteration for clean shutdown.
fn spawn_event_thread(
    conn: Arc<RustConnection>,
    keymap: Keymap,
    stop: Arc<AtomicBool>,
    tx: UnboundedSender<RawKeyEvent>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("x11-keys".into())
        .spawn(move || {
            let raw_fd = conn.stream().as_raw_fd();

            while !stop.load(Ordering::Relaxed) {
                // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
                let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
                let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

                match poll(&mut fds, PollTimeout::from(100u16)) {
                    Ok(0) => continue, // Timeout — check stop flag.
                    Ok(_) => loop {
                        match conn.poll_for_event() {
                            Ok(Some(event)) => {
                                let Some(key) = translate(&keymap, &event) else {
                                    continue;
                                };
                                if tx.send(key).is_err() {
                                    // Receiver dropped — shut down.
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "X11 connection error");
                                return;
                            }
                        }
                    },
                    Err(nix::Error::EINTR) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "poll error on X11 fd");
                        return;
                    }
                }
            }
        })
}

fn translate(keymap: &Keymap, event: &Event) -> Option<RawKeyEvent> {
    match event {
        Event::KeyPress(e) => Some(keymap.translate(KeyEventKind::Down, e.detail, e.state)),
        Event::KeyRelease(e) => Some(keymap.translate(KeyEventKind::Up, e.detail, e.state)),
        _ => None,
    }
}
