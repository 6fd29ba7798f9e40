//! X11 connection context — atoms, active window, geometry, monitors.
//!
//! Wraps `x11rb::rust_connection::RustConnection`. The connection is
//! shared (`Arc`) with the keyboard event thread and the pointer/cursor
//! adapters; `RustConnection` routes replies by sequence number, so
//! requests may be issued from any thread.

use std::sync::Arc;

use x11rb::connection::Connection;
use x11rb::protocol::randr;
use x11rb::protocol::xproto::{self, Atom, Window};
use x11rb::rust_connection::RustConnection;

use super::X11Error;
use crate::engine::Display;
use crate::geometry::Rect;

/// Pre-interned X11 atoms for property queries.
struct Atoms {
    net_active_window: Atom,
    net_wm_pid: Atom,
}

/// Shared X11 connection for all hint mode adapters.
pub struct X11Context {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: Window,
    atoms: Atoms,
}

impl X11Context {
    /// Connect to the display named by `$DISPLAY` and intern atoms.
    pub fn connect() -> Result<Self, X11Error> {
        let (conn, screen_num) =
            RustConnection::connect(None).map_err(|e| X11Error::Connect(e.to_string()))?;

        let root = conn.setup().roots[screen_num].root;

        let net_active_window = intern(&conn, b"_NET_ACTIVE_WINDOW")?;
        let net_wm_pid = intern(&conn, b"_NET_WM_PID")?;

        Ok(Self {
            conn: Arc::new(conn),
            screen_num,
            root,
            atoms: Atoms {
                net_active_window,
                net_wm_pid,
            },
        })
    }

    /// Get a shared reference to the X11 connection.
    pub fn conn(&self) -> &Arc<RustConnection> {
        &self.conn
    }

    pub fn root(&self) -> Window {
        self.root
    }

    /// Query the active (focused) top-level window via `_NET_ACTIVE_WINDOW`.
    ///
    /// Returns `None` when the window manager does not publish it or no
    /// window has focus.
    pub fn active_window(&self) -> Result<Option<Window>, X11Error> {
        let window = self.get_u32_property(
            self.root,
            self.atoms.net_active_window,
            xproto::AtomEnum::WINDOW,
        )?;
        Ok(window.filter(|&w| w != 0))
    }

    /// PID of the client owning `window`, from `_NET_WM_PID`.
    pub fn window_pid(&self, window: Window) -> Result<Option<u32>, X11Error> {
        self.get_u32_property(window, self.atoms.net_wm_pid, xproto::AtomEnum::CARDINAL)
    }

    /// Frame of `window` in root coordinates.
    pub fn window_frame(&self, window: Window) -> Result<Rect, X11Error> {
        let geometry = xproto::get_geometry(&*self.conn, window)
            .map_err(X11Error::request("get_geometry"))?
            .reply()
            .map_err(X11Error::request("get_geometry reply"))?;

        let origin = xproto::translate_coordinates(&*self.conn, window, self.root, 0, 0)
            .map_err(X11Error::request("translate_coordinates"))?
            .reply()
            .map_err(X11Error::request("translate_coordinates reply"))?;

        Ok(Rect::new(
            f64::from(origin.dst_x),
            f64::from(origin.dst_y),
            f64::from(geometry.width),
            f64::from(geometry.height),
        ))
    }

    /// Attached monitors, from RandR `GetMonitors`.
    ///
    /// Falls back to a single display covering the root window when the
    /// server has no RandR 1.5 or reports no monitors.
    pub fn displays(&self) -> Result<Vec<Display>, X11Error> {
        match self.randr_monitors() {
            Ok(displays) if !displays.is_empty() => return Ok(displays),
            Ok(_) => tracing::debug!("RandR reported no monitors, using root window"),
            Err(e) => tracing::debug!(error = %e, "RandR unavailable, using root window"),
        }

        let screen = &self.conn.setup().roots[self.screen_num];
        Ok(vec![Display {
            frame: Rect::new(
                0.0,
                0.0,
                f64::from(screen.width_in_pixels),
                f64::from(screen.height_in_pixels),
            ),
            primary: true,
        }])
    }

    fn randr_monitors(&self) -> Result<Vec<Display>, X11Error> {
        randr::query_version(&*self.conn, 1, 5)
            .map_err(X11Error::request("randr query_version"))?
            .reply()
            .map_err(X11Error::request("randr query_version reply"))?;

        let reply = randr::get_monitors(&*self.conn, self.root, true)
            .map_err(X11Error::request("randr get_monitors"))?
            .reply()
            .map_err(X11Error::request("randr get_monitors reply"))?;

        Ok(reply
            .monitors
            .iter()
            .map(|m| Display {
                frame: Rect::new(
                    f64::from(m.x),
                    f64::from(m.y),
                    f64::from(m.width),
                    f64::from(m.height),
                ),
                primary: m.primary,
            })
            .collect())
    }

    /// Read a single 32-bit property value.
    ///
    /// Returns `None` if the property is missing or malformed.
    fn get_u32_property(
        &self,
        window: Window,
        property: Atom,
        kind: xproto::AtomEnum,
    ) -> Result<Option<u32>, X11Error> {
        let reply = xproto::get_property(
            &*self.conn,
            false,
            window,
            property,
            kind,
            0,
            1, // We need one 32-bit value.
        )
        .map_err(X11Error::request("get_property"))?
        .reply()
        .map_err(X11Error::request("get_property reply"))?;

        if reply.format != 32 || reply.value.len() < 4 {
            return Ok(None);
        }

        Ok(Some(u32::from_ne_bytes([
            reply.value[0],
            reply.value[1],
            reply.value[2],
            reply.value[3],
        ])))
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, X11Error> {
    Ok(xproto::intern_atom(conn, false, name)
        .map_err(X11Error::request("intern_atom"))?
        .reply()
        .map_err(X11Error::request("intern_atom reply"))?
        .atom)
}
