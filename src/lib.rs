//! Keyboard-driven hint mode.
//!
//! Labels on-screen targets with short hints, narrows them as the user
//! types, and clicks the one whose label is typed in full.
//!
//! - [`engine`]: the platform-independent session state machine.
//! - [`provider`]: traits for the collaborators the engine drives.
//! - [`x11`]: Linux/X11 implementations of those collaborators.

pub mod config;
pub mod engine;
pub mod geometry;
pub mod logging;
pub mod provider;
pub mod x11;

#[cfg(test)]
mod test_support;
