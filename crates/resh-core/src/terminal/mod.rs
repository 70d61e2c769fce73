//! Terminal state representation.
//!
//! The client never parses escape sequences itself; it only moves complete
//! framebuffer snapshots around and paints overlays onto them. The emulator
//! producing those snapshots lives on the server side.

mod display;
mod framebuffer;

pub use display::Display;
pub use framebuffer::{Cell, Framebuffer};
