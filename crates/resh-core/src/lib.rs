//! resh-core: shared library for the resh remote terminal.
//!
//! This crate provides:
//! - Error types shared by the client and any transport backend
//! - Logging setup
//! - The framebuffer model and the Display rendering seam
//! - The Transport abstraction plus the default datagram transport

pub mod error;
pub mod logging;
pub mod terminal;
pub mod transport;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
