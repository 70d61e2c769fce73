//! resh-client: client library for the resh remote terminal.
//!
//! Provides:
//! - CLI argument parsing and environment handling
//! - The session controller state machine
//! - Overlay engines (notification bar, predictive local echo)
//! - The quit-escape keystroke interpreter
//! - A diff-aware ANSI frame renderer
//! - Raw terminal mode glue and the event-loop driver

pub mod cli;
pub mod controller;
pub mod driver;
pub mod escape;
pub mod overlay;
pub mod prediction;
pub mod render;
pub mod terminal;

pub use cli::Cli;
pub use controller::{SessionConfig, SessionController, ShutdownState};
pub use escape::{KeyAction, QuitEscapeInterpreter, ESCAPE_CODE, REPAINT_CODE};
pub use overlay::{NotificationEngine, OverlayManager};
pub use prediction::{DisplayPreference, PredictionEngine};
pub use render::AnsiDisplay;
pub use terminal::{get_terminal_size, RawModeGuard, StdinReader};
