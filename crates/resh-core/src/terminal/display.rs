//! Rendering seam.

use crate::error::Result;
use crate::terminal::Framebuffer;

/// Something that can paint a framebuffer to an output device.
///
/// Implementations are expected to be diff-aware: they keep their own copy
/// of what was last painted and emit only the changes. The controller hands
/// them one finished frame per update and never looks inside.
pub trait Display {
    /// Paint `frame`, emitting only what changed since the previous call.
    fn render(&mut self, frame: &Framebuffer) -> Result<()>;

    /// Forget the previous frame so the next `render` repaints everything.
    fn invalidate(&mut self);
}
