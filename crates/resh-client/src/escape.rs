//! Quit-escape keystroke interpreter.
//!
//! Mosh-style escape gesture: Ctrl-^ arms the interpreter, then `.` quits,
//! `^` sends a literal Ctrl-^, and anything else is released verbatim as
//! escape-then-byte. A strict two-state machine; the escape code never
//! reaches the transport on its own except through the `^` path.

/// The escape byte (Ctrl-^).
pub const ESCAPE_CODE: u8 = 0x1E;

/// Repaint-trigger byte (Ctrl-L): forwarded normally, but also flags a
/// full repaint for the rendering path.
pub const REPAINT_CODE: u8 = 0x0C;

/// What the controller should do with one interpreted byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Forward the byte to the transport unchanged.
    Forward(u8),
    /// Escape byte seen and absorbed; show the help notification.
    EnterEscape,
    /// The `^` path: forward exactly one escape byte.
    LiteralEscape,
    /// Unrecognized resolving byte: forward the escape byte, then this one.
    EscapedPair(u8),
    /// The `.` path: the user asked to quit.
    Quit,
}

impl KeyAction {
    /// True when this action resolved a pending escape (left `EscapeSeen`).
    /// The controller uses this to clear the help notification.
    pub fn resolves_escape(&self) -> bool {
        matches!(
            self,
            KeyAction::LiteralEscape | KeyAction::EscapedPair(_) | KeyAction::Quit
        )
    }
}

/// Two-state recognizer for the quit gesture.
#[derive(Debug, Default)]
pub struct QuitEscapeInterpreter {
    escape_seen: bool,
}

impl QuitEscapeInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret one input byte.
    pub fn interpret(&mut self, byte: u8) -> KeyAction {
        if self.escape_seen {
            self.escape_seen = false;
            return match byte {
                b'.' => KeyAction::Quit,
                b'^' => KeyAction::LiteralEscape,
                other => KeyAction::EscapedPair(other),
            };
        }

        if byte == ESCAPE_CODE {
            self.escape_seen = true;
            KeyAction::EnterEscape
        } else {
            KeyAction::Forward(byte)
        }
    }

    /// True while a resolving byte is awaited.
    pub fn armed(&self) -> bool {
        self.escape_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collect the bytes an action would put on the wire.
    fn forwarded(action: KeyAction) -> Vec<u8> {
        match action {
            KeyAction::Forward(b) => vec![b],
            KeyAction::LiteralEscape => vec![ESCAPE_CODE],
            KeyAction::EscapedPair(b) => vec![ESCAPE_CODE, b],
            KeyAction::EnterEscape | KeyAction::Quit => vec![],
        }
    }

    #[test]
    fn plain_bytes_pass_through_in_order() {
        let mut interp = QuitEscapeInterpreter::new();
        let input = b"ls -la\r";
        let mut out = Vec::new();
        for &b in input {
            out.extend(forwarded(interp.interpret(b)));
        }
        assert_eq!(out, input);
        assert!(!interp.armed());
    }

    #[test]
    fn escape_byte_is_absorbed_and_arms() {
        let mut interp = QuitEscapeInterpreter::new();
        let action = interp.interpret(ESCAPE_CODE);
        assert_eq!(action, KeyAction::EnterEscape);
        assert!(forwarded(action).is_empty());
        assert!(interp.armed());
    }

    #[test]
    fn caret_forwards_exactly_one_escape_byte() {
        let mut interp = QuitEscapeInterpreter::new();
        interp.interpret(ESCAPE_CODE);
        let action = interp.interpret(b'^');
        assert_eq!(forwarded(action), vec![ESCAPE_CODE]);
        assert!(action.resolves_escape());
        assert!(!interp.armed());
    }

    #[test]
    fn unknown_resolver_forwards_escape_then_byte() {
        let mut interp = QuitEscapeInterpreter::new();
        interp.interpret(ESCAPE_CODE);
        let action = interp.interpret(b'x');
        assert_eq!(forwarded(action), vec![ESCAPE_CODE, b'x']);
        assert!(!interp.armed());
    }

    #[test]
    fn dot_requests_quit_and_forwards_nothing() {
        let mut interp = QuitEscapeInterpreter::new();
        interp.interpret(ESCAPE_CODE);
        let action = interp.interpret(b'.');
        assert_eq!(action, KeyAction::Quit);
        assert!(forwarded(action).is_empty());
        assert!(!interp.armed());
    }

    #[test]
    fn double_escape_is_an_escaped_pair() {
        // A second escape byte is not special; it resolves like any other.
        let mut interp = QuitEscapeInterpreter::new();
        interp.interpret(ESCAPE_CODE);
        let action = interp.interpret(ESCAPE_CODE);
        assert_eq!(action, KeyAction::EscapedPair(ESCAPE_CODE));
        assert!(!interp.armed());
    }

    #[test]
    fn machine_returns_to_idle_after_every_resolution() {
        let mut interp = QuitEscapeInterpreter::new();
        for resolver in [b'.', b'^', b'q', 0x00, 0xFF] {
            interp.interpret(ESCAPE_CODE);
            assert!(interp.armed());
            interp.interpret(resolver);
            assert!(!interp.armed());
        }
    }

    #[test]
    fn enter_escape_does_not_resolve() {
        assert!(!KeyAction::EnterEscape.resolves_escape());
        assert!(!KeyAction::Forward(b'a').resolves_escape());
        assert!(KeyAction::Quit.resolves_escape());
    }
}
