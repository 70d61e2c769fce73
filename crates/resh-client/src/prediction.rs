//! Predictive local echo.
//!
//! Hides network latency by painting typed characters onto the displayed
//! frame before the server confirms them. Predictions carry the sequence
//! number of the outbound state that will deliver them; once the server's
//! echo acknowledgment passes that number, each prediction is checked
//! against the authoritative frame and either confirmed or counted as a
//! misprediction. Repeated mispredictions degrade confidence until the
//! engine stops predicting entirely.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use resh_core::terminal::{Cell, Framebuffer};

/// Adaptive mode predicts only when the link is at least this slow.
const GLITCH_THRESHOLD: Duration = Duration::from_millis(30);

/// Predictions the server never echoes are dropped after this long.
const PREDICTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Re-evaluation cadence while predictions are on screen.
const ACTIVE_WAIT: Duration = Duration::from_millis(50);
const IDLE_WAIT: Duration = Duration::from_secs(60);

/// When to display predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPreference {
    /// Always show speculative echo.
    Always,
    /// Never predict.
    Never,
    /// Predict only when the link is slow.
    #[default]
    Adaptive,
    /// Always predict, drawn dim instead of underlined.
    Experimental,
}

impl DisplayPreference {
    /// Parse the `MOSH_PREDICTION_DISPLAY` value. Unknown strings are a
    /// usage error for the caller to report.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "adaptive" => Some(Self::Adaptive),
            "experimental" => Some(Self::Experimental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confidence {
    Confident,
    Tentative,
    Disabled,
}

#[derive(Debug, Clone)]
struct CellEcho {
    seq: u64,
    ch: char,
    col: u16,
    row: u16,
    at: Instant,
}

/// Engine consuming keystroke and acknowledgment hints, producing overlay
/// cells. The controller feeds hints and reads `wait_time`; it never
/// inspects internal state.
#[derive(Debug)]
pub struct PredictionEngine {
    preference: DisplayPreference,
    confidence: Confidence,
    pending: VecDeque<CellEcho>,
    /// Cursor position implied by the predictions made so far; `None` means
    /// resynchronize from the next displayed frame.
    predicted_cursor: Option<(u16, u16)>,
    local_frame_sent: u64,
    local_frame_acked: u64,
    local_frame_late_acked: u64,
    send_interval: Duration,
    misprediction_count: u8,
}

impl PredictionEngine {
    pub fn new(preference: DisplayPreference) -> Self {
        Self {
            preference,
            confidence: Confidence::Confident,
            pending: VecDeque::new(),
            predicted_cursor: None,
            local_frame_sent: 0,
            local_frame_acked: 0,
            local_frame_late_acked: 0,
            send_interval: Duration::from_millis(100),
            misprediction_count: 0,
        }
    }

    pub fn set_display_preference(&mut self, preference: DisplayPreference) {
        self.preference = preference;
    }

    /// Speculate on one keystroke against the currently displayed frame.
    pub fn new_user_byte(&mut self, byte: u8, frame: &Framebuffer) {
        if self.preference == DisplayPreference::Never {
            return;
        }

        let (mut col, row) = self
            .predicted_cursor
            .unwrap_or((frame.cursor_col, frame.cursor_row));

        match byte {
            0x08 | 0x7F => {
                // Backspace: retract the newest prediction rather than
                // guessing at the server's line discipline.
                if self.pending.pop_back().is_some() {
                    self.predicted_cursor = Some((col.saturating_sub(1), row));
                } else {
                    self.predicted_cursor = None;
                }
            }
            0x20..=0x7E => {
                if !self.should_predict(byte as char) {
                    return;
                }
                if col >= frame.cols() {
                    // Off the right edge; wrapping behavior belongs to the
                    // server, stop speculating until it catches up.
                    self.predicted_cursor = None;
                    return;
                }
                self.pending.push_back(CellEcho {
                    seq: self.local_frame_sent + 1,
                    ch: byte as char,
                    col,
                    row,
                    at: Instant::now(),
                });
                col += 1;
                self.predicted_cursor = Some((col, row));
            }
            _ => {
                // Control bytes have unpredictable effects; drop speculation.
                self.pending.clear();
                self.predicted_cursor = None;
            }
        }
    }

    fn should_predict(&self, c: char) -> bool {
        match self.confidence {
            Confidence::Disabled => false,
            Confidence::Tentative => c.is_ascii_alphanumeric(),
            Confidence::Confident => true,
        }
    }

    pub fn set_local_frame_sent(&mut self, seq: u64) {
        self.local_frame_sent = seq;
    }

    pub fn set_local_frame_acked(&mut self, seq: u64) {
        self.local_frame_acked = seq;
    }

    pub fn set_local_frame_late_acked(&mut self, seq: u64) {
        self.local_frame_late_acked = seq;
    }

    pub fn set_send_interval(&mut self, interval: Duration) {
        self.send_interval = interval;
    }

    fn confirm(&mut self) {
        self.misprediction_count = 0;
        if self.confidence == Confidence::Tentative {
            self.confidence = Confidence::Confident;
        }
    }

    fn mispredict(&mut self) {
        self.pending.clear();
        self.predicted_cursor = None;
        self.misprediction_count = self.misprediction_count.saturating_add(1);
        self.confidence = match self.confidence {
            Confidence::Confident => Confidence::Tentative,
            Confidence::Tentative if self.misprediction_count >= 3 => Confidence::Disabled,
            c => c,
        };
    }

    /// Check pending predictions against the authoritative frame and drop
    /// everything the server has caught up with.
    fn cull(&mut self, frame: &Framebuffer) {
        let now = Instant::now();
        while let Some(echo) = self.pending.front() {
            if echo.seq <= self.local_frame_late_acked {
                let matched = frame
                    .get(echo.col, echo.row)
                    .is_some_and(|cell| cell.ch == echo.ch);
                if matched {
                    self.pending.pop_front();
                    self.confirm();
                } else {
                    self.mispredict();
                    return;
                }
            } else if now.duration_since(echo.at) > PREDICTION_TIMEOUT {
                self.pending.pop_front();
            } else {
                break;
            }
        }
        if self.pending.is_empty() {
            self.predicted_cursor = None;
        }
    }

    /// Whether predictions should be painted right now.
    fn active(&self) -> bool {
        match self.preference {
            DisplayPreference::Never => false,
            DisplayPreference::Always | DisplayPreference::Experimental => true,
            DisplayPreference::Adaptive => self.send_interval >= GLITCH_THRESHOLD,
        }
    }

    /// Compose pending predictions onto a frame.
    pub fn apply(&mut self, frame: &mut Framebuffer) {
        self.cull(frame);
        if !self.active() || self.confidence == Confidence::Disabled {
            return;
        }

        let dim = self.preference == DisplayPreference::Experimental;
        for echo in &self.pending {
            frame.set(
                echo.col,
                echo.row,
                Cell {
                    ch: echo.ch,
                    underline: !dim,
                    dim,
                    reverse: false,
                },
            );
        }
        if let Some((col, row)) = self.predicted_cursor {
            frame.cursor_col = col.min(frame.cols() - 1);
            frame.cursor_row = row.min(frame.rows() - 1);
        }
    }

    /// How soon the engine needs re-evaluation absent new input.
    pub fn wait_time(&self) -> Duration {
        if self.pending.is_empty() {
            IDLE_WAIT
        } else {
            ACTIVE_WAIT
        }
    }
}
