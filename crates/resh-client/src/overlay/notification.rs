//! Notification bar.
//!
//! Holds a single status message plus the connection-staleness countup,
//! painted in reverse video across the top row of the frame.

use std::time::{Duration, Instant};

use resh_core::terminal::{Cell, Framebuffer};

/// Show "last contact" once the server has been silent this long.
const SERVER_LATE_THRESHOLD: Duration = Duration::from_millis(6500);

/// Show "last reply" once input has gone unacknowledged this long.
const REPLY_LATE_THRESHOLD: Duration = Duration::from_millis(10000);

/// Automatic (non user-triggered) messages expire after this long.
const MESSAGE_EXPIRATION: Duration = Duration::from_secs(1);

/// Countup refresh cadence.
const COUNTUP_WAIT: Duration = Duration::from_secs(1);

/// Engine owning the user-visible status message.
#[derive(Debug)]
pub struct NotificationEngine {
    last_word_from_server: Instant,
    last_acked_state: Instant,
    message: Option<String>,
    /// User-triggered messages take precedence over automatic status text
    /// and never expire on their own.
    message_user_triggered: bool,
    show_quit_keystroke: bool,
    message_expiration: Option<Instant>,
    network_error: Option<String>,
}

impl Default for NotificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationEngine {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_word_from_server: now,
            last_acked_state: now,
            message: None,
            message_user_triggered: false,
            show_quit_keystroke: true,
            message_expiration: None,
            network_error: None,
        }
    }

    /// Record that data arrived from the server.
    pub fn server_heard(&mut self, timestamp: Instant) {
        self.last_word_from_server = timestamp;
    }

    /// Record that the server acknowledged our outbound state.
    pub fn server_acked(&mut self, timestamp: Instant) {
        self.last_acked_state = timestamp;
    }

    /// Set the status message.
    ///
    /// Automatic messages never displace an unexpired user-triggered one,
    /// and expire after one second unless refreshed.
    pub fn set_notification(&mut self, msg: &str, user_triggered: bool, show_quit: bool) {
        if !user_triggered && self.message_user_triggered && self.message.is_some() {
            return;
        }
        self.message = Some(msg.to_string());
        self.message_user_triggered = user_triggered;
        self.show_quit_keystroke = show_quit;
        self.message_expiration = if user_triggered {
            None
        } else {
            Some(Instant::now() + MESSAGE_EXPIRATION)
        };
    }

    /// Current message text, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.message_user_triggered = false;
        self.message_expiration = None;
        self.show_quit_keystroke = true;
    }

    /// Record a recoverable transport fault for display.
    pub fn set_network_error(&mut self, msg: &str) {
        self.network_error = Some(msg.to_string());
    }

    pub fn clear_network_error(&mut self) {
        self.network_error = None;
    }

    fn server_late(&self, now: Instant) -> bool {
        now.duration_since(self.last_word_from_server) > SERVER_LATE_THRESHOLD
    }

    fn reply_late(&self, now: Instant) -> bool {
        now.duration_since(self.last_acked_state) > REPLY_LATE_THRESHOLD
    }

    fn need_countup(&self, now: Instant) -> bool {
        self.server_late(now) || self.reply_late(now)
    }

    /// Drop an expired automatic message.
    fn adjust(&mut self) {
        if let Some(expiration) = self.message_expiration {
            if Instant::now() >= expiration {
                self.clear();
            }
        }
    }

    /// How soon the bar needs re-evaluation absent new hints.
    pub fn wait_time(&self) -> Duration {
        let now = Instant::now();

        if let Some(expiration) = self.message_expiration {
            if expiration > now {
                return expiration.duration_since(now);
            }
        }
        if self.need_countup(now) || self.network_error.is_some() {
            return COUNTUP_WAIT;
        }

        let since_heard = now.duration_since(self.last_word_from_server);
        if since_heard < SERVER_LATE_THRESHOLD {
            return SERVER_LATE_THRESHOLD - since_heard;
        }
        COUNTUP_WAIT
    }

    fn bar_text(&self, now: Instant) -> Option<String> {
        let text = self.network_error.as_deref().or(self.message.as_deref());
        let countup = self.need_countup(now);

        if text.is_none() && !countup {
            return None;
        }

        let (elapsed, explanation) = if self.reply_late(now) && !self.server_late(now) {
            (now.duration_since(self.last_acked_state), "reply")
        } else {
            (now.duration_since(self.last_word_from_server), "contact")
        };

        let quit_hint = if self.show_quit_keystroke {
            " [To quit: Ctrl-^ .]"
        } else {
            ""
        };

        Some(match (text, countup) {
            (None, _) => format!(
                "resh: Last {} {}.{}",
                explanation,
                seconds_ago(elapsed),
                quit_hint
            ),
            (Some(msg), false) => format!("resh: {msg}{quit_hint}"),
            (Some(msg), true) => format!(
                "resh: {} ({} without {}.){}",
                msg,
                seconds_short(elapsed),
                explanation,
                quit_hint
            ),
        })
    }

    /// Paint the bar into the top row of the frame, if anything to show.
    pub fn apply(&mut self, frame: &mut Framebuffer) {
        self.adjust();
        let Some(text) = self.bar_text(Instant::now()) else {
            return;
        };

        let bar = Cell {
            ch: ' ',
            underline: false,
            dim: false,
            reverse: true,
        };
        frame.fill_row(0, bar);
        frame.write_text(0, 0, &text, bar);
        if frame.cursor_row == 0 {
            // The bar covers the cursor line; park the cursor under it.
            frame.cursor_row = 1.min(frame.rows() - 1);
        }
    }
}

fn seconds_ago(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs} seconds ago")
    } else if secs < 3600 {
        format!("{}:{:02} ago", secs / 60, secs % 60)
    } else {
        format!("{}:{:02}:{:02} ago", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

fn seconds_short(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
