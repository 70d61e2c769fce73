//! Session controller.
//!
//! One cooperative tick of the session: reconcile the displayed framebuffer
//! with the latest remote snapshot, feed hints to the overlay engines, run
//! the quit-escape interpreter over user input, and drive the shutdown
//! handshake to one of its terminal states. Nothing here blocks; all
//! waiting happens in the driver, bounded by [`SessionController::compute_wait_deadline`].

use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use resh_core::terminal::Framebuffer;
use resh_core::transport::Transport;
use resh_core::{Error, Result};

use crate::escape::{KeyAction, QuitEscapeInterpreter, REPAINT_CODE};
use crate::overlay::OverlayManager;
use crate::prediction::DisplayPreference;

/// Refresh cadence for the "connecting" notification.
const CONNECT_REFRESH: Duration = Duration::from_millis(250);

/// Give up on a server that has never answered after this long.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(15000);

/// Lower bound on outbound send pacing, to coalesce keystroke bursts.
const MIN_SEND_DELAY: Duration = Duration::from_millis(1);

const HELP_MESSAGE: &str = "Commands: \".\" quits, \"^\" gives literal Ctrl-^";

/// Where the session stands in the two-sided close handshake.
///
/// Monotonic: once the state leaves `Active` it never returns, and the two
/// closed states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Normal operation.
    Active,
    /// We asked the peer to close; waiting for its acknowledgment.
    LocalRequested,
    /// The peer asked to close and we have acknowledged.
    RemoteAckSent,
    /// Both sides confirmed the close.
    CleanlyClosed,
    /// The peer never acknowledged our close request.
    TimedOut,
}

impl ShutdownState {
    fn rank(self) -> u8 {
        match self {
            ShutdownState::Active => 0,
            ShutdownState::LocalRequested => 1,
            ShutdownState::RemoteAckSent => 2,
            ShutdownState::CleanlyClosed | ShutdownState::TimedOut => 3,
        }
    }

    /// True for the states in which the session is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, ShutdownState::CleanlyClosed | ShutdownState::TimedOut)
    }
}

/// Everything needed to stand up a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub key: String,
    /// Initial terminal geometry, registered with the server at connect.
    pub cols: u16,
    pub rows: u16,
    pub predict: DisplayPreference,
    /// Window-title prefix, `None` when suppressed.
    pub title_prefix: Option<String>,
}

/// The session state machine. Owns the transport, the framebuffer pair and
/// the overlay engines; the driver owns the clock and the readiness wait.
pub struct SessionController<T: Transport> {
    transport: T,
    /// The frame most recently composed for display.
    displayed: Framebuffer,
    /// Reused buffer the next remote snapshot is composed into.
    scratch: Framebuffer,
    overlays: OverlayManager,
    interpreter: QuitEscapeInterpreter,
    shutdown_state: ShutdownState,
    connecting_notification: bool,
    repaint_requested: bool,
    port: u16,
}

impl<T: Transport> SessionController<T> {
    /// Connect the transport and build the controller around it.
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        let transport = T::connect(&config.host, config.port, &config.key)?;
        Ok(Self::new(transport, config))
    }

    /// Build the controller around an already-constructed transport.
    pub fn new(mut transport: T, config: &SessionConfig) -> Self {
        transport.push_resize(config.cols, config.rows);
        transport.set_send_delay(MIN_SEND_DELAY);

        let mut overlays = OverlayManager::new(config.predict);
        overlays.set_title_prefix(config.title_prefix.clone());

        Self {
            transport,
            displayed: Framebuffer::new(config.cols, config.rows),
            scratch: Framebuffer::new(1, 1),
            overlays,
            interpreter: QuitEscapeInterpreter::new(),
            shutdown_state: ShutdownState::Active,
            connecting_notification: false,
            repaint_requested: false,
            port: config.port,
        }
    }

    /// No remote snapshot has been received yet.
    pub fn still_connecting(&self) -> bool {
        self.transport.latest_remote_state().seq == 0
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown_state
    }

    /// Diagnostic view of the frame pair: (currently displayed, previous).
    pub fn frames(&self) -> (&Framebuffer, &Framebuffer) {
        (&self.displayed, &self.scratch)
    }

    /// Direct access to the transport, for the process boundary and tests.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the repaint request raised by a form-feed keystroke.
    pub fn take_repaint_request(&mut self) -> bool {
        mem::take(&mut self.repaint_requested)
    }

    fn advance_shutdown(&mut self, next: ShutdownState) {
        if next.rank() > self.shutdown_state.rank() {
            debug!(from = ?self.shutdown_state, to = ?next, "shutdown state advance");
            self.shutdown_state = next;
        }
    }

    /// How long the driver may block before something here needs the CPU.
    ///
    /// While connecting, clamped to 250 ms so the "connecting" notification
    /// refreshes promptly.
    pub fn compute_wait_deadline(&self) -> Duration {
        let wait = self.transport.wait_time().min(self.overlays.wait_time());
        if self.still_connecting() {
            wait.min(CONNECT_REFRESH)
        } else {
            wait
        }
    }

    /// Compose the latest remote snapshot plus overlays into the displayed
    /// frame, swapping the owned buffer pair rather than reallocating.
    ///
    /// Returns whether the newly composed frame differs from the one
    /// previously displayed.
    pub fn update_framebuffers(&mut self) -> bool {
        self.overlays
            .prediction_mut()
            .set_local_frame_sent(self.transport.sent_state_last());

        self.scratch
            .clone_from(&self.transport.latest_remote_state().frame);
        self.overlays.apply(&mut self.scratch);
        mem::swap(&mut self.displayed, &mut self.scratch);

        self.displayed != self.scratch
    }

    /// Drain inbound datagrams and propagate acknowledgment telemetry to
    /// the overlay engines. Call only after the transport signals readable.
    pub fn process_network_input(&mut self) -> Result<()> {
        self.transport.recv()?;

        let heard = self.transport.latest_remote_state().timestamp;
        let acked_at = self.transport.sent_state_acked_timestamp();
        self.overlays.notification_mut().server_heard(heard);
        self.overlays.notification_mut().server_acked(acked_at);

        let acked = self.transport.sent_state_acked();
        let echo_ack = self.transport.latest_remote_state().echo_ack;
        let interval = self.transport.send_interval();
        let prediction = self.overlays.prediction_mut();
        prediction.set_local_frame_acked(acked);
        prediction.set_local_frame_late_acked(echo_ack);
        prediction.set_send_interval(interval);
        Ok(())
    }

    /// Interpret a chunk of keyboard input. An empty chunk means the input
    /// stream has closed. Returns false when the loop should stop reading
    /// and begin (or skip) the close handshake.
    pub fn process_user_input(&mut self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }

        for &byte in bytes {
            let can_forward =
                self.transport.has_remote_addr() && !self.transport.shutdown_in_progress();

            if !self.transport.shutdown_in_progress() {
                self.overlays
                    .prediction_mut()
                    .new_user_byte(byte, &self.displayed);
            }

            let action = self.interpreter.interpret(byte);
            if action.resolves_escape()
                && self.overlays.notification().message() == Some(HELP_MESSAGE)
            {
                self.overlays.notification_mut().clear();
            }

            match action {
                KeyAction::Forward(b) => {
                    if b == REPAINT_CODE {
                        self.repaint_requested = true;
                    }
                    if can_forward {
                        self.transport.push_user_byte(b);
                    }
                }
                KeyAction::EnterEscape => {
                    self.overlays
                        .notification_mut()
                        .set_notification(HELP_MESSAGE, true, false);
                }
                KeyAction::LiteralEscape => {
                    if can_forward {
                        self.transport.push_user_byte(crate::escape::ESCAPE_CODE);
                    }
                }
                KeyAction::EscapedPair(b) => {
                    if can_forward {
                        self.transport.push_user_byte(crate::escape::ESCAPE_CODE);
                        self.transport.push_user_byte(b);
                    }
                }
                KeyAction::Quit => {
                    if can_forward {
                        self.start_shutdown(false);
                    } else {
                        // No peer, or a handshake already underway: nothing
                        // left to negotiate.
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Tell the server the terminal changed size.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.transport.push_resize(cols, rows);
    }

    /// Begin the close handshake. Returns true when there is no peer to
    /// negotiate with and the caller should terminate immediately.
    pub fn start_shutdown(&mut self, triggered_by_signal: bool) -> bool {
        if !self.transport.has_remote_addr() {
            return true;
        }

        let message = if triggered_by_signal {
            "Signal received, shutting down..."
        } else {
            "Exiting..."
        };
        self.overlays
            .notification_mut()
            .set_notification(message, true, true);

        if !self.transport.shutdown_in_progress() {
            info!(by_signal = triggered_by_signal, "starting shutdown handshake");
            self.transport.start_shutdown();
            self.advance_shutdown(ShutdownState::LocalRequested);
        }
        false
    }

    /// One housekeeping pass. Returns true when the session is over.
    pub fn tick(&mut self) -> Result<bool> {
        let now = Instant::now();

        if self.transport.shutdown_in_progress() {
            if self.transport.shutdown_acknowledged() {
                self.advance_shutdown(ShutdownState::CleanlyClosed);
                return Ok(true);
            }
            if self.transport.shutdown_ack_timed_out() {
                warn!("peer never acknowledged shutdown");
                self.advance_shutdown(ShutdownState::TimedOut);
                return Ok(true);
            }
        }

        if self.transport.counterparty_shutdown_ack_sent() {
            // The peer initiated the close and our acknowledgment is on the
            // wire; nothing further to wait for.
            self.advance_shutdown(ShutdownState::RemoteAckSent);
            self.advance_shutdown(ShutdownState::CleanlyClosed);
            return Ok(true);
        }

        if self.still_connecting() && !self.transport.shutdown_in_progress() {
            let silent_for = now.duration_since(self.transport.latest_remote_state().timestamp);
            if silent_for > CONNECT_TIMEOUT {
                warn!(?silent_for, "timed out waiting for server");
                self.overlays.notification_mut().set_notification(
                    "Timed out waiting for server...",
                    true,
                    true,
                );
                self.transport.start_shutdown();
                self.advance_shutdown(ShutdownState::LocalRequested);
            } else if silent_for > CONNECT_REFRESH {
                self.overlays.notification_mut().set_notification(
                    &format!("Nothing received from server on UDP port {}.", self.port),
                    false,
                    true,
                );
                self.connecting_notification = true;
            }
        } else if self.connecting_notification && !self.still_connecting() {
            let banner_shown = self
                .overlays
                .notification()
                .message()
                .is_some_and(|m| m.starts_with("Nothing received"));
            if banner_shown {
                self.overlays.notification_mut().clear();
            }
            self.connecting_notification = false;
        }

        self.transport.tick()?;

        if self.transport.shutdown_in_progress() {
            // Suppress send-failure noise during teardown.
            let _ = self.transport.pending_send_error();
            self.overlays.notification_mut().clear_network_error();
        } else if let Some(err) = self.transport.pending_send_error() {
            self.overlays.notification_mut().set_network_error(&err);
        } else {
            self.overlays.notification_mut().clear_network_error();
        }

        Ok(false)
    }

    /// Classify a fault raised by an iteration of the loop. Returns true
    /// when the loop may continue (after the driver's backoff), false when
    /// the fault must propagate and end the process.
    pub fn handle_fault(&mut self, error: &Error) -> bool {
        if !error.is_recoverable() {
            return false;
        }
        if !self.transport.shutdown_in_progress() {
            self.overlays
                .notification_mut()
                .set_notification(&error.to_string(), false, true);
        }
        true
    }

    /// Final cleanup before the terminal is handed back: drop overlays and
    /// compose one last plain frame.
    pub fn shutdown(&mut self) {
        let now = Instant::now();
        let notification = self.overlays.notification_mut();
        notification.clear();
        notification.clear_network_error();
        // Reset the staleness clocks so the final frame carries no countup.
        notification.server_heard(now);
        notification.server_acked(now);
        self.overlays.set_title_prefix(None);
        self.update_framebuffers();
    }

    /// Await inbound transport readiness.
    pub async fn transport_readable(&self) -> Result<()> {
        self.transport.readable().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use resh_core::transport::RemoteState;

    /// Scripted transport: every flag is a settable field.
    struct MockTransport {
        remote: RemoteState,
        sent: Vec<u8>,
        resizes: Vec<(u16, u16)>,
        acked: u64,
        acked_at: Instant,
        last_sent: u64,
        interval: Duration,
        has_addr: bool,
        shutdown: bool,
        shutdown_acked: bool,
        shutdown_timed_out: bool,
        counterparty_acked: bool,
        send_error: Option<String>,
        ticks: u32,
    }

    impl MockTransport {
        fn fresh() -> Self {
            Self {
                remote: RemoteState::initial(),
                sent: Vec::new(),
                resizes: Vec::new(),
                acked: 0,
                acked_at: Instant::now(),
                last_sent: 0,
                interval: Duration::from_millis(100),
                has_addr: true,
                shutdown: false,
                shutdown_acked: false,
                shutdown_timed_out: false,
                counterparty_acked: false,
                send_error: None,
                ticks: 0,
            }
        }

        fn deliver_snapshot(&mut self, frame: Framebuffer, seq: u64) {
            self.remote = RemoteState {
                frame,
                timestamp: Instant::now(),
                seq,
                echo_ack: 0,
            };
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn connect(_host: &str, _port: u16, _key: &str) -> Result<Self> {
            Ok(Self::fresh())
        }

        fn recv(&mut self) -> Result<()> {
            Ok(())
        }

        fn push_user_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }

        fn push_resize(&mut self, cols: u16, rows: u16) {
            self.resizes.push((cols, rows));
        }

        fn latest_remote_state(&self) -> &RemoteState {
            &self.remote
        }

        fn sent_state_acked(&self) -> u64 {
            self.acked
        }

        fn sent_state_acked_timestamp(&self) -> Instant {
            self.acked_at
        }

        fn sent_state_last(&self) -> u64 {
            self.last_sent
        }

        fn send_interval(&self) -> Duration {
            self.interval
        }

        fn has_remote_addr(&self) -> bool {
            self.has_addr
        }

        fn start_shutdown(&mut self) {
            self.shutdown = true;
        }

        fn shutdown_in_progress(&self) -> bool {
            self.shutdown
        }

        fn shutdown_acknowledged(&self) -> bool {
            self.shutdown_acked
        }

        fn shutdown_ack_timed_out(&self) -> bool {
            self.shutdown_timed_out
        }

        fn counterparty_shutdown_ack_sent(&self) -> bool {
            self.counterparty_acked
        }

        fn wait_time(&self) -> Duration {
            Duration::from_secs(1)
        }

        fn pending_send_error(&mut self) -> Option<String> {
            self.send_error.take()
        }

        fn tick(&mut self) -> Result<()> {
            self.ticks += 1;
            Ok(())
        }

        fn set_send_delay(&mut self, _delay: Duration) {}

        async fn readable(&self) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            host: "example.net".into(),
            port: 60001,
            key: String::new(),
            cols: 80,
            rows: 24,
            predict: DisplayPreference::Never,
            title_prefix: None,
        }
    }

    fn controller() -> SessionController<MockTransport> {
        SessionController::new(MockTransport::fresh(), &config())
    }

    #[test]
    fn construction_registers_geometry_with_transport() {
        let c = controller();
        assert_eq!(c.transport.resizes, vec![(80, 24)]);
        assert!(c.still_connecting());
        assert_eq!(c.shutdown_state(), ShutdownState::Active);
    }

    #[test]
    fn deadline_clamped_while_connecting() {
        let mut c = controller();
        assert!(c.compute_wait_deadline() <= CONNECT_REFRESH);

        let mut frame = Framebuffer::new(80, 24);
        frame.write_text(0, 0, "$", resh_core::terminal::Cell::new(' '));
        c.transport.deliver_snapshot(frame, 1);
        assert!(!c.still_connecting());
        assert!(c.compute_wait_deadline() > CONNECT_REFRESH);
    }

    #[test]
    fn update_swaps_buffers_without_reallocating() {
        let mut c = controller();
        let mut frame = Framebuffer::new(80, 24);
        frame.write_text(0, 0, "hello", resh_core::terminal::Cell::new(' '));
        c.transport.deliver_snapshot(frame, 1);

        assert!(c.update_framebuffers());
        assert_eq!(
            c.displayed.row(0)[..5].iter().map(|x| x.ch).collect::<String>(),
            "hello"
        );

        // Once both buffers carry the full geometry, further updates reuse
        // their storage: the snapshot lands in what was the scratch buffer,
        // and an identical compose reports no change.
        let scratch_cells = c.scratch.row(0).as_ptr();
        assert!(!c.update_framebuffers());
        assert_eq!(c.displayed.row(0).as_ptr(), scratch_cells);
    }

    #[test]
    fn plain_input_reaches_the_transport_in_order() {
        let mut c = controller();
        assert!(c.process_user_input(b"ls\r"));
        assert_eq!(c.transport.sent, b"ls\r");
    }

    #[test]
    fn empty_input_means_end_of_stream() {
        let mut c = controller();
        assert!(!c.process_user_input(b""));
    }

    #[test]
    fn repaint_byte_is_forwarded_and_flagged() {
        let mut c = controller();
        assert!(c.process_user_input(&[REPAINT_CODE]));
        assert_eq!(c.transport.sent, vec![REPAINT_CODE]);
        assert!(c.take_repaint_request());
        assert!(!c.take_repaint_request());
    }

    #[test]
    fn quit_gesture_starts_exactly_one_handshake() {
        let mut c = controller();
        assert!(c.process_user_input(&[crate::escape::ESCAPE_CODE, b'.']));
        assert!(c.transport.shutdown);
        assert_eq!(c.shutdown_state(), ShutdownState::LocalRequested);
        assert!(c.transport.sent.is_empty());
    }

    #[test]
    fn quit_gesture_without_peer_terminates_immediately() {
        let mut c = controller();
        c.transport.has_addr = false;
        assert!(!c.process_user_input(&[crate::escape::ESCAPE_CODE, b'.']));
        assert!(!c.transport.shutdown);
        assert!(c.transport.sent.is_empty());
    }

    #[test]
    fn quit_gesture_during_handshake_terminates_immediately() {
        let mut c = controller();
        c.start_shutdown(false);
        assert!(!c.process_user_input(&[crate::escape::ESCAPE_CODE, b'.']));
    }

    #[test]
    fn escape_caret_forwards_one_escape_byte() {
        let mut c = controller();
        assert!(c.process_user_input(&[crate::escape::ESCAPE_CODE, b'^']));
        assert_eq!(c.transport.sent, vec![crate::escape::ESCAPE_CODE]);
    }

    #[test]
    fn escape_then_other_forwards_both_bytes() {
        let mut c = controller();
        assert!(c.process_user_input(&[crate::escape::ESCAPE_CODE, b'x']));
        assert_eq!(c.transport.sent, vec![crate::escape::ESCAPE_CODE, b'x']);
    }

    #[test]
    fn help_message_shows_and_clears() {
        let mut c = controller();
        c.process_user_input(&[crate::escape::ESCAPE_CODE]);
        assert_eq!(c.overlays.notification().message(), Some(HELP_MESSAGE));
        c.process_user_input(b"x");
        assert_eq!(c.overlays.notification().message(), None);
    }

    #[test]
    fn input_dropped_while_shutting_down() {
        let mut c = controller();
        c.start_shutdown(false);
        assert!(c.process_user_input(b"abc"));
        assert!(c.transport.sent.is_empty());
    }

    #[test]
    fn shutdown_ack_closes_cleanly() {
        let mut c = controller();
        c.start_shutdown(false);
        c.transport.shutdown_acked = true;
        assert!(c.tick().unwrap());
        assert_eq!(c.shutdown_state(), ShutdownState::CleanlyClosed);
    }

    #[test]
    fn shutdown_ack_timeout_is_unclean() {
        let mut c = controller();
        c.start_shutdown(false);
        c.transport.shutdown_timed_out = true;
        assert!(c.tick().unwrap());
        assert_eq!(c.shutdown_state(), ShutdownState::TimedOut);
    }

    #[test]
    fn remote_initiated_close_ends_cleanly() {
        let mut c = controller();
        c.transport.shutdown = true;
        c.transport.counterparty_acked = true;
        assert!(c.tick().unwrap());
        assert_eq!(c.shutdown_state(), ShutdownState::CleanlyClosed);
    }

    #[test]
    fn shutdown_state_is_monotonic() {
        let mut c = controller();
        c.start_shutdown(false);
        c.transport.shutdown_acked = true;
        assert!(c.tick().unwrap());
        assert_eq!(c.shutdown_state(), ShutdownState::CleanlyClosed);

        // Later flags can no longer regress the state.
        c.transport.shutdown_acked = false;
        c.transport.shutdown_timed_out = true;
        assert!(c.tick().unwrap());
        assert_eq!(c.shutdown_state(), ShutdownState::CleanlyClosed);
    }

    #[test]
    fn connect_timeout_forces_shutdown() {
        let mut c = controller();
        c.transport.remote.timestamp = Instant::now() - CONNECT_TIMEOUT - Duration::from_secs(1);
        assert!(!c.tick().unwrap());
        assert!(c.transport.shutdown);
        assert_eq!(c.shutdown_state(), ShutdownState::LocalRequested);
    }

    #[test]
    fn connecting_notification_appears_then_clears() {
        let mut c = controller();
        c.transport.remote.timestamp = Instant::now() - Duration::from_millis(500);
        c.tick().unwrap();
        assert!(c
            .overlays
            .notification()
            .message()
            .is_some_and(|m| m.contains("UDP port 60001")));

        c.transport
            .deliver_snapshot(Framebuffer::new(80, 24), 1);
        c.tick().unwrap();
        assert_eq!(c.overlays.notification().message(), None);
    }

    #[test]
    fn send_errors_surface_only_outside_shutdown() {
        let mut c = controller();
        c.transport.send_error = Some("sendto: unreachable".into());
        c.tick().unwrap();
        let mut fb = Framebuffer::new(80, 24);
        c.overlays.apply(&mut fb);
        let row: String = fb.row(0).iter().map(|x| x.ch).collect();
        assert!(row.contains("sendto: unreachable"));

        c.start_shutdown(false);
        c.transport.send_error = Some("sendto: unreachable".into());
        c.tick().unwrap();
        assert!(c.transport.send_error.is_none());
    }

    #[test]
    fn recoverable_faults_continue_fatal_ones_do_not() {
        let mut c = controller();
        assert!(c.handle_fault(&Error::transport("recv failed")));
        assert!(c.handle_fault(&Error::Crypto {
            message: "bad packet".into(),
            fatal: false,
        }));
        assert!(!c.handle_fault(&Error::Crypto {
            message: "nonce space exhausted".into(),
            fatal: true,
        }));
    }

    #[test]
    fn fault_notification_suppressed_during_shutdown() {
        let mut c = controller();
        c.start_shutdown(false);
        let before = c.overlays.notification().message().map(str::to_owned);
        assert!(c.handle_fault(&Error::transport("recv failed")));
        assert_eq!(c.overlays.notification().message().map(str::to_owned), before);
    }

    #[test]
    fn signal_shutdown_sets_its_own_message() {
        let mut c = controller();
        assert!(!c.start_shutdown(true));
        assert_eq!(
            c.overlays.notification().message(),
            Some("Signal received, shutting down...")
        );
    }

    #[test]
    fn shutdown_cleanup_silences_staleness_countup() {
        let mut c = controller();
        c.transport.deliver_snapshot(Framebuffer::new(80, 24), 1);
        c.overlays
            .notification_mut()
            .server_heard(Instant::now() - Duration::from_secs(20));
        c.shutdown();
        let row: String = c.displayed.row(0).iter().map(|x| x.ch).collect();
        assert!(row.trim().is_empty());
    }

    #[test]
    fn shutdown_cleanup_drops_overlays() {
        let mut c = controller();
        c.overlays.set_title_prefix(Some("[resh] ".into()));
        c.overlays.notification_mut().set_notification("Exiting...", true, true);
        c.shutdown();
        assert_eq!(c.overlays.notification().message(), None);
        assert!(c.displayed.title.is_none());
    }
}
