//! Transport abstraction.
//!
//! The session controller drives a `Transport` without knowing anything
//! about datagram framing, sequence numbers or retransmission; those live
//! behind this trait. The default implementation is the UDP
//! [`DatagramTransport`]; tests substitute a scripted mock.

mod datagram;

pub use datagram::DatagramTransport;

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;
use crate::terminal::Framebuffer;

/// The latest complete framebuffer received from the remote peer.
#[derive(Debug, Clone)]
pub struct RemoteState {
    /// Snapshot of the remote screen.
    pub frame: Framebuffer,
    /// When it was received. Starts at transport construction time so the
    /// "nothing heard yet" clock runs from connect.
    pub timestamp: Instant,
    /// Remote state sequence number; 0 until the first snapshot arrives.
    pub seq: u64,
    /// Highest local input sequence number the remote has echoed back into
    /// its state. Drives late-ack culling in the prediction engine.
    pub echo_ack: u64,
}

impl RemoteState {
    pub fn initial() -> Self {
        Self {
            frame: Framebuffer::new(1, 1),
            timestamp: Instant::now(),
            seq: 0,
            echo_ack: 0,
        }
    }
}

/// Client side of an unreliable, authenticated, resynchronizing channel.
///
/// All methods are non-blocking; the only way to wait on a transport is to
/// await [`Transport::readable`] from the event-loop driver.
#[async_trait]
pub trait Transport {
    /// Construct a transport bound to the given peer.
    fn connect(host: &str, port: u16, key: &str) -> Result<Self>
    where
        Self: Sized;

    /// Drain every datagram currently queued on the socket and fold it into
    /// the remote state. Call only after `readable` has fired.
    fn recv(&mut self) -> Result<()>;

    /// Append a user keystroke to the outbound state.
    fn push_user_byte(&mut self, byte: u8);

    /// Append a terminal resize instruction to the outbound state.
    fn push_resize(&mut self, cols: u16, rows: u16);

    fn latest_remote_state(&self) -> &RemoteState;

    /// Sequence number of the last outbound state the peer acknowledged.
    fn sent_state_acked(&self) -> u64;

    /// When that acknowledgment arrived.
    fn sent_state_acked_timestamp(&self) -> Instant;

    /// Sequence number of the last outbound state handed to the wire.
    fn sent_state_last(&self) -> u64;

    /// Current pacing interval between outbound sends.
    fn send_interval(&self) -> Duration;

    fn has_remote_addr(&self) -> bool;

    /// Begin the two-sided shutdown handshake. Idempotent.
    fn start_shutdown(&mut self);

    fn shutdown_in_progress(&self) -> bool;

    /// Peer acknowledged our shutdown request.
    fn shutdown_acknowledged(&self) -> bool;

    /// Our shutdown request has gone unacknowledged past the deadline.
    fn shutdown_ack_timed_out(&self) -> bool;

    /// We have seen the peer's shutdown request and sent our acknowledgment.
    fn counterparty_shutdown_ack_sent(&self) -> bool;

    /// How long the controller may sleep before this transport needs to run
    /// its timers again.
    fn wait_time(&self) -> Duration;

    /// Last non-fatal send failure, if any. Cleared by reading.
    fn pending_send_error(&mut self) -> Option<String>;

    /// Drive retransmission and pacing timers; may send.
    fn tick(&mut self) -> Result<()>;

    /// Lower bound on the delay between outbound sends.
    fn set_send_delay(&mut self, delay: Duration);

    /// Resolves when inbound data is waiting on the socket.
    async fn readable(&self) -> Result<()>;
}
