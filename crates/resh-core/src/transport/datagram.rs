//! Default UDP datagram transport.
//!
//! Carries the session as sealed datagrams: the server streams complete
//! framebuffer snapshots down, the client streams its unacknowledged input
//! up, and either side may piggyback a shutdown request on its frames.
//! Frames are idempotent: each input frame carries the whole unacknowledged
//! target state, so lost or reordered datagrams need no repair beyond
//! retransmission.
//!
//! The wire format is private to this module.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::terminal::Framebuffer;
use crate::transport::{RemoteState, Transport};

/// Pacing floor/ceiling for outbound input frames.
const SEND_INTERVAL_MIN: Duration = Duration::from_millis(20);
const SEND_INTERVAL_MAX: Duration = Duration::from_millis(250);

/// Resend unacknowledged input after this long without an ack.
const RETRANSMIT_INTERVAL: Duration = Duration::from_millis(500);

/// Give up on the shutdown handshake after this long.
const SHUTDOWN_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timer granularity when the transport is idle.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Nonce direction tags. Each side seals with its own tag so the two
/// counters can never collide.
const DIR_CLIENT: u8 = 0x01;
const DIR_SERVER: u8 = 0x02;

#[derive(Debug, Serialize, Deserialize)]
enum Payload {
    /// Server to client: a complete screen snapshot.
    Snapshot {
        seq: u64,
        ack: u64,
        echo_ack: u64,
        shutdown: bool,
        shutdown_ack: bool,
        frame: Framebuffer,
    },
    /// Client to server: the whole unacknowledged target state.
    Input {
        seq: u64,
        ack: u64,
        bytes: Vec<u8>,
        resize: Option<(u16, u16)>,
        shutdown: bool,
        shutdown_ack: bool,
    },
}

pub struct DatagramTransport {
    socket: tokio::net::UdpSocket,
    cipher: ChaCha20Poly1305,
    send_nonce: u64,
    /// Highest inbound nonce counter accepted so far; `None` before the
    /// first authenticated datagram.
    recv_nonce_seen: Option<u64>,

    remote: RemoteState,

    /// Unacknowledged outbound user bytes.
    pending_input: BytesMut,
    pending_resize: Option<(u16, u16)>,
    dirty: bool,

    out_seq: u64,
    acked_seq: u64,
    acked_at: Instant,
    last_send: Instant,
    input_sent_at: Instant,
    srtt: Duration,
    send_delay: Duration,

    local_shutdown: Option<Instant>,
    peer_acked_shutdown: bool,
    remote_shutdown_seen: bool,
    sent_remote_ack: bool,

    send_error: Option<String>,
}

impl DatagramTransport {
    fn decode_key(key: &str) -> Result<[u8; 32]> {
        use base64::Engine;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(key.trim())
            .map_err(|_| Error::Config {
                message: "session key is not valid base64".into(),
            })?;
        raw.as_slice().try_into().map_err(|_| Error::Config {
            message: format!("session key must be 32 bytes, got {}", raw.len()),
        })
    }

    fn nonce(dir: u8, counter: u64) -> Nonce {
        let mut n = [0u8; 12];
        n[0] = dir;
        n[4..].copy_from_slice(&counter.to_le_bytes());
        Nonce::from(n)
    }

    fn seal(&mut self, payload: &Payload) -> Result<Vec<u8>> {
        if self.send_nonce == u64::MAX {
            return Err(Error::Crypto {
                message: "outgoing nonce space exhausted".into(),
                fatal: true,
            });
        }
        let counter = self.send_nonce;
        self.send_nonce += 1;

        let plain = bincode::serialize(payload).map_err(|e| Error::transport(e.to_string()))?;
        let sealed = self
            .cipher
            .encrypt(&Self::nonce(DIR_CLIENT, counter), plain.as_slice())
            .map_err(|_| Error::Crypto {
                message: "seal failed".into(),
                fatal: true,
            })?;

        let mut datagram = Vec::with_capacity(8 + sealed.len());
        datagram.extend_from_slice(&counter.to_le_bytes());
        datagram.extend_from_slice(&sealed);
        Ok(datagram)
    }

    fn open(&mut self, datagram: &[u8]) -> Result<Payload> {
        if datagram.len() < 8 {
            return Err(Error::Crypto {
                message: "short datagram".into(),
                fatal: false,
            });
        }
        let counter = u64::from_le_bytes(datagram[..8].try_into().unwrap());
        if self.recv_nonce_seen.is_some_and(|seen| counter <= seen) {
            // Replayed or reordered behind the newest packet; stale state is
            // worthless in a snapshot protocol.
            return Err(Error::Crypto {
                message: "stale datagram".into(),
                fatal: false,
            });
        }
        let plain = self
            .cipher
            .decrypt(&Self::nonce(DIR_SERVER, counter), &datagram[8..])
            .map_err(|_| Error::Crypto {
                message: "packet failed authentication".into(),
                fatal: false,
            })?;
        self.recv_nonce_seen = Some(counter);
        bincode::deserialize(&plain).map_err(|e| Error::transport(e.to_string()))
    }

    /// Fold one authenticated payload into local state.
    fn absorb(&mut self, payload: Payload) {
        let Payload::Snapshot {
            seq,
            ack,
            echo_ack,
            shutdown,
            shutdown_ack,
            frame,
        } = payload
        else {
            // An Input frame can only reach us through misdelivery; drop it.
            return;
        };

        let now = Instant::now();
        self.remote.timestamp = now;

        if seq >= self.remote.seq {
            self.remote.seq = seq;
            self.remote.echo_ack = echo_ack;
            self.remote.frame = frame;
        }

        if ack > self.acked_seq {
            self.acked_seq = ack;
            self.acked_at = now;
            if ack >= self.out_seq {
                // Everything we queued has landed.
                self.pending_input.clear();
                self.pending_resize = None;
                let sample = now.saturating_duration_since(self.input_sent_at);
                self.srtt = (self.srtt * 7 + sample) / 8;
            }
        }

        if shutdown {
            self.remote_shutdown_seen = true;
            self.dirty = true;
        }
        if shutdown_ack && self.local_shutdown.is_some() {
            self.peer_acked_shutdown = true;
        }
    }

    fn build_input(&mut self) -> Payload {
        if self.dirty {
            self.out_seq += 1;
            self.dirty = false;
        }
        Payload::Input {
            seq: self.out_seq,
            ack: self.remote.seq,
            bytes: self.pending_input.to_vec(),
            resize: self.pending_resize,
            shutdown: self.local_shutdown.is_some(),
            shutdown_ack: self.remote_shutdown_seen,
        }
    }

    fn send_now(&mut self) -> Result<()> {
        let payload = self.build_input();
        let datagram = self.seal(&payload)?;
        let now = Instant::now();
        match self.socket.try_send(&datagram) {
            Ok(_) => {
                self.last_send = now;
                self.input_sent_at = now;
                self.send_error = None;
                if self.remote_shutdown_seen {
                    self.sent_remote_ack = true;
                }
                trace!(seq = self.out_seq, len = datagram.len(), "sent input frame");
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // Socket buffer full; the retransmit timer will retry.
            }
            Err(e) => {
                debug!(error = %e, "datagram send failed");
                self.send_error = Some(e.to_string());
            }
        }
        Ok(())
    }

    fn has_unacked(&self) -> bool {
        !self.pending_input.is_empty()
            || self.pending_resize.is_some()
            || (self.local_shutdown.is_some() && !self.peer_acked_shutdown)
            || (self.remote_shutdown_seen && !self.sent_remote_ack)
    }
}

#[async_trait]
impl Transport for DatagramTransport {
    fn connect(host: &str, port: u16, key: &str) -> Result<Self> {
        let key = Self::decode_key(key)?;

        let std_socket = std::net::UdpSocket::bind(("0.0.0.0", 0))?;
        std_socket.connect((host, port))?;
        std_socket.set_nonblocking(true)?;
        let socket = tokio::net::UdpSocket::from_std(std_socket)?;
        debug!(host, port, "datagram transport bound");

        let now = Instant::now();
        Ok(Self {
            socket,
            cipher: ChaCha20Poly1305::new(&key.into()),
            send_nonce: 0,
            recv_nonce_seen: None,
            remote: RemoteState::initial(),
            pending_input: BytesMut::new(),
            pending_resize: None,
            dirty: false,
            out_seq: 0,
            acked_seq: 0,
            acked_at: now,
            last_send: now,
            input_sent_at: now,
            srtt: Duration::from_millis(100),
            send_delay: SEND_INTERVAL_MIN,
            local_shutdown: None,
            peer_acked_shutdown: false,
            remote_shutdown_seen: false,
            sent_remote_ack: false,
            send_error: None,
        })
    }

    fn recv(&mut self) -> Result<()> {
        let mut buf = [0u8; 65536];
        loop {
            match self.socket.try_recv(&mut buf) {
                Ok(n) => {
                    let payload = self.open(&buf[..n])?;
                    self.absorb(payload);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(Error::transport(format!("recv: {e}"))),
            }
        }
    }

    fn push_user_byte(&mut self, byte: u8) {
        self.pending_input.extend_from_slice(&[byte]);
        self.dirty = true;
    }

    fn push_resize(&mut self, cols: u16, rows: u16) {
        self.pending_resize = Some((cols, rows));
        self.dirty = true;
    }

    fn latest_remote_state(&self) -> &RemoteState {
        &self.remote
    }

    fn sent_state_acked(&self) -> u64 {
        self.acked_seq
    }

    fn sent_state_acked_timestamp(&self) -> Instant {
        self.acked_at
    }

    fn sent_state_last(&self) -> u64 {
        self.out_seq
    }

    fn send_interval(&self) -> Duration {
        (self.srtt / 2).clamp(SEND_INTERVAL_MIN, SEND_INTERVAL_MAX)
    }

    fn has_remote_addr(&self) -> bool {
        true
    }

    fn start_shutdown(&mut self) {
        if self.local_shutdown.is_none() {
            self.local_shutdown = Some(Instant::now());
            self.dirty = true;
        }
    }

    fn shutdown_in_progress(&self) -> bool {
        self.local_shutdown.is_some()
    }

    fn shutdown_acknowledged(&self) -> bool {
        self.peer_acked_shutdown
    }

    fn shutdown_ack_timed_out(&self) -> bool {
        self.local_shutdown
            .is_some_and(|at| at.elapsed() > SHUTDOWN_ACK_TIMEOUT)
    }

    fn counterparty_shutdown_ack_sent(&self) -> bool {
        self.remote_shutdown_seen && self.sent_remote_ack
    }

    fn wait_time(&self) -> Duration {
        if self.dirty {
            let since = self.last_send.elapsed();
            return self.send_delay.saturating_sub(since).max(Duration::from_millis(1));
        }
        if self.has_unacked() {
            let since = self.input_sent_at.elapsed();
            return RETRANSMIT_INTERVAL
                .saturating_sub(since)
                .max(Duration::from_millis(1));
        }
        IDLE_WAIT
    }

    fn pending_send_error(&mut self) -> Option<String> {
        self.send_error.take()
    }

    fn tick(&mut self) -> Result<()> {
        let since_send = self.last_send.elapsed();
        if self.dirty && since_send >= self.send_delay {
            return self.send_now();
        }
        if self.has_unacked() && since_send >= RETRANSMIT_INTERVAL {
            return self.send_now();
        }
        Ok(())
    }

    fn set_send_delay(&mut self, delay: Duration) {
        self.send_delay = delay;
    }

    async fn readable(&self) -> Result<()> {
        self.socket
            .readable()
            .await
            .map_err(|e| Error::transport(format!("poll: {e}")))
    }
}
