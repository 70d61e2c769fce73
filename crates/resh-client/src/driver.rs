//! Event-loop driver.
//!
//! Owns the readiness wait and signal delivery; everything stateful lives
//! in the [`SessionController`]. One iteration: compose and render the
//! frame, block until the transport, the keyboard, a signal or the
//! controller's deadline fires, dispatch, then run the housekeeping tick.
//! Network input is dispatched ahead of keyboard input so acknowledgment
//! telemetry is visible to predictions made in the same iteration.

use std::time::Duration;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::sleep;
use tracing::{debug, warn};

use resh_core::terminal::Display;
use resh_core::transport::Transport;
use resh_core::Result;

use crate::controller::{SessionController, ShutdownState};
use crate::terminal::{get_terminal_size, StdinReader};

/// Pause after a recoverable fault so a persistently failing network does
/// not spin the loop hot.
const FAULT_BACKOFF: Duration = Duration::from_millis(200);

/// The Unix signals the session reacts to.
pub struct SessionSignals {
    term: Signal,
    int: Signal,
    hup: Signal,
    pipe: Signal,
    winch: Signal,
}

impl SessionSignals {
    pub fn new() -> Result<Self> {
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
            hup: signal(SignalKind::hangup())?,
            pipe: signal(SignalKind::pipe())?,
            winch: signal(SignalKind::window_change())?,
        })
    }
}

enum Event {
    NetworkReady,
    Input(Option<Vec<u8>>),
    Interrupted,
    Resized,
    DeadlinePassed,
}

/// Run the session to completion. Returns the terminal shutdown state;
/// unrecoverable faults propagate.
pub async fn run<T: Transport, D: Display>(
    controller: &mut SessionController<T>,
    display: &mut D,
    stdin: &mut StdinReader,
    signals: &mut SessionSignals,
) -> Result<ShutdownState> {
    loop {
        match run_iteration(controller, display, stdin, signals).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => {
                if controller.handle_fault(&e) {
                    warn!(error = %e, "recoverable session fault");
                    sleep(FAULT_BACKOFF).await;
                } else {
                    return Err(e);
                }
            }
        }
    }

    debug!(state = ?controller.shutdown_state(), "session over");
    controller.shutdown();
    display.render(controller.frames().0)?;
    Ok(controller.shutdown_state())
}

/// One loop iteration. Returns true when the session is over.
async fn run_iteration<T: Transport, D: Display>(
    controller: &mut SessionController<T>,
    display: &mut D,
    stdin: &mut StdinReader,
    signals: &mut SessionSignals,
) -> Result<bool> {
    let repaint = controller.take_repaint_request();
    if repaint {
        display.invalidate();
    }
    if controller.update_framebuffers() || repaint {
        display.render(controller.frames().0)?;
    }

    let deadline = controller.compute_wait_deadline();
    let event = tokio::select! {
        biased;
        res = controller.transport_readable() => {
            res?;
            Event::NetworkReady
        }
        chunk = stdin.recv() => Event::Input(chunk),
        _ = signals.term.recv() => Event::Interrupted,
        _ = signals.int.recv() => Event::Interrupted,
        _ = signals.hup.recv() => Event::Interrupted,
        _ = signals.pipe.recv() => Event::Interrupted,
        _ = signals.winch.recv() => Event::Resized,
        _ = sleep(deadline) => Event::DeadlinePassed,
    };

    match event {
        Event::NetworkReady => controller.process_network_input()?,
        Event::Input(Some(bytes)) => {
            if !controller.process_user_input(&bytes) {
                return Ok(true);
            }
        }
        Event::Input(None) => {
            // Keyboard stream closed: negotiate a close if we can.
            if controller.start_shutdown(false) {
                return Ok(true);
            }
        }
        Event::Interrupted => {
            if controller.start_shutdown(true) {
                return Ok(true);
            }
        }
        Event::Resized => {
            if let Ok((cols, rows)) = get_terminal_size() {
                debug!(cols, rows, "terminal resized");
                controller.resize(cols, rows);
                display.invalidate();
            }
        }
        Event::DeadlinePassed => {}
    }

    controller.tick()
}
