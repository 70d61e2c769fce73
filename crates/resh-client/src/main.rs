//! resh client binary.

use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use resh_client::cli::Cli;
use resh_client::controller::{SessionConfig, SessionController, ShutdownState};
use resh_client::driver::{self, SessionSignals};
use resh_client::prediction::DisplayPreference;
use resh_client::render::AnsiDisplay;
use resh_client::terminal::{get_terminal_size, RawModeGuard, StdinReader};
use resh_core::logging::init_logging;
use resh_core::transport::DatagramTransport;
use resh_core::Result;

/// The session key arrives in the environment from the bootstrap script;
/// scrub it immediately so child processes and /proc never see it.
fn take_session_key() -> Option<String> {
    let key = env::var("MOSH_KEY").ok()?;
    env::remove_var("MOSH_KEY");
    Some(key)
}

fn resolve_prediction(cli: &Cli) -> std::result::Result<DisplayPreference, String> {
    let requested = cli
        .predict
        .clone()
        .or_else(|| env::var("MOSH_PREDICTION_DISPLAY").ok());
    match requested {
        None => Ok(DisplayPreference::default()),
        Some(s) => DisplayPreference::parse(&s).ok_or(s),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref(), cli.log_format.into()) {
        eprintln!("resh: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let Some(key) = take_session_key() else {
        eprintln!("resh: MOSH_KEY environment variable not set.");
        return ExitCode::FAILURE;
    };

    let predict = match resolve_prediction(&cli) {
        Ok(p) => p,
        Err(bad) => {
            eprintln!("resh: unknown prediction mode \"{bad}\" (expected always, never, adaptive or experimental).");
            return ExitCode::FAILURE;
        }
    };

    let title_prefix = if env::var_os("MOSH_TITLE_NOPREFIX").is_some() {
        None
    } else {
        Some("[resh] ".to_string())
    };

    let (cols, rows) = match get_terminal_size() {
        Ok(size) => size,
        Err(e) => {
            eprintln!("resh: cannot determine terminal size: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = SessionConfig {
        host: cli.host.clone(),
        port: cli.port,
        key,
        cols,
        rows,
        predict,
        title_prefix,
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("resh: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(host = %config.host, port = config.port, "connecting");
    let outcome = rt.block_on(run_session(config));

    match outcome {
        Ok((state, never_connected)) => {
            println!("\r\n[resh is exiting.]");
            if never_connected {
                eprintln!(
                    "resh: did not make a successful connection to the server.\r\n\
                     resh: please verify that UDP port {} can reach the server, and is not firewalled.",
                    cli.port
                );
            } else if state != ShutdownState::CleanlyClosed {
                eprintln!(
                    "resh: did not shut down cleanly. The server process may still be running on the remote host."
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "session failed");
            eprintln!("resh: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the session under the raw-mode guard. Returns the terminal shutdown
/// state and whether a connection was ever established.
async fn run_session(config: SessionConfig) -> Result<(ShutdownState, bool)> {
    let mut controller = SessionController::<DatagramTransport>::connect(&config)?;
    let mut display = AnsiDisplay::stdout();
    let mut stdin = StdinReader::new();
    let mut signals = SessionSignals::new()?;

    let raw_mode = RawModeGuard::enter()?;
    let result = driver::run(&mut controller, &mut display, &mut stdin, &mut signals).await;
    drop(raw_mode);

    let never_connected = controller.still_connecting();
    result.map(|state| (state, never_connected))
}
