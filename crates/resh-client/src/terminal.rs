//! Raw-mode terminal glue.
//!
//! Raw mode setup/restore, size detection and a non-blocking stdin reader.

use std::io::{self, Read};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use resh_core::{Error, Result};

/// Original terminal settings to restore on exit.
static ORIGINAL_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Guard that restores terminal settings on drop.
pub struct RawModeGuard {
    fd: RawFd,
}

impl RawModeGuard {
    /// Enter raw terminal mode.
    pub fn enter() -> Result<Self> {
        let fd = io::stdin().as_raw_fd();

        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        let original = unsafe { termios.assume_init() };

        if let Ok(mut guard) = ORIGINAL_TERMIOS.lock() {
            *guard = Some(original);
        }

        let mut raw = original;
        // No break signal, CR->NL mapping, parity, bit stripping or flow
        // control on input; no output processing; 8-bit characters; no echo,
        // canonical mode, signal keys or extended input.
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);
        debug!("entered raw terminal mode");
        Ok(Self { fd })
    }

    pub fn is_active() -> bool {
        RAW_MODE_ACTIVE.load(Ordering::SeqCst)
    }

    fn restore(&self) {
        if let Ok(mut guard) = ORIGINAL_TERMIOS.lock() {
            if let Some(original) = guard.take() {
                if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &original) } != 0 {
                    warn!("failed to restore terminal settings");
                } else {
                    debug!("restored terminal settings");
                }
            }
        }
        RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Current terminal size as (cols, rows). Falls back to 80x24 when stdout
/// is not a terminal.
pub fn get_terminal_size() -> Result<(u16, u16)> {
    let fd = io::stdout().as_raw_fd();

    let mut winsize = std::mem::MaybeUninit::<libc::winsize>::uninit();
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, winsize.as_mut_ptr()) } != 0 {
        return Ok((80, 24));
    }
    let winsize = unsafe { winsize.assume_init() };
    if winsize.ws_col == 0 || winsize.ws_row == 0 {
        return Ok((80, 24));
    }
    Ok((winsize.ws_col, winsize.ws_row))
}

/// Non-blocking stdin source.
///
/// A dedicated thread performs the blocking reads and forwards chunks over
/// an unbounded channel, so the event loop never stalls on the keyboard.
pub struct StdinReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl StdinReader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let stdin = io::stdin();
            let mut stdin_lock = stdin.lock();
            let mut buf = [0u8; 4096];

            loop {
                match stdin_lock.read(&mut buf) {
                    Ok(0) => {
                        debug!("stdin EOF");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(error = %e, "stdin read error");
                        break;
                    }
                }
            }
        });

        Self { rx }
    }

    /// Next chunk of keyboard input; `None` once the stream has closed.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_size_has_sane_fallback() {
        let (cols, rows) = get_terminal_size().unwrap();
        assert!(cols > 0);
        assert!(rows > 0);
    }

    #[test]
    fn raw_mode_starts_inactive() {
        assert!(!RawModeGuard::is_active());
    }
}
