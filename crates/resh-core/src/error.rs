//! Error types for resh.

use thiserror::Error;

/// Main error type for resh operations.
///
/// The session controller classifies faults by matching on this enum
/// exhaustively; adding a variant forces every fault boundary to decide
/// how to treat it.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network send/receive failure against the remote peer.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Failure in the datagram sealing layer.
    ///
    /// `fatal` distinguishes a single corrupt packet (ignorable) from a
    /// condition that indicates compromise or key exhaustion.
    #[error("crypto error: {message}")]
    Crypto { message: String, fatal: bool },

    /// Invalid configuration or environment.
    #[error("config error: {message}")]
    Config { message: String },
}

impl Error {
    /// Shorthand for a transport fault.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
        }
    }

    /// Returns true if the session loop may continue after this error.
    ///
    /// Transport faults are always recoverable; crypto faults only when the
    /// sealing layer marked them non-fatal. Everything else must propagate
    /// to the process boundary.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::Crypto { fatal, .. } => !fatal,
            Error::Io(_) | Error::Config { .. } => false,
        }
    }
}

/// Convenience result type for resh operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let err = Error::transport("send failed");
        assert_eq!(err.to_string(), "transport error: send failed");
    }

    #[test]
    fn error_display_crypto() {
        let err = Error::Crypto {
            message: "bad tag".into(),
            fatal: false,
        };
        assert_eq!(err.to_string(), "crypto error: bad tag");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn transport_faults_are_recoverable() {
        assert!(Error::transport("lost").is_recoverable());
    }

    #[test]
    fn crypto_recoverability_follows_fatal_flag() {
        assert!(Error::Crypto {
            message: "corrupt packet".into(),
            fatal: false,
        }
        .is_recoverable());
        assert!(!Error::Crypto {
            message: "nonce exhausted".into(),
            fatal: true,
        }
        .is_recoverable());
    }

    #[test]
    fn other_faults_propagate() {
        assert!(!Error::Io(std::io::Error::other("boom")).is_recoverable());
        assert!(!Error::Config {
            message: "bad key".into(),
        }
        .is_recoverable());
    }
}
