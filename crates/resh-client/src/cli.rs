//! Command-line interface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use resh_core::logging::LogFormat;

/// Remote terminal client with predictive local echo.
#[derive(Parser, Debug)]
#[command(name = "resh", version, about)]
pub struct Cli {
    /// Server host name or address.
    pub host: String,

    /// Server UDP port.
    pub port: u16,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug, -vvvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to a file instead of stderr. Required for readable logs
    /// during a live session, since the terminal is in raw mode.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Prediction mode, overriding MOSH_PREDICTION_DISPLAY.
    #[arg(long, value_name = "MODE")]
    pub predict: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let cli = Cli::parse_from(["resh", "example.net", "60001"]);
        assert_eq!(cli.host, "example.net");
        assert_eq!(cli.port, 60001);
        assert_eq!(cli.verbose, 0);
        assert!(cli.predict.is_none());
    }

    #[test]
    fn counts_verbosity() {
        let cli = Cli::parse_from(["resh", "-vvv", "h", "1"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn rejects_missing_port() {
        assert!(Cli::try_parse_from(["resh", "example.net"]).is_err());
    }

    #[test]
    fn accepts_predict_override() {
        let cli = Cli::parse_from(["resh", "--predict", "always", "h", "1"]);
        assert_eq!(cli.predict.as_deref(), Some("always"));
    }

    #[test]
    fn log_format_maps_to_core_type() {
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(LogFormatArg::Text), LogFormat::Text);
    }
}
