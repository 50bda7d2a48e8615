//! Command-line parsing and validated configuration.
//!
//! Exactly four positional parameters, in order: host, channel, PID, UDP
//! port. Any validation failure is a configuration error: fatal, exit
//! non-zero, before any socket is opened.

use clap::Parser;

use crate::error::Error;

/// Minimum valid Teletext/elementary-stream PID.
pub const MIN_PID: u32 = 1;
/// Maximum valid 13-bit PID value minus the all-ones reserved PID.
pub const MAX_PID: u32 = 8190;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Acquire one DVB Teletext channel from a networked tuner and emit pages as UDP/JSON"
)]
struct Opt {
    /// Tuner host, used to build http://{host}/auto/v{channel}
    host: String,

    /// Channel number (decimal)
    channel: u32,

    /// Target elementary-stream PID carrying Teletext (1..8190)
    pid: u32,

    /// UDP port on 127.0.0.1 to emit page datagrams to (1..65535)
    port: u16,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Seconds to wait between reconnect attempts
    #[arg(long = "reconnect-delay", default_value_t = DEFAULT_RECONNECT_DELAY_SECS)]
    reconnect_delay: u64,
}

/// Fully validated, immutable startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tuner host (DNS name or address), no scheme/port.
    pub host: String,
    /// Channel number, used verbatim in the request path.
    pub channel: u32,
    /// Target elementary-stream PID.
    pub pid: u16,
    /// Destination UDP port on 127.0.0.1.
    pub port: u16,
    /// Log verbosity level (0 = warn, higher = more detail).
    pub verbose: u8,
    /// Delay between reconnect attempts.
    pub reconnect_delay_secs: u64,
}

impl Config {
    /// Parse `std::env::args` and validate. On failure, clap itself may
    /// already have exited the process (bad arg count, `--help`); range
    /// validation failures return a `Config` error for the caller to report
    /// and exit non-zero.
    pub fn from_args() -> Result<Self, Error> {
        let opt = Opt::parse();
        Self::from_opt(opt)
    }

    fn from_opt(opt: Opt) -> Result<Self, Error> {
        if opt.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if !(MIN_PID..=MAX_PID).contains(&opt.pid) {
            return Err(Error::Config(format!(
                "PID {} out of range {}..={}",
                opt.pid, MIN_PID, MAX_PID
            )));
        }
        if opt.port == 0 {
            return Err(Error::Config("port must be in 1..=65535".into()));
        }
        Ok(Config {
            host: opt.host,
            channel: opt.channel,
            pid: opt.pid as u16,
            port: opt.port,
            verbose: opt.verbose,
            reconnect_delay_secs: opt.reconnect_delay,
        })
    }
}
