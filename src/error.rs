//! Error types.
//!
//! Only configuration errors and transport errors are represented here.
//! Framing anomalies, accumulator overflow and UDP send failures are
//! absorbed locally (logged, counted) and never surface as an `Error`:
//! they are per-packet noise, not conditions the supervisor should act on.

use thiserror::Error;

/// Top-level error type for configuration and transport failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad PID, bad port, wrong argument count, or similar: fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// TCP connect failed.
    #[error("connect refused: {0}")]
    ConnectRefused(#[source] std::io::Error),

    /// Header block exceeded the bounded buffer before `CRLFCRLF`.
    #[error("HTTP response header exceeded {0} bytes before terminator")]
    HeaderTooLarge(usize),

    /// Status line or headers could not be parsed.
    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),

    /// Response status was not 200.
    #[error("stream unavailable: HTTP status {0}")]
    StreamUnavailable(u32),

    /// Generic I/O failure reading or writing a socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The Teletext decoding library failed to initialise.
    #[error("Teletext library initialisation failed: {0}")]
    VbiInit(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;
