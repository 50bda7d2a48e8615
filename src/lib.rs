#![warn(missing_docs)]
//! Single-channel DVB Teletext acquisition daemon.
//!
//! Ingests a continuous MPEG-2 Transport Stream over a long-lived HTTP
//! connection to a networked tuner, extracts one elementary-stream PID,
//! reassembles PES packets, runs the payload through an EBU/ETSI 300 706
//! Teletext slicer and page assembler, and emits one JSON datagram per
//! completed page over UDP.
//!
//! # Pipeline
//!
//! ```text
//!   [ HTTP stream source ]      A
//!            |
//!       [ TS framer ]           B
//!            |
//!   [ TS packet filter ]        C
//!            |
//!   [ PES reassembler ]         D
//!            |
//!  [ PES header parser ]        E
//!            |
//!     [ VBI bridge ]            F
//!            |
//!  [ Page serialiser ]          G
//!            |
//!    [ UDP emitter ]            H
//! ```
//!
//! Component I (`supervisor`) wraps A and orchestrates reconnects. All of
//! this runs on a single thread: there are no locks, no queues, and no
//! shared state beyond the signal flag supervisor::run is handed.

pub mod config;
pub mod error;
pub mod http_source;
pub mod page;
pub mod pes;
pub mod supervisor;
pub mod ts_framer;
pub mod ts_packet;
pub mod udp_sink;
pub mod vbi;

pub use error::Error;
