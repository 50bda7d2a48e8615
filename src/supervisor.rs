//! Supervisor (component I).
//!
//! Owns every piece of per-connection state in one `Pipeline` value and
//! runs the reconnect loop: open the HTTP stream, pump bytes through the
//! framer/filter/reassembler/VBI bridge/serialiser/UDP chain until the
//! stream ends, sleep, and try again. The only datum that outlives a
//! single connection attempt is the running flag, written from the signal
//! handler installed in `main`.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::http_source::HttpStreamSource;
use crate::page;
use crate::pes::{parse_pes_payload, PesAccumulator};
use crate::ts_framer::TsFramer;
use crate::ts_packet;
use crate::udp_sink::UdpSink;
use crate::vbi::VbiBridge;

/// Size of the read buffer pumped from the HTTP stream into the framer.
const READ_BUF_SIZE: usize = 16 * 1024;

/// Everything a single connection attempt needs, reset in full on every
/// reconnect except the UDP socket, which carries no per-connection state
/// and is simply reused.
struct Pipeline {
    framer: TsFramer,
    pes: PesAccumulator,
    vbi: VbiBridge,
    udp: UdpSink,
    target_pid: u16,
    ts_drops: u64,
    bad_pes_headers: u64,
}

impl Pipeline {
    fn new(target_pid: u16, udp: UdpSink) -> Result<Self, Error> {
        Ok(Self {
            framer: TsFramer::new(),
            pes: PesAccumulator::new(),
            vbi: VbiBridge::new()?,
            udp,
            target_pid,
            ts_drops: 0,
            bad_pes_headers: 0,
        })
    }

    /// Destroy and rebuild every piece of per-connection state. The UDP
    /// socket is reused; it holds no connection-scoped state to scrub.
    fn rebuild(self) -> Result<Self, Error> {
        Ok(Self {
            framer: TsFramer::new(),
            pes: PesAccumulator::new(),
            vbi: VbiBridge::new()?,
            udp: self.udp,
            target_pid: self.target_pid,
            ts_drops: self.ts_drops,
            bad_pes_headers: self.bad_pes_headers,
        })
    }

    /// Feed one network read's worth of bytes all the way through to UDP.
    fn feed(&mut self, chunk: &[u8]) {
        let target_pid = self.target_pid;
        let pes = &mut self.pes;
        let vbi = &mut self.vbi;
        let udp = &mut self.udp;
        let mut ts_drops = 0u64;
        let mut bad_pes_headers = 0u64;

        self.framer.feed(chunk, |packet| match ts_packet::inspect(packet, target_pid) {
            None => ts_drops += 1,
            Some((pusi, payload)) => {
                pes.push(pusi, payload, |pes_bytes| {
                    match parse_pes_payload(pes_bytes) {
                        None => bad_pes_headers += 1,
                        Some(vbi_payload) => {
                            vbi.feed(vbi_payload);
                            for ev in vbi.drain_events() {
                                dispatch_page(vbi, udp, ev.page, ev.subpage);
                            }
                        }
                    }
                });
            }
        });

        self.ts_drops += ts_drops;
        self.bad_pes_headers += bad_pes_headers;
    }

    fn log_shutdown_stats(&self) {
        info!(
            "shutting down: ts_drops={} pes_overflows={} bad_pes_headers={} udp_send_errors={}",
            self.ts_drops,
            self.pes.overflow_count(),
            self.bad_pes_headers,
            self.udp.send_errors()
        );
    }
}

fn dispatch_page(vbi: &VbiBridge, udp: &mut UdpSink, page_no: u16, subpage: u16) {
    let Some(grid) = vbi.fetch_page(page_no, subpage) else {
        return;
    };
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Some(datagram) = page::build_datagram(page_no, subpage, &grid, ts) {
        udp.send(&datagram);
    } else {
        warn!("page {page_no}/{subpage} serialised over the size bound; dropped");
    }
}

/// Run the reconnect loop until `running` is cleared. Returns once a
/// clean, signal-initiated shutdown has completed.
pub fn run(config: &Config, running: Arc<AtomicBool>) -> Result<(), Error> {
    info!(
        "starting: host={} channel={} pid={} port={} reconnect_delay={}s",
        config.host, config.channel, config.pid, config.port, config.reconnect_delay_secs
    );

    let udp = UdpSink::new(config.port)?;
    let mut pipeline = Pipeline::new(config.pid, udp)?;
    let mut buf = [0u8; READ_BUF_SIZE];

    while running.load(Ordering::Relaxed) {
        let mut stream = match HttpStreamSource::open(&config.host, config.channel) {
            Ok(s) => s,
            Err(e) => {
                warn!("connect failed: {e}; retrying in {}s", config.reconnect_delay_secs);
                sleep_reconnect_delay(config, &running);
                if running.load(Ordering::Relaxed) {
                    pipeline = pipeline.rebuild()?;
                }
                continue;
            }
        };

        loop {
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match stream.read(&mut buf) {
                Ok(0) => {
                    info!("upstream closed the connection");
                    break;
                }
                Ok(n) => pipeline.feed(&buf[..n]),
                Err(e) => {
                    warn!("read error: {e}");
                    break;
                }
            }
        }

        if !running.load(Ordering::Relaxed) {
            break;
        }
        sleep_reconnect_delay(config, &running);
        pipeline = pipeline.rebuild()?;
    }

    pipeline.log_shutdown_stats();
    Ok(())
}

fn sleep_reconnect_delay(config: &Config, running: &Arc<AtomicBool>) {
    let deadline = Duration::from_secs(config.reconnect_delay_secs);
    let step = Duration::from_millis(200);
    let mut waited = Duration::ZERO;
    while waited < deadline && running.load(Ordering::Relaxed) {
        let remaining = deadline - waited;
        std::thread::sleep(remaining.min(step));
        waited += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_reconnect_delay_returns_early_when_signalled() {
        let config = Config {
            host: "x".into(),
            channel: 1,
            pid: 100,
            port: 1,
            verbose: 0,
            reconnect_delay_secs: 60,
        };
        let running = Arc::new(AtomicBool::new(false));
        let start = std::time::Instant::now();
        sleep_reconnect_delay(&config, &running);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
