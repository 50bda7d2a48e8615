//! TS framer (component B).
//!
//! Re-aligns arbitrary byte chunks from the network onto 188-octet MPEG-2
//! Transport Stream packet boundaries. Stateful: holds the prefix of a
//! packet that straddled a read boundary in a fixed-size carry buffer.
//!
//! The framer does not search for a sync byte to recover from corruption;
//! the first chunk after (re)connect is assumed to begin on a packet
//! boundary. Misaligned packets are caught downstream by the packet filter
//! (component C), not here.

/// Size in octets of one MPEG-2 Transport Stream packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Re-aligns a byte stream onto 188-octet packet boundaries.
pub struct TsFramer {
    carry: [u8; TS_PACKET_SIZE],
    filled: usize,
}

impl TsFramer {
    /// Create a framer with an empty carry buffer.
    pub fn new() -> Self {
        Self {
            carry: [0u8; TS_PACKET_SIZE],
            filled: 0,
        }
    }

    /// Clear the carry buffer. Call on every (re)connect so stale bytes
    /// from a previous stream never get glued to a new one.
    pub fn reset(&mut self) {
        self.filled = 0;
    }

    /// Feed a chunk of network bytes, invoking `on_packet` once per
    /// complete 188-octet packet found (including any packet completed
    /// from a previous call's carry). No heap allocation.
    pub fn feed(&mut self, mut chunk: &[u8], mut on_packet: impl FnMut(&[u8; TS_PACKET_SIZE])) {
        if self.filled > 0 {
            let need = TS_PACKET_SIZE - self.filled;
            let take = need.min(chunk.len());
            self.carry[self.filled..self.filled + take].copy_from_slice(&chunk[..take]);
            self.filled += take;
            chunk = &chunk[take..];
            if self.filled == TS_PACKET_SIZE {
                on_packet(&self.carry);
                self.filled = 0;
            } else {
                return;
            }
        }

        while chunk.len() >= TS_PACKET_SIZE {
            let mut packet = [0u8; TS_PACKET_SIZE];
            packet.copy_from_slice(&chunk[..TS_PACKET_SIZE]);
            on_packet(&packet);
            chunk = &chunk[TS_PACKET_SIZE..];
        }

        if !chunk.is_empty() {
            self.carry[..chunk.len()].copy_from_slice(chunk);
            self.filled = chunk.len();
        }
    }
}

impl Default for TsFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_stream(n_packets: usize) -> Vec<u8> {
        let mut v = Vec::with_capacity(n_packets * TS_PACKET_SIZE);
        for i in 0..n_packets {
            v.push(0x47);
            v.push((i >> 8) as u8);
            v.push(i as u8);
            v.extend(std::iter::repeat((i % 256) as u8).take(TS_PACKET_SIZE - 3));
        }
        v
    }

    fn feed_in_chunks(stream: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
        let mut framer = TsFramer::new();
        let mut out = Vec::new();
        for chunk in stream.chunks(chunk_size) {
            framer.feed(chunk, |p| out.push(p.to_vec()));
        }
        out
    }

    #[test]
    fn whole_stream_at_once() {
        let stream = synthetic_stream(10);
        let packets = feed_in_chunks(&stream, stream.len());
        assert_eq!(packets.len(), 10);
        for (i, p) in packets.iter().enumerate() {
            assert_eq!(&p[..], &stream[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE]);
        }
    }

    #[test]
    fn one_byte_at_a_time() {
        let stream = synthetic_stream(5);
        let packets = feed_in_chunks(&stream, 1);
        assert_eq!(packets.len(), 5);
        for (i, p) in packets.iter().enumerate() {
            assert_eq!(&p[..], &stream[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE]);
        }
    }

    #[test]
    fn chunk_size_is_188k_plus_1_carries_one_byte() {
        let stream = synthetic_stream(6);
        // 188*2 + 1 = 377: emits 2 packets, carries 1 byte, each feed call.
        let mut framer = TsFramer::new();
        let mut out = Vec::new();
        for chunk in stream.chunks(377) {
            framer.feed(chunk, |p| out.push(p.to_vec()));
        }
        assert_eq!(out.len(), 6);
        for (i, p) in out.iter().enumerate() {
            assert_eq!(&p[..], &stream[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE]);
        }
    }

    #[test]
    fn arbitrary_chunking_is_associative() {
        let stream = synthetic_stream(20);
        let whole = feed_in_chunks(&stream, stream.len());
        for size in [1usize, 3, 7, 17, 64, 188, 189, 500] {
            let chunked = feed_in_chunks(&stream, size);
            assert_eq!(chunked, whole, "mismatch at chunk size {size}");
        }
    }

    #[test]
    fn reset_clears_carry_across_reconnect() {
        let mut framer = TsFramer::new();
        let mut out = Vec::new();
        // Feed a partial packet, then reset: it must never be glued to the
        // next connection's bytes.
        framer.feed(&[0xAA; 50], |p| out.push(p.to_vec()));
        framer.reset();
        let stream = synthetic_stream(1);
        framer.feed(&stream, |p| out.push(p.to_vec()));
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], &stream[..]);
    }
}
