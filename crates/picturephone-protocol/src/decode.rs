use crate::{MAX_PICTURE_PAYLOAD, TYPE_CONFIG, TYPE_PICTURE};

/// A decoded packet from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// "Send me frames at this many terminal cells."
    Config { width: u8, height: u8 },
    /// A single-channel luminance frame, row-major, `width * height` bytes.
    Picture {
        width: u8,
        height: u8,
        luma: Vec<u8>,
    },
}

/// Receive-side byte accumulator implementing the resync-by-byte-drop
/// state machine: unrecognized type bytes are dropped one at a time
/// rather than treated as fatal, since a desynced stream recovers on
/// its own once the next valid header appears.
#[derive(Debug, Default)]
pub struct Accumulator {
    buf: Vec<u8>,
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append newly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Decode and remove at most one complete packet, resyncing past
    /// any unrecognized type bytes first. Returns `None` when the
    /// accumulator holds fewer than 3 bytes, or holds a `Picture`
    /// header whose payload has not fully arrived yet; in the latter
    /// case the header and partial payload are left intact.
    pub fn pop_packet(&mut self) -> Option<Packet> {
        loop {
            if self.buf.len() < 3 {
                return None;
            }
            match self.buf[0] {
                TYPE_CONFIG => {
                    let width = self.buf[1];
                    let height = self.buf[2];
                    self.buf.drain(0..3);
                    return Some(Packet::Config { width, height });
                }
                TYPE_PICTURE => {
                    let width = self.buf[1];
                    let height = self.buf[2];
                    let payload_len = usize::from(width) * usize::from(height);
                    debug_assert!(payload_len <= MAX_PICTURE_PAYLOAD);
                    let total = 3 + payload_len;
                    if self.buf.len() < total {
                        return None;
                    }
                    let luma = self.buf[3..total].to_vec();
                    self.buf.drain(0..total);
                    return Some(Packet::Picture {
                        width,
                        height,
                        luma,
                    });
                }
                _ => {
                    self.buf.remove(0);
                }
            }
        }
    }

    /// Drain and return every complete packet currently available.
    pub fn drain_packets(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Some(p) = self.pop_packet() {
            packets.push(p);
        }
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_bytes(w: u8, h: u8) -> Vec<u8> {
        vec![TYPE_CONFIG, w, h]
    }

    fn picture_bytes(w: u8, h: u8, luma: &[u8]) -> Vec<u8> {
        let mut v = vec![TYPE_PICTURE, w, h];
        v.extend_from_slice(luma);
        v
    }

    #[test]
    fn decodes_config() {
        let mut acc = Accumulator::new();
        acc.extend(&config_bytes(80, 40));
        assert_eq!(
            acc.pop_packet(),
            Some(Packet::Config {
                width: 80,
                height: 40
            })
        );
        assert_eq!(acc.pending_len(), 0);
    }

    #[test]
    fn picture_waits_for_full_payload() {
        let mut acc = Accumulator::new();
        let full = picture_bytes(4, 2, &[0, 64, 128, 255, 32, 96, 160, 224]);
        acc.extend(&full[..5]);
        assert_eq!(acc.pop_packet(), None);
        acc.extend(&full[5..]);
        let packet = acc.pop_packet().unwrap();
        assert_eq!(
            packet,
            Packet::Picture {
                width: 4,
                height: 2,
                luma: vec![0, 64, 128, 255, 32, 96, 160, 224],
            }
        );
    }

    #[test]
    fn resync_skips_single_junk_byte() {
        // S4: one junk byte 'X' (0x58) before a valid Config.
        let mut acc = Accumulator::new();
        acc.extend(&[0x58]);
        acc.extend(&config_bytes(0x50, 0x28));
        let packet = acc.pop_packet().unwrap();
        assert_eq!(
            packet,
            Packet::Config {
                width: 0x50,
                height: 0x28
            }
        );
        assert_eq!(acc.pending_len(), 0);
    }

    #[test]
    fn resync_between_two_valid_packets() {
        let mut acc = Accumulator::new();
        acc.extend(&config_bytes(10, 20));
        acc.extend(&[0x99]);
        acc.extend(&config_bytes(30, 40));
        let packets = acc.drain_packets();
        assert_eq!(
            packets,
            vec![
                Packet::Config {
                    width: 10,
                    height: 20
                },
                Packet::Config {
                    width: 30,
                    height: 40
                },
            ]
        );
    }

    #[test]
    fn zero_dimension_config_is_still_decoded_caller_ignores() {
        // The accumulator decodes it; ignoring w=0/h=0 is the caller's job.
        let mut acc = Accumulator::new();
        acc.extend(&config_bytes(0, 0));
        assert_eq!(
            acc.pop_packet(),
            Some(Packet::Config {
                width: 0,
                height: 0
            })
        );
    }

    fn encode_sequence(packets: &[Packet]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in packets {
            match p {
                Packet::Config { width, height } => {
                    out.extend_from_slice(&[TYPE_CONFIG, *width, *height]);
                }
                Packet::Picture {
                    width,
                    height,
                    luma,
                } => {
                    out.extend_from_slice(&[TYPE_PICTURE, *width, *height]);
                    out.extend_from_slice(luma);
                }
            }
        }
        out
    }

    proptest::proptest! {
        #[test]
        fn parser_is_chunking_invariant(
            configs in proptest::collection::vec((proptest::prelude::any::<u8>(), proptest::prelude::any::<u8>()), 0..6),
            chunk_size in 1usize..7,
        ) {
            let packets: Vec<Packet> = configs
                .into_iter()
                .map(|(w, h)| Packet::Config { width: w, height: h })
                .collect();
            let bytes = encode_sequence(&packets);

            let mut whole = Accumulator::new();
            whole.extend(&bytes);
            let decoded_whole = whole.drain_packets();

            let mut chunked = Accumulator::new();
            let mut decoded_chunked = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                chunked.extend(chunk);
                decoded_chunked.extend(chunked.drain_packets());
            }

            proptest::prop_assert_eq!(decoded_whole, decoded_chunked);
        }
    }
}
