//! Peer wire protocol.
//!
//! Packets are self-describing without a length field: a one-byte
//! type followed by two one-byte dimensions bounds a `Picture`
//! payload at 65 025 bytes, so the receive accumulator never needs to
//! grow without limit. Framing, parsing with resync, and the
//! luminance encode used for outgoing frames all live here; nothing
//! about sockets does — the caller owns the `std`/`tokio` I/O.

mod decode;
mod encode;

pub use decode::{Accumulator, Packet};
pub use encode::encode_picture;

/// Default peer render size assumed until a [`Packet::Config`] arrives.
pub const DEFAULT_PEER_WIDTH: u8 = 80;
pub const DEFAULT_PEER_HEIGHT: u8 = 60;

/// Largest a single `Picture` payload can be: 255 * 255 bytes.
pub const MAX_PICTURE_PAYLOAD: usize = 255 * 255;

const TYPE_CONFIG: u8 = b'C';
const TYPE_PICTURE: u8 = b'P';
