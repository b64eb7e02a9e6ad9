//! Wire-format definitions for protocol packets.
//!
//! Every frame exchanged between the endpoints is a [`Packet`]. This module
//! is responsible for:
//! - Defining the on-wire binary layout (header fields, payload).
//! - Computing the additive checksum and testing a packet for corruption.
//! - Serialising a [`Packet`] into a byte buffer and back, returning errors
//!   for truncated input.
//!
//! No I/O happens here, this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        Sequence Number        |     Acknowledgment Number     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                            Checksum                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Payload (20 bytes) ...                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total frame size: [`FRAME_LEN`] = 28 bytes.
//! seq(2) + ack(2) + checksum(4) + payload(20)
//!
//! The checksum is the arithmetic sum of `seqnum`, `acknum`, and every
//! payload byte. It is stored when the packet is built and never recomputed
//! in place; [`Packet::is_corrupted`] recomputes the sum and compares, which
//! is the only corruption detection the protocol performs. [`Packet::decode`]
//! deliberately does *not* verify it: a frame that parses but fails the
//! checksum must reach the endpoint so the endpoint can apply its
//! corruption policy.

/// Fixed payload width, in bytes. Every data packet carries exactly this
/// many bytes of application data; ACK packets carry it zero-filled.
pub const PAYLOAD_LEN: usize = 20;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

/// Byte length of a complete encoded frame.
pub const FRAME_LEN: usize = HEADER_LEN + PAYLOAD_LEN;

/// Sentinel for the `acknum` field of data packets, which do not
/// acknowledge anything on the one-way data path.
pub const NOT_IN_USE: u16 = u16::MAX;

// Byte offsets of each field within a serialised frame.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 2;
const OFF_CHECKSUM: usize = 4;

/// One application message: a fixed-width block of payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub data: [u8; PAYLOAD_LEN],
}

impl Message {
    pub fn new(data: [u8; PAYLOAD_LEN]) -> Self {
        Self { data }
    }
}

/// A complete protocol frame: header fields plus a fixed-size payload.
///
/// Immutable once built: the constructors compute and store the checksum,
/// and nothing afterwards rewrites the fields. A packet whose stored
/// checksum disagrees with [`Packet::compute_checksum`] was corrupted in
/// transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sequence number of this packet (data) or filler toggle (ACK).
    pub seqnum: u16,
    /// Acknowledged sequence number; [`NOT_IN_USE`] on data packets.
    pub acknum: u16,
    /// Additive checksum over `seqnum`, `acknum`, and the payload.
    pub checksum: u32,
    /// Application data (data packets) or zeroes (ACK packets).
    pub payload: [u8; PAYLOAD_LEN],
}

impl Packet {
    /// Build a checksummed data packet carrying `message`.
    pub fn data(seqnum: u16, message: Message) -> Self {
        let mut pkt = Self {
            seqnum,
            acknum: NOT_IN_USE,
            checksum: 0,
            payload: message.data,
        };
        pkt.checksum = pkt.compute_checksum();
        pkt
    }

    /// Build a checksummed pure-ACK packet acknowledging `acknum`.
    ///
    /// `seqnum` is the receiver's 0/1 filler toggle; the payload is
    /// zero-filled and carries no data.
    pub fn ack(seqnum: u16, acknum: u16) -> Self {
        let mut pkt = Self {
            seqnum,
            acknum,
            checksum: 0,
            payload: [0u8; PAYLOAD_LEN],
        };
        pkt.checksum = pkt.compute_checksum();
        pkt
    }

    /// The arithmetic sum of `seqnum`, `acknum`, and every payload byte.
    pub fn compute_checksum(&self) -> u32 {
        let mut sum = u32::from(self.seqnum) + u32::from(self.acknum);
        for &b in &self.payload {
            sum += u32::from(b);
        }
        sum
    }

    /// `true` when the stored checksum disagrees with the recomputed one.
    pub fn is_corrupted(&self) -> bool {
        self.checksum != self.compute_checksum()
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_LEN];
        buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&self.seqnum.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 2].copy_from_slice(&self.acknum.to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is not exactly [`FRAME_LEN`] bytes. The
    /// checksum is *not* verified here; corruption is the endpoint's call.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }
        if buf.len() != FRAME_LEN {
            return Err(PacketError::LengthMismatch);
        }

        let seqnum = u16::from_be_bytes([buf[OFF_SEQ], buf[OFF_SEQ + 1]]);
        let acknum = u16::from_be_bytes([buf[OFF_ACK], buf[OFF_ACK + 1]]);
        let checksum = u32::from_be_bytes([
            buf[OFF_CHECKSUM],
            buf[OFF_CHECKSUM + 1],
            buf[OFF_CHECKSUM + 2],
            buf[OFF_CHECKSUM + 3],
        ]);
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&buf[HEADER_LEN..]);

        Ok(Self {
            seqnum,
            acknum,
            checksum,
            payload,
        })
    }
}

/// Errors that can arise when parsing a raw frame.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    BufferTooShort,
    /// Buffer is not exactly one frame long.
    LengthMismatch,
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::BufferTooShort => write!(f, "buffer too short to contain a header"),
            PacketError::LengthMismatch => write!(f, "buffer is not exactly one frame"),
        }
    }
}

impl std::error::Error for PacketError {}
