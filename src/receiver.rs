//! Selective-Repeat receive-side state machine (endpoint B).
//!
//! [`SrReceiver`] buffers correctly received, in-window packets even when
//! they arrive out of order, and releases payloads to the application only
//! as contiguous in-sequence runs starting at `recv_base`. Every accepted or
//! duplicate arrival is acknowledged individually, so the sender can mark
//! exactly the packets that made it across.
//!
//! # Acknowledgment policy
//!
//! - Corrupted packets are dropped silently, with no ACK. Recovery is left
//!   to the sender's retransmission timer.
//! - In-window packets are ACKed with their own sequence number, whether
//!   newly buffered or duplicates of a buffered-but-undelivered packet.
//! - A packet up to `W` behind `recv_base` was already delivered; it is
//!   re-ACKed (the previous ACK may have been lost in transit) but never
//!   re-delivered.
//! - Anything further ahead than the window is dropped without an ACK; the
//!   sender's admission control keeps this from happening in normal runs.
//!
//! Outgoing ACK frames carry a 0/1 toggle in their sequence field. It is
//! checksummed framing filler only; the one-way data path gives the
//! receiver no sequence numbers of its own.

use crate::channel::Channel;
use crate::packet::Packet;
use crate::seq::SequenceSpace;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One slot of the out-of-order buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RecvSlot {
    Empty,
    Buffered(Packet),
}

/// Counters mirroring the transfer statistics of interest on the receive side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// New in-window packets accepted into the buffer.
    pub packets_received: u64,
    /// Duplicate arrivals (buffered or already delivered).
    pub duplicates: u64,
    /// Corrupted arrivals dropped without an ACK.
    pub corrupted: u64,
    /// Payloads handed to the application.
    pub delivered: u64,
    /// ACK packets transmitted.
    pub acks_sent: u64,
}

// ---------------------------------------------------------------------------
// SrReceiver
// ---------------------------------------------------------------------------

/// Selective-Repeat receive-side state for one endpoint.
///
/// The buffer is keyed by raw sequence number over all `S` slots; the window
/// invariant keeps at most `W` of them occupied, all within
/// `[recv_base, recv_base + W - 1]` (circularly). Slots are cleared the
/// moment their payload is delivered.
#[derive(Debug)]
pub struct SrReceiver {
    space: SequenceSpace,

    /// Next in-order sequence number to deliver.
    recv_base: u16,

    /// Out-of-order buffer, one slot per sequence number.
    slots: Vec<RecvSlot>,

    /// 0/1 filler toggle stamped on outgoing ACK frames.
    ack_toggle: u16,

    /// Transfer counters.
    pub stats: ReceiverStats,
}

impl SrReceiver {
    /// Create a receiver over `space`, expecting sequence number 0 first.
    pub fn new(space: SequenceSpace) -> Self {
        Self {
            space,
            recv_base: 0,
            slots: vec![RecvSlot::Empty; space.size() as usize],
            ack_toggle: 1,
            stats: ReceiverStats::default(),
        }
    }

    /// Next in-order sequence number the receiver will deliver.
    pub fn recv_base(&self) -> u16 {
        self.recv_base
    }

    /// Number of packets buffered but not yet deliverable.
    pub fn buffered(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, RecvSlot::Buffered(_)))
            .count()
    }

    /// Process a packet arriving from the channel.
    ///
    /// Delivers any contiguous run this packet completes (through
    /// [`Channel::deliver`], in increasing sequence order) and emits at most
    /// one ACK. See the module docs for the exact acknowledgment policy.
    pub fn on_packet(&mut self, packet: &Packet, link: &mut impl Channel) {
        if packet.is_corrupted() {
            log::debug!("[rcv] corrupted packet dropped, no ACK");
            self.stats.corrupted += 1;
            return;
        }

        let seq = packet.seqnum;
        if self.space.in_window(self.recv_base, seq) {
            let slot = usize::from(seq);
            match &self.slots[slot] {
                RecvSlot::Empty => {
                    self.slots[slot] = RecvSlot::Buffered(packet.clone());
                    self.stats.packets_received += 1;
                    log::debug!("[rcv] <- DATA seq={seq} buffered");
                    if seq == self.recv_base {
                        self.drain(link);
                    }
                }
                RecvSlot::Buffered(_) => {
                    // Already buffered, not yet delivered: the first ACK was
                    // lost or is still in flight. Re-ACK, never re-buffer.
                    self.stats.duplicates += 1;
                    log::debug!("[rcv] <- duplicate DATA seq={seq}");
                }
            }
            self.send_ack(seq, link);
        } else if self.space.behind_window(self.recv_base, seq) {
            // Delivered and acknowledged in a past window; the sender
            // retransmitted, so our ACK never arrived. Re-ACK or the sender
            // stalls forever.
            self.stats.duplicates += 1;
            log::debug!("[rcv] <- stale DATA seq={seq}, re-ACK");
            self.send_ack(seq, link);
        } else {
            log::warn!(
                "[rcv] <- DATA seq={seq} beyond window (base={}), dropped",
                self.recv_base
            );
        }
    }

    /// Deliver the contiguous buffered run starting at `recv_base`, freeing
    /// each slot and advancing the base, until a gap or the window edge.
    fn drain(&mut self, link: &mut impl Channel) {
        loop {
            let slot = usize::from(self.recv_base);
            match std::mem::replace(&mut self.slots[slot], RecvSlot::Empty) {
                RecvSlot::Empty => break,
                RecvSlot::Buffered(pkt) => {
                    log::debug!("[rcv] deliver seq={}", pkt.seqnum);
                    link.deliver(pkt.payload);
                    self.stats.delivered += 1;
                    self.recv_base = self.space.next(self.recv_base);
                }
            }
        }
    }

    /// Emit one ACK for `seq`, stamped with the 0/1 filler toggle.
    fn send_ack(&mut self, seq: u16, link: &mut impl Channel) {
        let ack = Packet::ack(self.ack_toggle, seq);
        self.ack_toggle = (self.ack_toggle + 1) % 2;
        self.stats.acks_sent += 1;
        log::debug!("[rcv] -> ACK {seq}");
        link.transmit(ack);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
