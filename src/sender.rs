//! Selective-Repeat send-side state machine (endpoint A).
//!
//! [`SrSender`] maintains a sliding window of up to `W` in-flight packets.
//! Unlike Go-Back-N, acknowledgments are **selective**: an ACK names exactly
//! one packet, may arrive out of order, and marks only its own slot. Buffer
//! space is reclaimed strictly in sequence order; the window base advances
//! only across a contiguous run of acknowledged slots.
//!
//! # Protocol contract
//!
//! - At most `W` packets may be awaiting acknowledgment at once; a send
//!   into a full window is rejected and the caller retries later.
//! - One retransmission timer covers the oldest unacknowledged packet. It is
//!   armed on the 0 to 1 in-flight transition, canceled when the window
//!   empties, and re-armed after every slide that leaves packets in flight.
//! - On expiry, only the oldest unacknowledged packet is resent. Because the
//!   window slides eagerly past acked slots, that packet is always the one
//!   at the window base.
//! - Corrupted, out-of-window, and duplicate ACKs are complete no-ops apart
//!   from statistics.
//!
//! All side effects go through the [`Channel`] passed into each handler;
//! this module never performs I/O of its own.

use crate::channel::Channel;
use crate::packet::{Message, Packet};
use crate::seq::SequenceSpace;

/// Fixed retransmission interval in emulator ticks, sized to one round trip.
pub const RETRANSMIT_TIMEOUT: f64 = 16.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rejection returned when the send window is full.
///
/// This is flow control, not a fault: the message was not accepted and the
/// caller should offer it again after the window slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFull;

impl std::fmt::Display for WindowFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "send window is full, retry after an acknowledgment")
    }
}

impl std::error::Error for WindowFull {}

/// Lifecycle of one window slot.
///
/// The in-flight copy lives inside `Sent` so it is available for
/// retransmission and dropped the moment the packet is acknowledged; an
/// `Acked` slot waits only for the base to slide over it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SendSlot {
    Free,
    Sent(Packet),
    Acked,
}

impl SendSlot {
    fn is_acked(&self) -> bool {
        matches!(self, SendSlot::Acked)
    }
}

/// Counters mirroring the transfer statistics of interest on the send side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages accepted and transmitted for the first time.
    pub messages_sent: u64,
    /// Messages rejected because the window was full.
    pub window_full: u64,
    /// Uncorrupted ACK packets processed (any window position).
    pub acks_received: u64,
    /// ACKs that newly marked a slot (not duplicates, not out of window).
    pub new_acks: u64,
    /// Retransmissions triggered by timer expiry.
    pub packets_resent: u64,
}

// ---------------------------------------------------------------------------
// SrSender
// ---------------------------------------------------------------------------

/// Selective-Repeat send-side state for one endpoint.
///
/// # Window layout
///
/// ```text
///  send_base            next_seq
///      │                    │
///  ────┼────────────────────┼──────────▶ seq space (mod S)
///      │ <── in flight ───▶ │ <─ sendable up to W total
/// ```
///
/// Slots form a ring of `W` entries in insertion order: the packet with
/// circular offset `k` from `send_base` occupies ring index
/// `(base_slot + k) mod W`. Keying by insertion order rather than by
/// `seqnum mod W` keeps slots collision-free even when `S` is not a
/// multiple of `W`.
#[derive(Debug)]
pub struct SrSender {
    space: SequenceSpace,

    /// Sequence number of the oldest unacknowledged packet.
    send_base: u16,

    /// Sequence number to assign to the next new packet.
    next_seq: u16,

    /// Ring index of `send_base`'s slot.
    base_slot: usize,

    /// Number of packets currently awaiting acknowledgment (acked but
    /// not-yet-slid slots included).
    in_flight: usize,

    /// Retransmission ring, `W` entries.
    slots: Vec<SendSlot>,

    /// Transfer counters.
    pub stats: SenderStats,
}

impl SrSender {
    /// Create a sender over `space`, starting at sequence number 0.
    pub fn new(space: SequenceSpace) -> Self {
        Self {
            space,
            send_base: 0,
            next_seq: 0,
            base_slot: 0,
            in_flight: 0,
            slots: vec![SendSlot::Free; space.window() as usize],
            stats: SenderStats::default(),
        }
    }

    /// Sequence number of the oldest unacknowledged packet.
    pub fn send_base(&self) -> u16 {
        self.send_base
    }

    /// Sequence number the next accepted message will carry.
    pub fn next_seq(&self) -> u16 {
        self.next_seq
    }

    /// Number of packets currently awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `true` when a new message would be rejected.
    pub fn window_full(&self) -> bool {
        self.in_flight == self.slots.len()
    }

    /// Accept one application message: frame it, buffer it, transmit it.
    ///
    /// Arms the retransmission timer when this packet is the only one in
    /// flight. Rejects with [`WindowFull`] when `W` packets are already
    /// outstanding, leaving all state untouched.
    pub fn send(&mut self, message: Message, link: &mut impl Channel) -> Result<(), WindowFull> {
        if self.window_full() {
            log::debug!("[snd] window full, message refused");
            self.stats.window_full += 1;
            return Err(WindowFull);
        }

        let pkt = Packet::data(self.next_seq, message);
        let slot = (self.base_slot + self.in_flight) % self.slots.len();
        self.slots[slot] = SendSlot::Sent(pkt.clone());

        log::debug!(
            "[snd] -> DATA seq={} in_flight={}",
            pkt.seqnum,
            self.in_flight + 1
        );
        link.transmit(pkt);
        self.stats.messages_sent += 1;

        if self.in_flight == 0 {
            link.arm_timer(RETRANSMIT_TIMEOUT);
        }
        self.in_flight += 1;
        self.next_seq = self.space.next(self.next_seq);
        Ok(())
    }

    /// Process a packet arriving from the channel (always an ACK on the
    /// one-way data path).
    ///
    /// Corrupted, out-of-window, and duplicate ACKs are discarded without
    /// touching the window or the timer. A new in-window ACK marks its slot;
    /// if the slot is the window base, the base slides across every
    /// contiguous acked slot and the timer is canceled and re-armed for the
    /// remaining in-flight packets, if any.
    pub fn on_packet(&mut self, packet: &Packet, link: &mut impl Channel) {
        if packet.is_corrupted() {
            log::debug!("[snd] corrupted ACK dropped");
            return;
        }
        self.stats.acks_received += 1;

        let offset = usize::from(self.space.dist(self.send_base, packet.acknum));
        if offset >= self.in_flight {
            // A late duplicate of a packet the window already slid past, or
            // an ACK for a sequence number never sent. Either way: no-op.
            log::debug!("[snd] <- ACK {} out of window, dropped", packet.acknum);
            return;
        }

        let slot = (self.base_slot + offset) % self.slots.len();
        match &self.slots[slot] {
            SendSlot::Acked => {
                log::debug!("[snd] <- duplicate ACK {}, dropped", packet.acknum);
            }
            SendSlot::Free => {
                // Unreachable while offset < in_flight; tolerate it as a drop.
                log::warn!("[snd] <- ACK {} for a free slot, dropped", packet.acknum);
            }
            SendSlot::Sent(_) => {
                self.slots[slot] = SendSlot::Acked;
                self.stats.new_acks += 1;
                log::debug!("[snd] <- ACK {} marks slot", packet.acknum);

                if offset == 0 {
                    self.slide(link);
                }
            }
        }
    }

    /// Resend the oldest unacknowledged packet and restart the timer.
    ///
    /// The slide in [`on_packet`] guarantees the base slot is never `Acked`
    /// while the window is non-empty, so the oldest unacknowledged packet is
    /// always the base packet.
    ///
    /// [`on_packet`]: SrSender::on_packet
    pub fn on_timeout(&mut self, link: &mut impl Channel) {
        if let SendSlot::Sent(ref pkt) = self.slots[self.base_slot] {
            log::debug!("[snd] timeout, resending seq={}", pkt.seqnum);
            link.transmit(pkt.clone());
            self.stats.packets_resent += 1;
            link.arm_timer(RETRANSMIT_TIMEOUT);
        } else {
            // A timeout with nothing in flight means the channel delivered a
            // stale expiry; the timer stays disarmed.
            log::warn!("[snd] timeout with empty window ignored");
        }
    }

    /// Advance the base across the contiguous run of acked slots, then fix
    /// up the timer: cancel it, and re-arm iff packets remain in flight.
    fn slide(&mut self, link: &mut impl Channel) {
        while self.in_flight > 0 && self.slots[self.base_slot].is_acked() {
            self.slots[self.base_slot] = SendSlot::Free;
            self.base_slot = (self.base_slot + 1) % self.slots.len();
            self.send_base = self.space.next(self.send_base);
            self.in_flight -= 1;
        }
        log::debug!(
            "[snd] window slid to base={} in_flight={}",
            self.send_base,
            self.in_flight
        );

        link.cancel_timer();
        if self.in_flight > 0 {
            link.arm_timer(RETRANSMIT_TIMEOUT);
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
