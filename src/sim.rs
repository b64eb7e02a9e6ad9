//! Discrete-event channel emulator for deterministic protocol runs.
//!
//! Real channels drop, corrupt, and delay packets. To exercise the
//! reliability mechanisms without a real network, [`Emulator`] owns one
//! sender and one receiver endpoint, a virtual clock, and a time-ordered
//! event queue, and implements the [`Channel`] services the endpoints
//! consume, applying a configurable fault model on every handoff:
//!
//! | Fault       | Description                                          |
//! |-------------|------------------------------------------------------|
//! | Packet loss | Drop a frame with probability `loss_rate`.           |
//! | Corruption  | Flip one non-checksum byte with `corrupt_rate`.      |
//! | Delay       | `latency` plus uniform jitter in `[0, jitter)`.      |
//!
//! Corruption never touches the stored checksum bytes, so a corrupted frame
//! always fails the endpoints' checksum predicate. Frames handed to the
//! channel in one direction arrive in that order: variable delay widens the
//! spacing but a later handoff is never scheduled before an earlier one.
//!
//! All randomness comes from a `StdRng` seeded out of the config, so every
//! run (and every test failure) is reproducible. Targeted tests can also
//! script one-shot faults against the next frame in either direction.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::Channel;
use crate::packet::{Message, Packet, FRAME_LEN, HEADER_LEN, PAYLOAD_LEN};
use crate::receiver::SrReceiver;
use crate::sender::{SrSender, WindowFull};
use crate::seq::SequenceSpace;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fault-model and timing configuration.
///
/// All probabilities are in the range `[0.0, 1.0]`. The defaults are a
/// fault-free channel whose one-way delay averages three ticks; the worst
/// case round trip (10 ticks) stays inside the retransmission timeout, so a
/// clean channel never triggers a spurious resend.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Probability that any given frame is silently dropped.
    pub loss_rate: f64,
    /// Probability that a frame has one byte flipped in transit.
    pub corrupt_rate: f64,
    /// Fixed component of the one-way transit delay, in ticks.
    pub latency: f64,
    /// Upper bound of the uniform extra delay, in ticks.
    pub jitter: f64,
    /// Seed for the emulator's random number generator.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            latency: 1.0,
            jitter: 4.0,
            seed: 12345,
        }
    }
}

/// Channel-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    /// Frames handed to the channel in either direction.
    pub frames_sent: u64,
    /// Frames dropped in transit.
    pub frames_lost: u64,
    /// Frames delivered with a flipped byte.
    pub frames_corrupted: u64,
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum EventKind {
    /// An encoded frame reaches the sender endpoint.
    ArriveAtA(Vec<u8>),
    /// An encoded frame reaches the receiver endpoint.
    ArriveAtB(Vec<u8>),
    /// The sender's retransmission timer fires. Stale entries (canceled or
    /// superseded arms) carry a non-current id and are ignored.
    Timeout(u64),
    /// The application offers a message to the sender.
    AppSend(Message),
}

#[derive(Debug)]
struct Event {
    time: f64,
    /// Monotone tiebreaker so simultaneous events keep insertion order.
    id: u64,
    kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToA,
    ToB,
}

// ---------------------------------------------------------------------------
// Action collection
// ---------------------------------------------------------------------------

/// Side effects recorded while one endpoint handler runs. The emulator
/// cannot hand itself to the handler (both would need `&mut`), so handlers
/// write into this collector and the emulator applies the batch afterwards.
#[derive(Default)]
struct Actions {
    transmits: Vec<Packet>,
    timer_ops: Vec<TimerOp>,
    deliveries: Vec<[u8; PAYLOAD_LEN]>,
}

enum TimerOp {
    Arm(f64),
    Cancel,
}

impl Channel for Actions {
    fn transmit(&mut self, packet: Packet) {
        self.transmits.push(packet);
    }
    fn arm_timer(&mut self, duration: f64) {
        self.timer_ops.push(TimerOp::Arm(duration));
    }
    fn cancel_timer(&mut self) {
        self.timer_ops.push(TimerOp::Cancel);
    }
    fn deliver(&mut self, payload: [u8; PAYLOAD_LEN]) {
        self.deliveries.push(payload);
    }
}

// ---------------------------------------------------------------------------
// Emulator
// ---------------------------------------------------------------------------

/// One sender, one receiver, and the lossy channel between them.
pub struct Emulator {
    /// Endpoint A.
    pub a: SrSender,
    /// Endpoint B.
    pub b: SrReceiver,
    /// Channel-level counters.
    pub stats: NetStats,

    config: SimConfig,
    rng: StdRng,

    clock: f64,
    next_event_id: u64,
    queue: BinaryHeap<Reverse<Event>>,

    /// Id of the currently armed timer, if any.
    armed_timer: Option<u64>,
    next_timer_id: u64,

    /// Latest scheduled arrival per direction, for order preservation.
    last_arrival_to_a: f64,
    last_arrival_to_b: f64,

    // One-shot scripted faults, consumed per frame in handoff order.
    drop_to_a: u32,
    drop_to_b: u32,
    corrupt_to_a: u32,
    corrupt_to_b: u32,

    /// Payloads endpoint B has handed to the application, in delivery order.
    delivered: Vec<[u8; PAYLOAD_LEN]>,
}

impl Emulator {
    /// Create an emulator with fresh endpoints over `space`.
    pub fn new(space: SequenceSpace, config: SimConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            a: SrSender::new(space),
            b: SrReceiver::new(space),
            stats: NetStats::default(),
            config,
            rng,
            clock: 0.0,
            next_event_id: 0,
            queue: BinaryHeap::new(),
            armed_timer: None,
            next_timer_id: 0,
            last_arrival_to_a: 0.0,
            last_arrival_to_b: 0.0,
            drop_to_a: 0,
            drop_to_b: 0,
            corrupt_to_a: 0,
            corrupt_to_b: 0,
            delivered: Vec::new(),
        }
    }

    /// Current virtual time.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Payloads delivered to the application so far, in delivery order.
    pub fn delivered(&self) -> &[[u8; PAYLOAD_LEN]] {
        &self.delivered
    }

    /// Drop the next `n` frames handed to the channel towards the receiver.
    pub fn drop_next_to_b(&mut self, n: u32) {
        self.drop_to_b += n;
    }

    /// Drop the next `n` frames handed to the channel towards the sender.
    pub fn drop_next_to_a(&mut self, n: u32) {
        self.drop_to_a += n;
    }

    /// Corrupt the next `n` frames handed to the channel towards the receiver.
    pub fn corrupt_next_to_b(&mut self, n: u32) {
        self.corrupt_to_b += n;
    }

    /// Corrupt the next `n` frames handed to the channel towards the sender.
    pub fn corrupt_next_to_a(&mut self, n: u32) {
        self.corrupt_to_a += n;
    }

    /// Offer `message` to the sender right now.
    ///
    /// Returns [`WindowFull`] when the send window has no room; the message
    /// is then not in flight and the caller may retry after running events.
    pub fn send(&mut self, message: Message) -> Result<(), WindowFull> {
        let mut acts = Actions::default();
        let result = self.a.send(message, &mut acts);
        self.apply_sender_actions(acts);
        result
    }

    /// Offer `message` to the sender `delay` ticks from now.
    pub fn schedule_send(&mut self, delay: f64, message: Message) {
        let at = self.clock + delay;
        self.push_event(at, EventKind::AppSend(message));
    }

    /// Process the next pending event. Returns `false` when the queue is
    /// empty and the emulator is quiescent.
    pub fn step(&mut self) -> bool {
        let Reverse(event) = match self.queue.pop() {
            Some(e) => e,
            None => return false,
        };
        self.clock = event.time;

        match event.kind {
            EventKind::ArriveAtB(bytes) => match Packet::decode(&bytes) {
                Ok(pkt) => {
                    let mut acts = Actions::default();
                    self.b.on_packet(&pkt, &mut acts);
                    self.apply_receiver_actions(acts);
                }
                Err(e) => log::warn!("[net] undecodable frame at B dropped: {e}"),
            },
            EventKind::ArriveAtA(bytes) => match Packet::decode(&bytes) {
                Ok(pkt) => {
                    let mut acts = Actions::default();
                    self.a.on_packet(&pkt, &mut acts);
                    self.apply_sender_actions(acts);
                }
                Err(e) => log::warn!("[net] undecodable frame at A dropped: {e}"),
            },
            EventKind::Timeout(id) => {
                // Firing consumes the arm; stale ids belong to canceled timers.
                if self.armed_timer == Some(id) {
                    self.armed_timer = None;
                    let mut acts = Actions::default();
                    self.a.on_timeout(&mut acts);
                    self.apply_sender_actions(acts);
                }
            }
            EventKind::AppSend(message) => {
                let mut acts = Actions::default();
                if self.a.send(message, &mut acts).is_err() {
                    log::debug!("[net] scheduled message refused, window full");
                }
                self.apply_sender_actions(acts);
            }
        }
        true
    }

    /// Process events until the queue is empty.
    pub fn run_until_idle(&mut self) {
        while self.step() {}
    }

    /// Process every event scheduled at or before `t`, leaving later events
    /// pending. Useful for asserting on mid-transfer state.
    pub fn run_until(&mut self, t: f64) {
        loop {
            let due = match self.queue.peek() {
                Some(Reverse(next)) => next.time <= t,
                None => false,
            };
            if !due {
                break;
            }
            self.step();
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn push_event(&mut self, time: f64, kind: EventKind) {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.queue.push(Reverse(Event { time, id, kind }));
    }

    fn apply_sender_actions(&mut self, acts: Actions) {
        debug_assert!(acts.deliveries.is_empty());
        for pkt in acts.transmits {
            self.channel_send(Direction::ToB, &pkt);
        }
        for op in acts.timer_ops {
            match op {
                TimerOp::Arm(duration) => self.arm_timer(duration),
                TimerOp::Cancel => self.armed_timer = None,
            }
        }
    }

    fn apply_receiver_actions(&mut self, acts: Actions) {
        debug_assert!(acts.timer_ops.is_empty());
        for pkt in acts.transmits {
            self.channel_send(Direction::ToA, &pkt);
        }
        for payload in acts.deliveries {
            self.delivered.push(payload);
        }
    }

    fn arm_timer(&mut self, duration: f64) {
        debug_assert!(
            self.armed_timer.is_none(),
            "endpoint armed a second timer over a live one"
        );
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.armed_timer = Some(id);
        self.push_event(self.clock + duration, EventKind::Timeout(id));
    }

    /// Apply the fault model to one frame and schedule its arrival.
    fn channel_send(&mut self, dir: Direction, pkt: &Packet) {
        self.stats.frames_sent += 1;

        let scripted_drop = match dir {
            Direction::ToA => take_one(&mut self.drop_to_a),
            Direction::ToB => take_one(&mut self.drop_to_b),
        };
        if scripted_drop || self.rng.random::<f64>() < self.config.loss_rate {
            self.stats.frames_lost += 1;
            log::debug!("[net] frame seq={} lost in transit", pkt.seqnum);
            return;
        }

        let mut bytes = pkt.encode();
        let scripted_corrupt = match dir {
            Direction::ToA => take_one(&mut self.corrupt_to_a),
            Direction::ToB => take_one(&mut self.corrupt_to_b),
        };
        if scripted_corrupt || self.rng.random::<f64>() < self.config.corrupt_rate {
            corrupt_frame(&mut bytes, &mut self.rng);
            self.stats.frames_corrupted += 1;
            log::debug!("[net] frame seq={} corrupted in transit", pkt.seqnum);
        }

        let mut at = self.clock + self.config.latency + self.rng.random::<f64>() * self.config.jitter;
        let last = match dir {
            Direction::ToA => &mut self.last_arrival_to_a,
            Direction::ToB => &mut self.last_arrival_to_b,
        };
        // The channel is order preserving per direction: a later handoff may
        // not overtake an earlier one, whatever the jitter drew.
        if at <= *last {
            at = *last + 0.001;
        }
        *last = at;

        let kind = match dir {
            Direction::ToA => EventKind::ArriveAtA(bytes),
            Direction::ToB => EventKind::ArriveAtB(bytes),
        };
        self.push_event(at, kind);
    }
}

fn take_one(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

/// Flip one byte of an encoded frame, never the stored checksum field
/// (the last four header bytes), so the corruption is always detectable.
fn corrupt_frame(bytes: &mut [u8], rng: &mut StdRng) {
    debug_assert_eq!(bytes.len(), FRAME_LEN);
    let idx = rng.random_range(0..FRAME_LEN - 4);
    let idx = if idx >= HEADER_LEN - 4 { idx + 4 } else { idx };
    bytes[idx] ^= 0xff;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
