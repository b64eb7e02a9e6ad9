//! The service boundary between the endpoints and the channel/scheduler.
//!
//! The endpoints never perform I/O or keep time themselves; every side
//! effect of an event handler goes through this trait, supplied by the
//! caller on each call. The discrete-event [`crate::sim::Emulator`]
//! implements it for real runs; unit tests substitute small recording fakes.
//!
//! # Contract
//!
//! - `transmit` hands a packet to an unreliable, order-preserving channel:
//!   it may be lost or corrupted in transit, but a later handoff never
//!   arrives before an earlier one in the same direction.
//! - At most one retransmission timer exists per sender endpoint. The
//!   endpoint must `cancel_timer` before arming a replacement; arming on
//!   top of a live timer is a contract violation the endpoints avoid by
//!   construction.
//! - `deliver` hands one reassembled in-order payload to the application.
//!   Only the receiver endpoint calls it, and only the sender endpoint
//!   touches the timer.

use crate::packet::{Packet, PAYLOAD_LEN};

/// Services the channel/scheduler provides to an endpoint.
pub trait Channel {
    /// Queue `packet` for (unreliable) transmission to the opposite endpoint.
    fn transmit(&mut self, packet: Packet);

    /// Arm the retransmission timer to fire after `duration` ticks.
    fn arm_timer(&mut self, duration: f64);

    /// Cancel the running retransmission timer.
    fn cancel_timer(&mut self);

    /// Hand a completed, in-order payload up to the application.
    fn deliver(&mut self, payload: [u8; PAYLOAD_LEN]);
}
