//! `selective-repeat` — Selective-Repeat ARQ over an unreliable one-way channel.
//!
//! # Architecture
//!
//! ```text
//!  application                              application
//!      │ send(message)                          ▲ deliver(payload)
//!      ▼                                        │
//!  ┌──────────┐    data packets     ┌───────────┴──┐
//!  │ SrSender │────────────────────▶│  SrReceiver  │
//!  └────┬─────┘                     └───────┬──────┘
//!       ▲             ACKs                  │
//!       └───────────────────────────────────┘
//!                        │
//!  ┌─────────────────────▼─────────────────────┐
//!  │                 Emulator                  │
//!  │  (virtual clock, delay, loss, corruption, │
//!  │   single retransmission timer)            │
//!  └───────────────────────────────────────────┘
//! ```
//!
//! Both endpoints are passive state machines: every handler runs to
//! completion when the channel invokes it and performs its side effects
//! through the [`channel::Channel`] trait. Nothing in the endpoints blocks,
//! spawns, or keeps time on its own.
//!
//! Each module has a single responsibility:
//! - [`packet`]   — wire format, additive checksum, corruption predicate
//! - [`seq`]      — sequence-number space and window arithmetic
//! - [`channel`]  — the service boundary between endpoints and the channel
//! - [`sender`]   — endpoint A: sliding window, selective ACKs, retransmission
//! - [`receiver`] — endpoint B: out-of-order buffer, in-order delivery
//! - [`sim`]      — discrete-event channel emulator for tests and the CLI

pub mod channel;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod seq;
pub mod sim;
