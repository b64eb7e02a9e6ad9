//! Integration tests for the Selective-Repeat protocol over the emulator.
//!
//! Each test builds one [`Emulator`] holding both endpoints and drives it to
//! quiescence, scripting faults against individual frames where the scenario
//! calls for it. The emulator is seeded, so every run is reproducible.

use selective_repeat::packet::{Message, PAYLOAD_LEN};
use selective_repeat::sender::WindowFull;
use selective_repeat::seq::SequenceSpace;
use selective_repeat::sim::{Emulator, SimConfig};

/// Fresh fault-free emulator over the default W=6, S=13 space.
fn emulator() -> Emulator {
    Emulator::new(SequenceSpace::new(13, 6).unwrap(), SimConfig::default())
}

/// Payload for the `i`th message: its index repeated across the block.
fn msg(i: u8) -> Message {
    Message::new([i; PAYLOAD_LEN])
}

fn payload(i: u8) -> [u8; PAYLOAD_LEN] {
    [i; PAYLOAD_LEN]
}

// ---------------------------------------------------------------------------
// Scenario A: basic transfer, no faults
// ---------------------------------------------------------------------------

#[test]
fn basic_transfer_fills_and_drains_the_window() {
    let mut emu = emulator();

    for i in 0..6 {
        emu.send(msg(i)).expect("window has room for W messages");
    }
    emu.run_until_idle();

    let expected: Vec<_> = (0..6).map(payload).collect();
    assert_eq!(emu.delivered(), expected.as_slice());
    assert_eq!(emu.a.send_base(), 6, "window must slide past every ACK");
    assert_eq!(emu.a.in_flight(), 0);
    assert_eq!(emu.b.recv_base(), 6);
    assert_eq!(emu.a.stats.packets_resent, 0, "clean channel, no resends");
}

// ---------------------------------------------------------------------------
// Scenario B: selective loss — one data packet dropped
// ---------------------------------------------------------------------------

#[test]
fn lost_packet_holds_back_buffered_successors() {
    let mut emu = emulator();

    emu.send(msg(0)).unwrap();
    emu.drop_next_to_b(1); // the frame carrying M1 never arrives
    emu.send(msg(1)).unwrap();
    emu.send(msg(2)).unwrap();
    emu.send(msg(3)).unwrap();

    // Before the retransmission timer can fire: M0 is delivered, M2 and M3
    // sit in the out-of-order buffer behind the M1 hole.
    emu.run_until(12.0);
    assert_eq!(emu.delivered(), &[payload(0)]);
    assert_eq!(emu.b.buffered(), 2);
    assert_eq!(emu.a.send_base(), 1, "only M0's slot may have slid");
    assert_eq!(emu.a.in_flight(), 3);

    // The timeout retransmits M1 and the whole run drains contiguously.
    emu.run_until_idle();
    let expected: Vec<_> = (0..4).map(payload).collect();
    assert_eq!(emu.delivered(), expected.as_slice());
    assert_eq!(emu.a.send_base(), 4);
    assert_eq!(emu.a.in_flight(), 0);
    assert_eq!(emu.a.stats.packets_resent, 1);
    assert_eq!(emu.b.stats.delivered, 4);
}

// ---------------------------------------------------------------------------
// Scenario C: ACK loss — receiver must re-ACK without re-delivering
// ---------------------------------------------------------------------------

#[test]
fn lost_ack_triggers_reack_but_never_redelivery() {
    let mut emu = emulator();

    emu.drop_next_to_a(1); // M0's ACK is lost on the way back
    emu.send(msg(0)).unwrap();
    emu.run_until_idle();

    // Delivered exactly once, despite the sender retransmitting M0.
    assert_eq!(emu.delivered(), &[payload(0)]);
    assert_eq!(emu.b.stats.delivered, 1);
    assert_eq!(emu.b.stats.duplicates, 1, "the retransmission is a stale duplicate");
    assert!(emu.a.stats.packets_resent >= 1);
    assert_eq!(emu.a.send_base(), 1, "the re-ACK must unblock the sender");
    assert_eq!(emu.a.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Scenario D: corruption — detected, not delivered, not acknowledged
// ---------------------------------------------------------------------------

#[test]
fn corrupted_packet_is_dropped_without_ack_then_recovered() {
    let mut emu = emulator();

    emu.corrupt_next_to_b(1);
    emu.send(msg(0)).unwrap();

    // Before the timer fires: the corrupted copy produced nothing at all.
    emu.run_until(12.0);
    assert_eq!(emu.delivered().len(), 0);
    assert_eq!(emu.b.stats.corrupted, 1);
    assert_eq!(emu.b.stats.acks_sent, 0, "corrupted frames earn no ACK");

    // The retransmission gets through.
    emu.run_until_idle();
    assert_eq!(emu.delivered(), &[payload(0)]);
    assert_eq!(emu.a.stats.packets_resent, 1);
}

#[test]
fn corrupted_ack_is_ignored_and_recovered() {
    let mut emu = emulator();

    emu.corrupt_next_to_a(1);
    emu.send(msg(0)).unwrap();
    emu.run_until_idle();

    assert_eq!(emu.delivered(), &[payload(0)]);
    assert_eq!(emu.a.send_base(), 1);
    assert_eq!(emu.a.stats.packets_resent, 1, "recovery is timeout driven");
    // The corrupted copy of the ACK must not have been counted; only the
    // receiver's re-ACK of the retransmission gets through.
    assert_eq!(emu.a.stats.acks_received, 1);
    assert_eq!(emu.a.stats.new_acks, 1);
    assert_eq!(emu.b.stats.duplicates, 1);
}

// ---------------------------------------------------------------------------
// Admission control at the sender
// ---------------------------------------------------------------------------

#[test]
fn seventh_message_is_refused_until_the_window_slides() {
    let mut emu = emulator();

    for i in 0..6 {
        emu.send(msg(i)).unwrap();
    }
    assert_eq!(emu.send(msg(6)), Err(WindowFull));
    assert_eq!(emu.a.stats.window_full, 1);

    // After the transfer completes there is room again.
    emu.run_until_idle();
    emu.send(msg(6)).expect("window slid, message must be accepted");
    emu.run_until_idle();

    let expected: Vec<_> = (0..7).map(payload).collect();
    assert_eq!(emu.delivered(), expected.as_slice());
}

// ---------------------------------------------------------------------------
// Sequence-number wraparound under sustained traffic
// ---------------------------------------------------------------------------

#[test]
fn long_transfer_wraps_the_sequence_space() {
    let mut emu = emulator();

    // 30 messages walk the 13-wide sequence space twice and a bit.
    for i in 0..30 {
        emu.schedule_send(6.0 * f64::from(i), msg(i as u8));
    }
    emu.run_until_idle();

    let expected: Vec<_> = (0..30).map(|i| payload(i as u8)).collect();
    assert_eq!(emu.delivered(), expected.as_slice());
    assert_eq!(emu.a.send_base(), 30 % 13);
    assert_eq!(emu.b.recv_base(), 30 % 13);
    assert_eq!(emu.a.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Soak: heavy loss and corruption, several seeds
// ---------------------------------------------------------------------------

/// Push `total` messages through a heavily impaired channel as fast as the
/// window allows, and require a perfect in-order transcript at the far end.
fn soak(seed: u64, total: u8) {
    let config = SimConfig {
        loss_rate: 0.2,
        corrupt_rate: 0.1,
        seed,
        ..SimConfig::default()
    };
    let mut emu = Emulator::new(SequenceSpace::new(13, 6).unwrap(), config);

    let mut sent = 0u8;
    while sent < total {
        if emu.send(msg(sent)).is_ok() {
            sent += 1;
        } else {
            // Window full: process one event so an ACK can open a slot.
            assert!(emu.step(), "window full but the emulator is idle");
        }
    }
    emu.run_until_idle();

    let expected: Vec<_> = (0..total).map(payload).collect();
    assert_eq!(
        emu.delivered(),
        expected.as_slice(),
        "seed {seed}: transcript must be complete, ordered, duplicate-free"
    );
    assert_eq!(emu.a.in_flight(), 0);
    assert!(emu.stats.frames_lost > 0, "seed {seed}: soak never saw a loss");
}

#[test]
fn lossy_soak_delivers_everything_in_order() {
    for seed in [7, 42, 1234, 0xdead_beef] {
        soak(seed, 40);
    }
}
