//! Entry point for `selective-repeat`.
//!
//! Parses CLI arguments, runs one simulated transfer over the lossy channel
//! emulator, and prints a summary report. All protocol work is delegated to
//! library modules; `main.rs` owns only process setup (logging, argument
//! parsing) and the traffic generator.

use clap::Parser;

use selective_repeat::packet::{Message, PAYLOAD_LEN};
use selective_repeat::seq::{SequenceSpace, SEQ_SPACE, WINDOW_SIZE};
use selective_repeat::sim::{Emulator, SimConfig};

/// Selective-Repeat ARQ transfer over a simulated unreliable channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of application messages to transfer.
    #[arg(short, long, default_value_t = 20)]
    messages: u32,

    /// Ticks between consecutive application messages.
    #[arg(short, long, default_value_t = 6.0)]
    interval: f64,

    /// Probability that a frame is lost in transit.
    #[arg(short, long, default_value_t = 0.1)]
    loss: f64,

    /// Probability that a frame is corrupted in transit.
    #[arg(short, long, default_value_t = 0.1)]
    corrupt: f64,

    /// Seed for the emulator's random number generator.
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Sender/receiver window size W.
    #[arg(short, long, default_value_t = WINDOW_SIZE)]
    window: u16,

    /// Sequence-space modulus S (must be at least 2W + 1).
    #[arg(long, default_value_t = SEQ_SPACE)]
    seq_space: u16,
}

fn main() {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let space = SequenceSpace::new(cli.seq_space, cli.window)?;
    let config = SimConfig {
        loss_rate: cli.loss,
        corrupt_rate: cli.corrupt,
        seed: cli.seed,
        ..SimConfig::default()
    };
    let mut emu = Emulator::new(space, config);

    log::info!(
        "transferring {} messages, W={} S={} loss={} corrupt={}",
        cli.messages,
        cli.window,
        cli.seq_space,
        cli.loss,
        cli.corrupt
    );

    for i in 0..cli.messages {
        emu.schedule_send(cli.interval * f64::from(i), payload_for(i));
    }
    emu.run_until_idle();

    println!("transfer finished at t={:.1}", emu.clock());
    println!();
    println!("sender   messages sent:    {}", emu.a.stats.messages_sent);
    println!("         window-full:      {}", emu.a.stats.window_full);
    println!("         ACKs received:    {}", emu.a.stats.acks_received);
    println!("         new ACKs:         {}", emu.a.stats.new_acks);
    println!("         packets resent:   {}", emu.a.stats.packets_resent);
    println!("receiver packets received: {}", emu.b.stats.packets_received);
    println!("         duplicates:       {}", emu.b.stats.duplicates);
    println!("         corrupted:        {}", emu.b.stats.corrupted);
    println!("         delivered:        {}", emu.b.stats.delivered);
    println!("         ACKs sent:        {}", emu.b.stats.acks_sent);
    println!("channel  frames sent:      {}", emu.stats.frames_sent);
    println!("         frames lost:      {}", emu.stats.frames_lost);
    println!("         frames corrupted: {}", emu.stats.frames_corrupted);

    let delivered = emu.delivered();
    println!();
    println!(
        "{} of {} messages delivered in order",
        delivered.len(),
        emu.a.stats.messages_sent
    );
    Ok(())
}

/// Payload for the `i`th generated message: the message letter repeated,
/// cycling through the alphabet.
fn payload_for(i: u32) -> Message {
    let letter = b'a' + (i % 26) as u8;
    Message::new([letter; PAYLOAD_LEN])
}
