//! Basic Computer Simulator - CLI Entry Point
//!
//! Commands:
//! - `bcsim demo` - Walk through a fetch cycle, one micro-operation at a time
//! - `bcsim load <program> [--out <file>]` - Load a program image, list memory, optionally save it
//! - `bcsim disasm <program>` - Disassemble a program image
//! - `bcsim decode <word>` - Show the fields of an instruction word
//! - `bcsim script <events>` - Auto-run a JSON event list and print the result
//! - `bcsim share <snapshot>` / `bcsim unshare <token>` - Share tokens
//! - `bcsim test` - Built-in self-test

use clap::{Parser, Subcommand};
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use bcsim::isa::disasm::{disassemble_word, disassemble_words};
use bcsim::isa::word::decode;
use bcsim::{
    share, AutoRun, BusEvent, BusSource, InstructionWord, Machine, MachineEvent,
    MachineSnapshot, RegisterEvent, SimConfig, Unit,
};

#[derive(Parser)]
#[command(name = "bcsim")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "Micro-operation simulator for a simple 16-bit stored-program computer")]
struct Cli {
    /// JSON config file (signal duration, auto-run period)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through a fetch cycle
    Demo,
    /// Load a program image into memory and list the non-zero words
    Load {
        /// Path to the program file
        program: String,
        /// Write the resulting memory image back out as a program file
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Disassemble a program image
    Disasm {
        /// Path to the program file
        program: String,
    },
    /// Decode one instruction word (hex 0x, binary 0b, octal 0o or decimal)
    Decode {
        word: String,
    },
    /// Auto-run a JSON list of machine events and print the final snapshot
    Script {
        /// Path to a JSON array of events
        events: String,
        /// Program file to load before running
        #[arg(short, long)]
        program: Option<String>,
        /// Print a share token instead of JSON
        #[arg(short, long)]
        share: bool,
    },
    /// Turn a snapshot JSON file into a share token
    Share {
        snapshot: String,
    },
    /// Turn a share token back into snapshot JSON
    Unshare {
        token: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("❌ Failed to set up logging: {}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Demo) | None => run_demo(&config),
        Some(Commands::Load { program, out }) => load_file(&program, out.as_deref(), &config),
        Some(Commands::Disasm { program }) => disassemble_file(&program),
        Some(Commands::Decode { word }) => decode_word(&word),
        Some(Commands::Script { events, program, share }) => {
            run_script(&events, program.as_deref(), share, &config)
        }
        Some(Commands::Share { snapshot }) => share_file(&snapshot),
        Some(Commands::Unshare { token }) => unshare_token(&token),
        Some(Commands::Test) => run_self_test(),
    }
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG selects what gets printed; default to info.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn load_config(path: Option<&str>) -> SimConfig {
    match path {
        None => SimConfig::default(),
        Some(path) => match SimConfig::load(path) {
            Ok(config) => {
                event!(Level::INFO, "using config {}: {:?}", path, config);
                config
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn read_program(path: &str) -> bcsim::Program {
    match bcsim::load_program(path) {
        Ok(program) => {
            println!("📂 Loaded {} words from {}", program.len(), path);
            program
        }
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_demo(config: &SimConfig) {
    println!("━━━ Fetch cycle demo ━━━");
    println!();

    let mut m = Machine::with_config(config);
    let program = bcsim::isa::parse_program("0x000 LDA 0x004\n0x004 0x8001\n")
        .unwrap_or_default();
    m.load_program(&program);
    m.pc.load(0x000);

    // T0: AR <- PC
    m.dispatch(MachineEvent::Bus(BusEvent::Drive {
        source: BusSource::Pc,
        value: u64::from(m.pc.value()),
    }));
    show_step("T0", &m.bus.snapshot().last_operation);
    m.dispatch(MachineEvent::Ar(RegisterEvent::Load { value: u64::from(m.bus.value()) }));
    show_step("T0", m.ar.last_operation());
    m.dispatch(MachineEvent::Bus(BusEvent::Release));
    m.sc.increment();
    m.advance(config.signal_duration);

    // T1: IR <- M[AR], PC <- PC + 1
    let word = m.memory.read(u64::from(m.ar.value()));
    show_step("T1", m.memory.last_operation());
    m.dispatch(MachineEvent::Bus(BusEvent::Drive { source: BusSource::Mem, value: u64::from(word) }));
    m.dispatch(MachineEvent::Ir(RegisterEvent::Load { value: u64::from(m.bus.value()) }));
    show_step("T1", &m.ir.snapshot().register.last_operation);
    m.dispatch(MachineEvent::Pc(RegisterEvent::Increment));
    show_step("T1", &m.pc.snapshot().register.last_operation);
    m.dispatch(MachineEvent::Bus(BusEvent::Release));
    m.sc.increment();

    println!();
    println!(
        "IR = 0x{:04X}  opcode={:X} indirect={} address=0x{:03X}  ({})",
        m.ir.value(),
        m.ir.opcode(),
        m.ir.indirect(),
        m.ir.address(),
        disassemble_word(m.ir.value())
    );
    println!("PC = 0x{:03X}  SC = {}", m.pc.value(), m.sc.value());
    println!("Signals up: {}", m.is_signaling());
    m.advance(config.signal_duration);
    println!("Signals up after {} time units: {}", config.signal_duration, m.is_signaling());
}

fn show_step(step: &str, operation: &str) {
    println!("  {}: {}", step, operation);
}

fn load_file(path: &str, out: Option<&str>, config: &SimConfig) {
    let program = read_program(path);
    let mut m = Machine::with_config(config);
    m.load_program(&program);

    let words = m.memory.non_zero();
    println!();
    println!("{}", disassemble_words(&words));

    if let Some(out) = out {
        // Memory is 4096 words, so every index fits a 12-bit address.
        let image: bcsim::Program = words.iter().map(|&(a, w)| (a as u16, w)).collect();
        match bcsim::isa::save_program(out, &image) {
            Ok(()) => println!("💾 Saved {} words to {}", image.len(), out),
            Err(e) => {
                eprintln!("❌ Failed to save program: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn disassemble_file(path: &str) {
    let program = read_program(path);
    println!();
    println!("{}", bcsim::disassemble(&program));
}

fn decode_word(text: &str) {
    let value = match bcsim::input::parse_number(text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let word = InstructionWord(bcsim::mask(value, 16) as u16);
    println!("word     = 0x{:04X}", word.raw());
    println!("indirect = {}", u8::from(word.indirect()));
    println!("opcode   = {}", word.opcode());
    println!("address  = 0x{:03X}", word.address());
    match decode(word) {
        Ok(instr) => println!("instr    = {}", instr),
        Err(e) => println!("instr    = (data) {}", e),
    }
}

fn run_script(path: &str, program: Option<&str>, as_token: bool, config: &SimConfig) {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };
    let events = match MachineEvent::list_from_json(&text) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("❌ Invalid event script: {}", e);
            std::process::exit(1);
        }
    };

    let mut m = Machine::with_config(config);
    if let Some(program) = program {
        m.load_program(&read_program(program));
    }

    let mut run = AutoRun::from_config(config);
    run.enqueue(events);
    run.start();
    let elapsed = run.run_to_completion(&mut m);
    event!(Level::INFO, "injected {} events over {} time units", run.injected(), elapsed);

    let snapshot = m.snapshot();
    let rendered = if as_token {
        share::encode_share(&snapshot)
    } else {
        share::to_json_pretty(&snapshot)
    };
    match rendered {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn share_file(path: &str) {
    let result = std::fs::read_to_string(path)
        .map_err(bcsim::SimError::from)
        .and_then(|text| share::from_json::<MachineSnapshot>(&text))
        .and_then(|snapshot| share::encode_share(&snapshot));
    match result {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn unshare_token(token: &str) {
    match share::decode_share::<MachineSnapshot>(token) {
        Some(snapshot) => match share::to_json_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        None => println!("(no state)"),
    }
}

fn run_self_test() {
    use bcsim::arith;
    use bcsim::{Accumulator, Bus, Memory};

    println!("━━━ Basic Computer Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;
    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    check("Mask idempotence", (0..=16).all(|b| arith::mask(arith::mask(0xDEAD_BEEF, b), b) == arith::mask(0xDEAD_BEEF, b)));
    check("Complement 0x00FF", arith::complement(0x00FF, 16).value == 0xFF00);
    check("AND 0xFF00 & 0x0FF0", arith::and(0xFF00, 0x0FF0, 16).value == 0x0F00);

    let mut ac = Accumulator::new();
    ac.load(0x8000);
    check("Negative flag on 0x8000", ac.flags().negative && !ac.flags().zero);
    ac.load(0xFFFF);
    ac.increment();
    check("Increment wraparound", ac.value() == 0 && ac.flags().zero);

    let mut mem = Memory::new();
    mem.write(0xFFFF, 0x1234);
    check("Memory address aliasing", mem.read(0x0FFF) == 0x1234);

    let mut bus = Bus::new();
    bus.drive(BusSource::Ar, 1);
    bus.drive(BusSource::Pc, 2);
    let conflicted = bus.conflict();
    bus.release();
    bus.drive(BusSource::Pc, 2);
    check("Bus conflict detection", conflicted && !bus.conflict());

    ac.advance(bcsim::SIGNAL_DURATION);
    check("Signal auto-clear", ac.active_signal().is_none());

    let snapshot = Machine::new().snapshot();
    let token = share::encode_share(&snapshot).unwrap_or_default();
    check(
        "Snapshot share round trip",
        share::decode_share::<MachineSnapshot>(&token) == Some(snapshot),
    );

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
