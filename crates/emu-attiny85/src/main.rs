//! ATtiny85 simulator binary.
//!
//! Runs a raw program image to the PC fixed point, then dumps registers
//! and stack to stdout. USI character output goes to stdout as the
//! program runs.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use emu_attiny85::{Attiny85, dump};

struct CliArgs {
    image: PathBuf,
    dump: bool,
    dump_memory: bool,
    debug: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut image = None;
    let mut dump = true;
    let mut dump_memory = false;
    let mut debug = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--no-dump" => dump = false,
            "--dump-memory" => dump_memory = true,
            "--break" => debug = true,
            "--help" | "-h" => {
                eprintln!("Usage: emu-attiny85 [OPTIONS] <image>");
                eprintln!();
                eprintln!("Runs a raw ATtiny85 program image until the program counter");
                eprintln!("reaches a fixed point (e.g. rjmp .-2).");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --no-dump        Skip the post-run register and stack dump");
                eprintln!("  --dump-memory    Also dump all data and program memory");
                eprintln!("  --break          Drop into the debugger on BREAK or stack collision");
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
            other => {
                if image.replace(PathBuf::from(other)).is_some() {
                    eprintln!("Pass a single input file.");
                    process::exit(1);
                }
            }
        }
    }

    let Some(image) = image else {
        eprintln!("Pass a single input file.");
        process::exit(1);
    };

    CliArgs {
        image,
        dump,
        dump_memory,
        debug,
    }
}

fn run_dumps(machine: &Attiny85, cli: &CliArgs) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.dump {
        dump::dump_registers(machine.cpu(), &mut out)?;
        dump::dump_stack(machine.cpu(), &mut out)?;
    }
    if cli.dump_memory {
        dump::dump_memory(machine.cpu(), &mut out)?;
    }
    out.flush()
}

fn main() {
    let cli = parse_args();

    let mut machine = Attiny85::new();
    if let Err(e) = machine.load_image_file(&cli.image) {
        eprintln!("{e}");
        process::exit(1);
    }
    machine.set_debug(cli.debug);

    machine.run_until_halt();

    if let Err(e) = run_dumps(&machine, &cli) {
        eprintln!("dump error: {e}");
        process::exit(1);
    }
}
