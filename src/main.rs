//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run a program image or ASM file
//! - `ls8-emu debug <program>` - Interactive debugger
//! - `ls8-emu asm <source>` - Assemble to a program image
//! - `ls8-emu disasm <program>` - Disassemble a program image
//! - `ls8-emu test` - Run the bundled sample programs

use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::io::Write;
use std::process;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the LS-8, a small 8-bit register machine")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program image (.ls8) or ASM file to execute
        program: String,
        /// Stop after this many cycles (default: run until HLT)
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print a trace line to stderr before every cycle
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the program image or ASM file to debug
        program: String,
    },
    /// Assemble source to a program image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a program image to readable text
    Disasm {
        /// Path to the program image
        program: String,
    },
    /// Run the bundled sample programs and check their output
    Test,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logging: {}", e);
    }

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json }) => {
            run_program(&program, max_cycles, trace, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("LS-8 Emulator v0.1.0");
            println!("Use --help for available commands");
        }
    }
}

/// Load a program image or assemble an `.asm` file.
///
/// A missing file exits with status 2, any other failure with status 1.
fn load_or_exit(path: &str) -> Vec<u8> {
    use ls8::asm::read_source;
    use ls8::{assemble, parse_program, LoadError};

    let argv0 = std::env::args().next().unwrap_or_else(|| "ls8-emu".into());

    let source = match read_source(path) {
        Ok(source) => source,
        Err(e @ LoadError::NotFound { .. }) => {
            eprintln!("{}: {}", argv0, e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("{}: {}", argv0, e);
            process::exit(1);
        }
    };

    let parsed = if path.ends_with(".asm") {
        assemble(&source).map_err(|e| e.to_string())
    } else {
        parse_program(&source).map_err(|e| e.to_string())
    };

    match parsed {
        Ok(program) => {
            info!("loaded {} bytes from {}", program.len(), path);
            program
        }
        Err(message) => {
            eprintln!("{}: {}: {}", argv0, path, message);
            process::exit(1);
        }
    }
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, json: bool) {
    use ls8::{trace_line, Cpu};

    let program = load_or_exit(path);

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("Failed to load program: {}", e);
        process::exit(1);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let limit = max_cycles.unwrap_or(u64::MAX);

    let result = cpu.run_observed(limit, &mut out, |cpu| {
        if trace {
            eprintln!("{}", trace_line(cpu));
        }
    });
    let _ = out.flush();

    if let Err(e) = result {
        error!("CPU error at PC={:02X}: {}", cpu.regs.pc, e);
        process::exit(1);
    }

    if json {
        match cpu.snapshot_json() {
            Ok(snapshot) => println!("{}", snapshot),
            Err(e) => {
                eprintln!("Failed to serialize state: {}", e);
                process::exit(1);
            }
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use ls8::run_debugger;

    let program = load_or_exit(path);

    if let Err(e) = run_debugger(program) {
        eprintln!("Debugger error: {}", e);
        process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("This build has no debugger; rebuild with the `tui` feature.");
    process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::asm::save_image;

    let out_path = output.unwrap_or_else(|| {
        source_path.trim_end_matches(".asm").to_string() + ".ls8"
    });

    let program = load_or_exit(source_path);
    println!("Assembled {} bytes", program.len());

    if let Err(e) = save_image(&out_path, &program) {
        eprintln!("Failed to save image: {}", e);
        process::exit(1);
    }

    println!("Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    use ls8::disassemble;

    let program = load_or_exit(path);
    println!("{}", disassemble(&program));
}

fn run_self_test() {
    use ls8::{parse_program, Cpu};

    const PROGRAMS: [(&str, &str, &str); 3] = [
        ("print8", include_str!("../programs/print8.ls8"), "8\n"),
        ("mult", include_str!("../programs/mult.ls8"), "72\n"),
        ("stack", include_str!("../programs/stack.ls8"), "2\n4\n1\n"),
    ];

    println!("LS-8 self-test");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    for (name, source, expected) in PROGRAMS {
        print!("{}... ", name);

        let result = parse_program(source)
            .map_err(|e| e.to_string())
            .and_then(|program| {
                let mut cpu = Cpu::new();
                cpu.load_program(&program).map_err(|e| e.to_string())?;
                let mut out = Vec::new();
                cpu.run_with(&mut out).map_err(|e| e.to_string())?;
                Ok(String::from_utf8_lossy(&out).into_owned())
            });

        match result {
            Ok(output) if output == expected => {
                println!("ok");
                passed += 1;
            }
            Ok(output) => {
                println!("FAILED (got {:?}, expected {:?})", output, expected);
                failed += 1;
            }
            Err(e) => {
                println!("FAILED ({})", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        process::exit(1);
    }
}
