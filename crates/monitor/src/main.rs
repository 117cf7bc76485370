//! CLI entry point for the Tiny16 machine monitor.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use monitor::{demo_program, format_memory, format_registers};
use vm_core::{Cpu, Memory, Register, StepOutcome};

const USAGE_TEXT: &str = "\
Usage: tiny16-mon [options] [image]

Runs a raw bytecode image on the Tiny16 virtual machine, stepping one
instruction per line read from stdin and dumping machine state after each
step. Without an image the bundled demonstration program is loaded.

Options:
  -w, --watch <addr>   Also dump memory at <addr> (hex) after each step
  -h, --help           Show this help message

Examples:
  tiny16-mon
  tiny16-mon program.bin
  tiny16-mon --watch 0xffd4 program.bin
";

const MEMORY_SIZE: usize = 0x1_0000;
const IP_VIEW_BYTES: usize = 8;
const STACK_VIEW_ADDR: u16 = 0xFFD4;
const STACK_VIEW_BYTES: usize = 44;

#[derive(Debug, PartialEq, Eq)]
struct MonitorArgs {
    image: Option<PathBuf>,
    watch: Option<u16>,
}

#[derive(Debug)]
enum ParseResult {
    Run(MonitorArgs),
    Help,
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut image: Option<PathBuf> = None;
    let mut watch: Option<u16> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "-w" || arg == "--watch" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --watch".to_string())?;
            watch = Some(parse_hex_addr(&value.to_string_lossy())?);
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if image.is_some() {
            return Err("multiple image paths provided".to_string());
        }
        image = Some(PathBuf::from(arg));
    }

    Ok(ParseResult::Run(MonitorArgs { image, watch }))
}

fn parse_hex_addr(text: &str) -> Result<u16, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    u16::from_str_radix(digits, 16).map_err(|_| format!("invalid address: {text}"))
}

fn load_image(path: &Path) -> Result<Vec<u8>, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;

    if bytes.len() > MEMORY_SIZE {
        return Err(format!(
            "image {} is {} bytes, larger than memory ({MEMORY_SIZE} bytes)",
            path.display(),
            bytes.len()
        ));
    }
    Ok(bytes)
}

fn dump_state(cpu: &Cpu, watch: Option<u16>) {
    print!("{}", format_registers(cpu));

    let ip = cpu.registers().get(Register::Ip);
    match format_memory(cpu, ip, IP_VIEW_BYTES) {
        Ok(line) => println!("{line}"),
        Err(e) => println!("(code view unavailable: {e})"),
    }
    match format_memory(cpu, STACK_VIEW_ADDR, STACK_VIEW_BYTES) {
        Ok(line) => println!("{line}"),
        Err(e) => println!("(stack view unavailable: {e})"),
    }
    if let Some(addr) = watch {
        match format_memory(cpu, addr, IP_VIEW_BYTES) {
            Ok(line) => println!("{line}"),
            Err(e) => println!("(watch view unavailable: {e})"),
        }
    }
    println!();
}

fn run_monitor(args: &MonitorArgs) -> Result<(), i32> {
    let image = match &args.image {
        Some(path) => match load_image(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("error: {e}");
                return Err(1);
            }
        },
        None => demo_program(),
    };

    let mut memory = Memory::new(MEMORY_SIZE);
    if let Err(e) = memory.load(0, &image) {
        eprintln!("error: failed to load image: {e}");
        return Err(1);
    }
    let mut cpu = Cpu::new(memory);

    dump_state(&cpu, args.watch);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if line.is_err() {
            break;
        }

        match cpu.step() {
            Ok(StepOutcome::Executed(_)) => {}
            Ok(StepOutcome::UnknownOpcode { opcode, addr }) => {
                eprintln!("unknown opcode {opcode:#04x} at {addr:#06x}; halting");
                dump_state(&cpu, args.watch);
                return Ok(());
            }
            Err(e) => {
                eprintln!("error: {e}");
                return Err(1);
            }
        }

        dump_state(&cpu, args.watch);
    }

    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run_monitor(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
