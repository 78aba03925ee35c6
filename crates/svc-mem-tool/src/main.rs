//! CLI entry point for the `svc-mem` host tool.
//!
//! Boots the driver against a simulated platform populated from image files
//! and issues one request per invocation.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use svc_mem_core::{
    Address, Command as IoCommand, Device, DriverError, IoBuffer, IoInfo, Region, RegionBase,
    RomBank, SimulatedPlatform, SvcMemDriver, Unit, Width, WidthPolicy, CONFIG_RAM_SIZE,
    DEFAULT_REGION_TABLE, RAM_SIZE, RAM_START, SCRATCH_SIZE, SCRATCH_START, VIDEO_RAM_SIZE,
    VIDEO_RAM_START,
};
#[cfg(test)]
use tempfile as _;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: svc-mem <command> [options]

Commands:
  read  <unit> [--offset N] [--len N] [--words]   Read elements and print a hex dump
  write <unit> --data HEX [--offset N] [--words]  Write bytes from HEX into the unit
  units                                           List units and their regions

Units:
  ram vram rom1 rom2 nvram ctrl-a ctrl-b ctrl-c

Image options:
  --ram <file>      Load general RAM from file
  --vram <file>     Load video RAM from file
  --rom1 <file>     Install ROM bank 1 from file
  --rom2 <file>     Install ROM bank 2 from file
  --nvram <file>    Load configuration RAM from file (one byte per slot)
  --abort <addr>    Make bus accesses at addr raise a data abort (repeatable)
  --no-rom2         Make the ROM bank 2 base query fail

Options:
  --offset <n>      Element offset into the unit (default 0)
  --len <n>         Elements to read (default 16)
  --words           Use 32-bit elements instead of bytes
  -v, --verbose     Log driver activity to stderr
  -h, --help        Show this help message

Numbers accept decimal or 0x-prefixed hex.

Examples:
  svc-mem read rom1 --rom1 bios.bin --len 64
  svc-mem read ctrl-b --words --len 4
  svc-mem write ram --data deadbeef --offset 0x100
";

const DEFAULT_READ_LEN: i32 = 16;
const DUMP_LINE_BYTES: usize = 16;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Read(ReadArgs),
    Write(WriteArgs),
    Units,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImageArgs {
    ram: Option<PathBuf>,
    vram: Option<PathBuf>,
    rom1: Option<PathBuf>,
    rom2: Option<PathBuf>,
    nvram: Option<PathBuf>,
    aborts: Vec<Address>,
    no_rom2: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct ReadArgs {
    unit: Unit,
    offset: i32,
    len: i32,
    width: Width,
    image: ImageArgs,
}

#[derive(Debug, PartialEq, Eq)]
struct WriteArgs {
    unit: Unit,
    offset: i32,
    width: Width,
    data: Vec<u8>,
    image: ImageArgs,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "read" => parse_read_args(args)
            .map(Command::Read)
            .map(ParseResult::Command),
        "write" => parse_write_args(args)
            .map(Command::Write)
            .map(ParseResult::Command),
        "units" => match args.next() {
            None => Ok(ParseResult::Command(Command::Units)),
            Some(arg) => Err(format!("unexpected argument: {}", arg.to_string_lossy())),
        },
        other => Err(format!("unknown command: {other}")),
    }
}

/// Options shared by `read` and `write`, collected in one pass.
#[derive(Debug, Default)]
struct RequestOptions {
    unit: Option<Unit>,
    offset: i32,
    len: Option<i32>,
    width: Width,
    data: Option<Vec<u8>>,
    image: ImageArgs,
}

#[allow(clippy::while_let_on_iterator)]
fn parse_request_options(
    mut args: impl Iterator<Item = OsString>,
) -> Result<RequestOptions, String> {
    let mut options = RequestOptions::default();

    while let Some(arg) = args.next() {
        let flag = arg.to_string_lossy().to_string();
        let mut value = |name: &str| {
            args.next()
                .map(|v| v.to_string_lossy().to_string())
                .ok_or_else(|| format!("missing value for {name}"))
        };

        match flag.as_str() {
            "--help" | "-h" => return Err(USAGE_TEXT.to_string()),
            "--verbose" | "-v" => options.image.verbose = true,
            "--words" => options.width = Width::Word,
            "--no-rom2" => options.image.no_rom2 = true,
            "--offset" => options.offset = parse_i32(&value("--offset")?)?,
            "--len" => options.len = Some(parse_i32(&value("--len")?)?),
            "--data" => options.data = Some(parse_hex(&value("--data")?)?),
            "--abort" => options.image.aborts.push(Address(parse_u32(&value("--abort")?)?)),
            "--ram" => options.image.ram = Some(PathBuf::from(value("--ram")?)),
            "--vram" => options.image.vram = Some(PathBuf::from(value("--vram")?)),
            "--rom1" => options.image.rom1 = Some(PathBuf::from(value("--rom1")?)),
            "--rom2" => options.image.rom2 = Some(PathBuf::from(value("--rom2")?)),
            "--nvram" => options.image.nvram = Some(PathBuf::from(value("--nvram")?)),
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            name => {
                if options.unit.is_some() {
                    return Err("multiple units provided".to_string());
                }
                let unit = Unit::from_name(name).ok_or_else(|| format!("unknown unit: {name}"))?;
                options.unit = Some(unit);
            }
        }
    }

    Ok(options)
}

fn parse_read_args(args: impl Iterator<Item = OsString>) -> Result<ReadArgs, String> {
    let options = parse_request_options(args)?;
    if options.data.is_some() {
        return Err("--data is only valid for write".to_string());
    }
    let unit = options.unit.ok_or_else(|| "missing unit".to_string())?;
    Ok(ReadArgs {
        unit,
        offset: options.offset,
        len: options.len.unwrap_or(DEFAULT_READ_LEN),
        width: options.width,
        image: options.image,
    })
}

fn parse_write_args(args: impl Iterator<Item = OsString>) -> Result<WriteArgs, String> {
    let options = parse_request_options(args)?;
    if options.len.is_some() {
        return Err("--len is only valid for read; write length comes from --data".to_string());
    }
    let unit = options.unit.ok_or_else(|| "missing unit".to_string())?;
    let data = options.data.ok_or_else(|| "missing --data".to_string())?;
    if options.width == Width::Word && data.len() % 4 != 0 {
        return Err("--data must be a whole number of words with --words".to_string());
    }
    Ok(WriteArgs {
        unit,
        offset: options.offset,
        width: options.width,
        data,
        image: options.image,
    })
}

fn parse_number(text: &str) -> Result<i64, String> {
    let (negative, digits) = text
        .strip_prefix('-')
        .map_or((false, text), |rest| (true, rest));
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| format!("invalid number: {text}"))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_i32(text: &str) -> Result<i32, String> {
    i32::try_from(parse_number(text)?).map_err(|_| format!("number out of range: {text}"))
}

fn parse_u32(text: &str) -> Result<u32, String> {
    u32::try_from(parse_number(text)?).map_err(|_| format!("number out of range: {text}"))
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text
        .strip_prefix("0x")
        .unwrap_or(text)
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .collect();
    if digits.is_empty() || digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(format!("hex data must be a non-empty even number of digits: {text}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|at| {
            u8::from_str_radix(&digits[at..at + 2], 16)
                .map_err(|_| format!("invalid hex data: {text}"))
        })
        .collect()
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_image(path: &Path, limit: u32, what: &str) -> Result<Vec<u8>, String> {
    let bytes = fs::read(path)
        .map_err(|e| format!("failed to read {what} image {}: {e}", path.display()))?;
    if !u32::try_from(bytes.len()).is_ok_and(|len| len <= limit) {
        return Err(format!(
            "{what} image {} is {} bytes; the region holds {limit}",
            path.display(),
            bytes.len()
        ));
    }
    debug!(path = %path.display(), bytes = bytes.len(), what, "loaded image");
    Ok(bytes)
}

fn build_platform(image: &ImageArgs) -> Result<SimulatedPlatform, String> {
    let mut sim = SimulatedPlatform::stock();

    if let Some(path) = &image.ram {
        sim.load(RAM_START, &read_image(path, RAM_SIZE, "ram")?);
    }
    if let Some(path) = &image.vram {
        sim.load(VIDEO_RAM_START, &read_image(path, VIDEO_RAM_SIZE, "vram")?);
    }
    if let Some(path) = &image.rom1 {
        sim.install_rom(RomBank::Bank1, &read_image(path, u32::MAX, "rom1")?);
    }
    if let Some(path) = &image.rom2 {
        sim.install_rom(RomBank::Bank2, &read_image(path, u32::MAX, "rom2")?);
    }
    if let Some(path) = &image.nvram {
        sim.load_config_ram(&read_image(path, CONFIG_RAM_SIZE, "nvram")?);
    }
    for addr in &image.aborts {
        sim.inject_abort(*addr);
    }
    sim.fail_rom2_query(image.no_rom2);

    Ok(sim)
}

fn staged_bytes(len: i32, width: Width) -> Result<usize, String> {
    let bytes = u32::try_from(len)
        .ok()
        .and_then(|len| len.checked_mul(width.bytes()))
        .filter(|bytes| *bytes <= SCRATCH_SIZE)
        .ok_or_else(|| {
            format!("length {len} does not fit the {SCRATCH_SIZE}-byte staging buffer")
        })?;
    usize::try_from(bytes).map_err(|e| e.to_string())
}

fn report_driver_error(error: DriverError) -> i32 {
    eprintln!("error: {error} (code {})", error.code());
    1
}

fn run_read(args: &ReadArgs) -> Result<(), i32> {
    let staged = match staged_bytes(args.len, args.width) {
        Ok(bytes) => bytes,
        Err(error) => {
            eprintln!("error: {error}");
            return Err(1);
        }
    };
    let platform = build_platform(&args.image).map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;

    let mut driver = SvcMemDriver::new(platform);
    driver.init();
    let info = IoInfo::new(IoCommand::Read, args.unit)
        .with_width(args.width)
        .with_offset(args.offset)
        .with_recv(IoBuffer::new(SCRATCH_START, args.len));
    let request = driver.do_io(info);
    request.result().map_err(report_driver_error)?;

    let bytes = driver.platform().peek_bytes(SCRATCH_START, staged);
    let base = i64::from(args.offset) * i64::from(args.width.bytes());
    for line in hex_dump(base, &bytes) {
        println!("{line}");
    }
    Ok(())
}

fn run_write(args: &WriteArgs) -> Result<(), i32> {
    let mut platform = build_platform(&args.image).map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;
    let staged = u32::try_from(args.data.len())
        .ok()
        .filter(|len| *len <= SCRATCH_SIZE)
        .ok_or_else(|| {
            eprintln!("error: --data does not fit the {SCRATCH_SIZE}-byte staging buffer");
            1
        })?;
    platform.load(SCRATCH_START, &args.data);

    let mut driver = SvcMemDriver::new(platform);
    driver.init();
    let len = i32::try_from(staged / args.width.bytes()).map_err(|_| 1)?;
    let info = IoInfo::new(IoCommand::Write, args.unit)
        .with_width(args.width)
        .with_offset(args.offset)
        .with_send(IoBuffer::new(SCRATCH_START, len));
    let actual = driver.do_io(info).result().map_err(report_driver_error)?;

    println!(
        "wrote {actual} element(s) to {} at offset {}",
        args.unit.name(),
        args.offset
    );
    Ok(())
}

fn hex_dump(base: i64, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(DUMP_LINE_BYTES)
        .zip((base..).step_by(DUMP_LINE_BYTES))
        .map(|(chunk, offset)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            format!("{offset:08x}: {}", hex.join(" "))
        })
        .collect()
}

fn describe_region(region: &Region) -> String {
    let base = match region.base {
        RegionBase::Fixed(addr) => addr.to_string(),
        RegionBase::QueriedRomBank2 => "queried".to_string(),
    };
    let width = match region.width {
        WidthPolicy::Any => "byte/word",
        WidthPolicy::WordOnly => "word",
        WidthPolicy::ByteOnly => "byte",
    };
    let access = if region.writable { "rw" } else { "ro" };
    let probe = if region.fault_prone { " fault-tolerant" } else { "" };
    format!(
        "{:<7} {} {:<10} {:>8}  {:<9} {access}{probe}",
        region.unit.name(),
        region.unit.as_raw(),
        base,
        region.size_bytes,
        width
    )
}

fn run_units() {
    println!("{:<7} # {:<10} {:>8}  {:<9} access", "unit", "base", "bytes", "width");
    println!("{:<7} {} caller-supplied source and destination", Unit::NoUnit.name(), 0);
    for region in DEFAULT_REGION_TABLE.iter() {
        println!("{}", describe_region(region));
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Read(args))) => {
            init_tracing(args.image.verbose);
            match run_read(&args) {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Ok(ParseResult::Command(Command::Write(args))) => {
            init_tracing(args.image.verbose);
            match run_write(&args) {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Ok(ParseResult::Command(Command::Units)) => {
            run_units();
            0
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
