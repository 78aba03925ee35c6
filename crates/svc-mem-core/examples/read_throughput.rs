//! Read throughput harness for the driver's copy paths.
//!
//! Compares plain RAM reads with fault-tolerant ROM reads at several abort
//! densities, all through full request dispatch.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p svc-mem-core --example read_throughput --release
//! ```

#![allow(clippy::pedantic)]

use std::time::{Duration, Instant};

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use svc_mem_core::{
    Command, Device, IoBuffer, IoInfo, RomBank, SimulatedPlatform, SvcMemDriver, Unit, Width,
    ROM1_START, SCRATCH_START,
};
use thiserror as _;
use tracing as _;

const ELEMENTS: i32 = 16 * 1024;
const ROUNDS: u32 = 20;

fn measure(driver: &mut SvcMemDriver<SimulatedPlatform>, info: IoInfo) -> Duration {
    let start = Instant::now();
    for _ in 0..ROUNDS {
        let request = driver.do_io(info);
        assert_eq!(request.error_code(), 0, "request failed: {:?}", request.error);
    }
    start.elapsed()
}

fn report(label: &str, elapsed: Duration) {
    let elements = f64::from(ELEMENTS) * f64::from(ROUNDS);
    let per_second = elements / elapsed.as_secs_f64();
    println!("{label:<28} {elapsed:>12.3?}  {per_second:>14.0} elements/s");
}

fn main() {
    let mut driver = SvcMemDriver::new(SimulatedPlatform::stock());
    let ram = IoInfo::new(Command::Read, Unit::Ram)
        .with_width(Width::Word)
        .with_recv(IoBuffer::new(SCRATCH_START, ELEMENTS));
    report("ram words (raw)", measure(&mut driver, ram));

    for stride in [0_u32, 64, 8, 1] {
        let mut sim = SimulatedPlatform::stock();
        let image: Vec<u8> = (0..ELEMENTS as usize * 4).map(|i| (i % 251) as u8).collect();
        sim.install_rom(RomBank::Bank1, &image);
        if stride > 0 {
            for index in (0..ELEMENTS as u32).step_by(stride as usize) {
                sim.inject_abort(ROM1_START.wrapping_add(index * 4));
            }
        }
        let mut driver = SvcMemDriver::new(sim);
        let rom = IoInfo::new(Command::Read, Unit::RomBank1)
            .with_width(Width::Word)
            .with_recv(IoBuffer::new(SCRATCH_START, ELEMENTS));
        let label = if stride == 0 {
            "rom words, no aborts".to_string()
        } else {
            format!("rom words, 1 abort per {stride}")
        };
        report(&label, measure(&mut driver, rom));
    }
}
