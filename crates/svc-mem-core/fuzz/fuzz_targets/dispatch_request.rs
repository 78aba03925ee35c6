#![no_main]

use libfuzzer_sys::fuzz_target;
use svc_mem_core::{
    dispatch, validate_bounds, Address, AbortControl, Command, IoBuffer, IoInfo, IoRequest,
    RomBank, SimulatedPlatform, Unit, DEFAULT_REGION_TABLE, SCRATCH_SIZE, SCRATCH_START,
};

fn word(data: &[u8], at: usize) -> u32 {
    let mut bytes = [0; 4];
    for (lane, byte) in bytes.iter_mut().zip(data.iter().skip(at)) {
        *lane = *byte;
    }
    u32::from_be_bytes(bytes)
}

fn buffer(addr: u32, len: u32, present: bool) -> IoBuffer {
    IoBuffer {
        addr: present.then_some(Address(addr)),
        len: len as i32,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 24 {
        return;
    }

    let mut sim = SimulatedPlatform::new();
    sim.map(SCRATCH_START, SCRATCH_SIZE);
    sim.install_rom(RomBank::Bank1, &data[..64.min(data.len())]);
    sim.install_rom(RomBank::Bank2, data);
    let before = sim.abort_handler();

    let flags = data[2];
    let info = IoInfo {
        command: data[0] % 4,
        unit: data[1] % 10,
        options: u32::from(flags & 1),
        offset: word(data, 4) as i32,
        send: buffer(word(data, 8), word(data, 12) % 4096, flags & 2 == 0),
        recv: buffer(word(data, 16), word(data, 20) % 4096, flags & 4 == 0),
    };
    let mut request = IoRequest::new(info);
    dispatch(&mut sim, &DEFAULT_REGION_TABLE, &mut request);

    assert_eq!(sim.abort_handler(), before);
    assert!(request.error_code() <= 0);

    if request.error.is_some() {
        return;
    }
    let len = match Command::from_raw(info.command) {
        Some(Command::Read) => info.recv.len,
        Some(Command::Write) => info.send.len,
        Some(Command::Status) | None => return,
    };
    let region = Unit::from_raw(info.unit).and_then(|unit| DEFAULT_REGION_TABLE.lookup(unit));
    if let Some(region) = region {
        assert_eq!(
            validate_bounds(region.size_bytes, info.width(), info.offset, len),
            Ok(()),
            "accepted request must lie inside its region"
        );
    }
});
