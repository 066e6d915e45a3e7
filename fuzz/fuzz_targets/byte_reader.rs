#![no_main]

use bytestream::ByteReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = ByteReader::new(data);
    while !reader.is_empty() {
        let selector = match reader.read_u8() {
            Ok(value) => value,
            Err(_) => break,
        };
        let ok = match selector % 6 {
            0 => reader.read_varu32().is_ok(),
            1 => reader.read_vars32().is_ok(),
            2 => reader.read_u32().is_ok(),
            3 => reader.read_f32().is_ok(),
            4 => reader.read_str(64).is_ok(),
            _ => reader.read_bytes(usize::from(selector) % 9).is_ok(),
        };
        if !ok {
            break;
        }
    }
    assert!(reader.position() <= data.len());
});
