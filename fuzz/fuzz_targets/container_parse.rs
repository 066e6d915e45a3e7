#![no_main]

use codec::{flatten, parse_with_limits, ErrorKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let limits = wire::Limits::for_testing();

    match parse_with_limits(data, &limits) {
        Ok(tracker) => {
            // Anything that parses must survive a second trip unchanged.
            let bytes = flatten(&tracker).unwrap();
            let again = parse_with_limits(&bytes, &wire::Limits::unlimited()).unwrap();
            assert_eq!(again.measure(), tracker.measure());
        }
        Err(err) => assert_eq!(err.kind(), ErrorKind::CorruptData),
    }

    let _ = wire::decode_container(data, &limits);
});
