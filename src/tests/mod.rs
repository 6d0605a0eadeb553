mod config;
mod connection;
mod endpoint;
mod enums;
mod rng;
mod utils;

use crate::UpdateJobArgs;

#[test]
/// every SSID and flag combination survives the pack/unpack round trip
fn test_update_job_args_round_trip() {
    for ssid in 1..=u16::MAX {
        for reconnect_required in [false, true] {
            let args = UpdateJobArgs::new(ssid, reconnect_required);
            assert_eq!(UpdateJobArgs::decode(args.encode()), args);
        }
    }
}

#[test]
fn test_update_job_args_bit_layout() {
    // SSID in the low 16 bits, the reconnect flag on bit 16
    let raw = UpdateJobArgs::new(42, true).encode();
    assert_eq!(raw & 0xffff, 42);
    assert_ne!(raw & (1 << 16), 0);
    let args = UpdateJobArgs::decode(raw);
    assert_eq!(args.ssid, 42);
    assert!(args.reconnect_required);

    assert_eq!(UpdateJobArgs::new(42, false).encode(), 42);
}

#[test]
fn test_logging_initializes_once() {
    crate::logging::init_logging("debug").expect("the first init should work");
    // a second subscriber must be refused, not silently swapped in
    assert!(crate::logging::init_logging("debug").is_err());
}
