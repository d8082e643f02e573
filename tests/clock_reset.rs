//! Clock reset behaviour. Lives in its own test binary because a reset
//! breaks ordering for anything stamped concurrently.

use framepipe::pipeline::clock;
use framepipe::{Packet, Port, Timestamp};
use serial_test::serial;

#[test]
#[serial(clock)]
fn test_reset_clears_last_issued() {
    let ts = Timestamp::now();
    assert!(clock::last_issued() >= ts);

    clock::reset();
    assert_eq!(clock::last_issued(), Timestamp::ZERO);

    // Wall clock is far past zero, so stamping resumes from it
    let after = Timestamp::now();
    assert!(after.as_micros() > 0);
    assert_eq!(clock::last_issued(), after);
}

#[test]
#[serial(clock)]
fn test_monotonic_after_reset() {
    clock::reset();
    let stamps: Vec<Timestamp> = (0..1000).map(|_| Timestamp::now()).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
#[serial(clock)]
fn test_port_watermark_survives_reset() {
    let mut port = Port::new();
    let future = Packet::with_timestamp(1u8, Timestamp::from_micros(i64::MAX - 1));
    assert!(port.write(future));

    clock::reset();
    // Fresh packets are older than the watermark and get dropped
    assert!(!port.write(Packet::new(2u8)));
    assert_eq!(port.len(), 1);
}
