#![no_main]

use libfuzzer_sys::fuzz_target;
use tszip::{decode, DataPoint, Encoder, Options, TimeUnit};

const SECOND_NS: i64 = 1_000_000_000;
const BASE_NS: i64 = 1_600_000_000 * SECOND_NS;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Bytes are interpreted as (gap: u16 seconds, value: 8 bytes) tuples.
    let mut encoder = Encoder::new(BASE_NS, Vec::new(), Options::new());
    let mut points = Vec::new();
    let mut ts = BASE_NS;
    for chunk in data.chunks(10) {
        if chunk.len() < 10 || points.len() >= 4096 {
            break;
        }
        let gap = i64::from(u16::from_le_bytes([chunk[0], chunk[1]])) + 1;
        let value = f64::from_bits(u64::from_le_bytes(chunk[2..10].try_into().unwrap()));
        ts += gap * SECOND_NS;
        let dp = DataPoint::new(ts, value);
        encoder.encode(dp, TimeUnit::Second, &[]).unwrap();
        points.push(dp);
    }
    encoder.done();

    let Some(segment) = encoder.stream() else {
        assert!(points.is_empty());
        return;
    };
    let samples = decode(segment, &Options::new()).unwrap();
    assert_eq!(samples.len(), points.len(), "count mismatch");
    for (sample, dp) in samples.iter().zip(points.iter()) {
        assert_eq!(sample.datapoint.timestamp, dp.timestamp, "timestamp mismatch");
        assert_eq!(
            sample.datapoint.value.to_bits(),
            dp.value.to_bits(),
            "value mismatch"
        );
    }
});
