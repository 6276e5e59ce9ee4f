#![no_main]

use libfuzzer_sys::fuzz_target;
use tszip::{decode, DataPoint, Encoder, Options, TimeUnit};

const SECOND_NS: i64 = 1_000_000_000;
const BASE_NS: i64 = 1_600_000_000 * SECOND_NS;

fuzz_target!(|data: &[u8]| {
    // Snapshots taken after every append must decode to the accepted prefix.
    let opts = Options::new();
    let mut encoder = Encoder::new(BASE_NS, Vec::new(), opts.clone());
    let mut ts = BASE_NS;
    for (i, chunk) in data.chunks(3).enumerate() {
        if chunk.len() < 3 || i >= 512 {
            break;
        }
        let gap = i64::from(u16::from_le_bytes([chunk[0], chunk[1]])) + 1;
        let value = f64::from(chunk[2]);
        ts += gap * SECOND_NS;
        encoder
            .encode(DataPoint::new(ts, value), TimeUnit::Second, &[])
            .unwrap();

        let samples = decode(encoder.stream().unwrap(), &opts).unwrap();
        assert_eq!(samples.len(), i + 1, "snapshot prefix mismatch");
    }
});
