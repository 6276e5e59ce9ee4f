#![no_main]

use libfuzzer_sys::fuzz_target;
use tszip::{decode, Options, Segment};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic the decoder, split point included.
    let opts = Options::new();
    let _ = decode(Segment::new(data, &[]), &opts);

    let mid = data.len() / 2;
    let _ = decode(Segment::new(&data[..mid], &data[mid..]), &opts);
});
