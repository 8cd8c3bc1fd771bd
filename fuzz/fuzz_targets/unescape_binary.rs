#![no_main]

use libfuzzer_sys::fuzz_target;
use pqx_protocol::{unesc_bin, unesc_bin_to_slice};

fuzz_target!(|data: &[u8]| {
    // Arbitrary server text must never panic the decoder
    let decoded = unesc_bin(data);

    // The slice variant must agree with the allocating one
    let mut buffer = vec![0u8; data.len() / 2];
    let sliced = unesc_bin_to_slice(data, &mut buffer);
    match (&decoded, sliced) {
        (Ok(bytes), Ok(len)) => assert_eq!(bytes.as_slice(), &buffer[..len]),
        (Err(_), Err(_)) => {}
        (a, b) => panic!("decoders disagree: {a:?} vs {b:?}"),
    }
});
