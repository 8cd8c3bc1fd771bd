#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use pqx_protocol::{COPY_LINE_TERMINATOR, frame_line, strip_line_terminator};

fuzz_target!(|data: &[u8]| {
    let framed = frame_line(data);
    assert_eq!(framed.len(), data.len() + 1);
    assert_eq!(framed.last(), Some(&COPY_LINE_TERMINATOR));

    // Exactly one terminator comes off, even if the line had its own
    assert_eq!(strip_line_terminator(framed), Bytes::copy_from_slice(data));

    let stripped = strip_line_terminator(Bytes::copy_from_slice(data));
    assert!(stripped.len() + 1 >= data.len());
});
