#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use pqx_protocol::{esc_bin, esc_bin_to_buf, unesc_bin};

fuzz_target!(|data: &[u8]| {
    let escaped = esc_bin(data);
    assert_eq!(escaped.len(), 2 + 2 * data.len());
    assert!(escaped.starts_with("\\x"));

    let mut buf = BytesMut::new();
    esc_bin_to_buf(data, &mut buf);
    assert_eq!(&buf[..], escaped.as_bytes());

    let decoded = unesc_bin(&escaped).expect("escaped output must decode");
    assert_eq!(decoded, data);

    // Upper-case hex digits are accepted too
    let upper = format!("\\x{}", escaped[2..].to_ascii_uppercase());
    assert_eq!(unesc_bin(upper).expect("upper-case hex must decode"), data);
});
