//! Property tests for the hex escape codec.

#![allow(clippy::unwrap_used, missing_docs)]

use pqx_protocol::escape::{
    esc_bin, esc_bin_to_buf, esc_bin_to_slice, size_esc_bin, size_unesc_bin, unesc_bin,
    unesc_bin_to_slice,
};
use pqx_protocol::EscapeError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn roundtrip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let text = esc_bin(&data);
        prop_assert_eq!(unesc_bin(&text).unwrap(), data);
    }

    #[test]
    fn encoded_length_and_case(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let text = esc_bin(&data);
        prop_assert_eq!(text.len(), 2 + 2 * data.len());
        prop_assert!(text.starts_with("\\x"));
        prop_assert!(text[2..].bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        prop_assert_eq!(size_unesc_bin(text.len()), data.len());
    }

    #[test]
    fn encoding_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        prop_assert_eq!(esc_bin(&data), esc_bin(&data));
    }

    #[test]
    fn buffer_variants_agree(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let text = esc_bin(&data);

        let mut slice = vec![0xFFu8; size_esc_bin(data.len())];
        let written = esc_bin_to_slice(&data, &mut slice);
        prop_assert_eq!(written, 3 + 2 * data.len());
        prop_assert_eq!(&slice[..written - 1], text.as_bytes());
        prop_assert_eq!(slice[written - 1], 0);

        let mut streamed = Vec::new();
        esc_bin_to_buf(&data, &mut streamed);
        prop_assert_eq!(streamed, text.as_bytes());

        let mut decoded = vec![0u8; data.len()];
        let n = unesc_bin_to_slice(text.as_bytes(), &mut decoded).unwrap();
        prop_assert_eq!(n, data.len());
        prop_assert_eq!(decoded, data);
    }

    #[test]
    fn uppercase_input_decodes(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let upper = format!("\\x{}", esc_bin(&data)[2..].to_uppercase());
        prop_assert_eq!(unesc_bin(&upper).unwrap(), data);
    }

    #[test]
    fn decode_never_panics(input in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = unesc_bin(&input);
    }

    #[test]
    fn odd_lengths_rejected(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut text = esc_bin(&data);
        text.push('0');
        prop_assert_eq!(
            unesc_bin(&text),
            Err(EscapeError::InvalidLength { len: text.len() })
        );
    }
}
