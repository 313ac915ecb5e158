//! Property-based tests for sidecar attribute encoding.

use proptest::prelude::*;

use super::sidecar::{Sidecar, decode, decode_lenient, encode};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Decoding what was encoded reproduces the exact triple.
    #[test]
    fn prop_encode_decode(width in any::<u32>(), height in any::<u32>(), mime in "[a-z]{1,10}/[a-z0-9.+-]{0,20}") {
        let attributes = encode(width, height, &mime);
        let expected = Sidecar { width, height, mime_type: mime };
        prop_assert_eq!(decode(&attributes).unwrap(), expected.clone());
        prop_assert_eq!(decode_lenient(&attributes), expected);
    }

    /// Non-numeric dimensions never panic and read as unknown leniently.
    #[test]
    fn prop_lenient_never_fails(raw in "[^0-9]{1,8}") {
        let mut attributes = encode(1, 1, "image/gif");
        attributes.insert("width".to_string(), raw);
        prop_assert!(decode(&attributes).is_err());
        prop_assert_eq!(decode_lenient(&attributes).width, 0);
    }
}
