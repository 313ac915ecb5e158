//! Property-based tests for the object key codec.
//!
//! - Path/key round trip
//! - Folder key shape and idempotence

use proptest::prelude::*;

use super::key::{require_object_key, to_folder_key, to_key, to_path};

/// Strategy to generate virtual paths: `/` followed by up to four segments.
fn virtual_path() -> impl Strategy<Value = String> {
    (prop::collection::vec("[a-zA-Z0-9._ -]{0,12}", 0..4), any::<bool>()).prop_map(
        |(segments, trailing)| {
            let mut path = format!("/{}", segments.join("/"));
            if trailing && !path.ends_with('/') {
                path.push('/');
            }
            path
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A valid path survives conversion to a key and back.
    #[test]
    fn prop_path_key_round_trip(path in virtual_path()) {
        let key = to_key(&path).unwrap();
        prop_assert_eq!(to_path(key), path);
    }

    /// Folder keys of non-root paths end with `/`.
    #[test]
    fn prop_folder_key_ends_with_separator(path in virtual_path()) {
        let key = to_folder_key(&path).unwrap();
        prop_assert!(key.is_empty() || key.ends_with('/'));
        prop_assert_eq!(key.is_empty(), path == "/");
    }

    /// Applying the folder conversion twice changes nothing.
    #[test]
    fn prop_folder_key_idempotent(path in virtual_path()) {
        let once = to_folder_key(&path).unwrap();
        let twice = to_folder_key(&to_path(&once)).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Paths without a leading `/` never reach the store.
    #[test]
    fn prop_relative_paths_rejected(path in "[a-z][a-z0-9/]{0,20}") {
        prop_assert!(to_key(&path).is_err());
        prop_assert!(require_object_key(&path).is_err());
    }
}
