//! Property-based test generators using proptest.

use blobsync_protocol::WriterId;
use proptest::prelude::*;

/// Strategy for application blobs, including the empty blob.
pub fn blob_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

/// Strategy for two blobs that are guaranteed to differ.
pub fn distinct_blobs_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (blob_strategy(), blob_strategy()).prop_filter("blobs must differ", |(a, b)| a != b)
}

/// Strategy for valid project ids.
pub fn project_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,23}").expect("Invalid regex")
}

/// Strategy for writer ids.
pub fn writer_id_strategy() -> impl Strategy<Value = WriterId> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}")
        .expect("Invalid regex")
        .prop_map(|s| WriterId::new(s).expect("regex yields valid ids"))
}

/// Proptest configuration for scenario tests that talk to the in-memory host.
pub fn scenario_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}
