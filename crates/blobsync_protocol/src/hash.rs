//! Content hashing for state blobs.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded content hash.
pub const HASH_HEX_LEN: usize = 64;

/// Computes the content hash of a state blob.
///
/// The hash is the lowercase hex encoding of the SHA-256 digest of the
/// bytes, which is what every installation writes into `contentHash`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Returns true if `value` looks like a hash produced by [`content_hash`].
pub fn is_content_hash(value: &str) -> bool {
    value.len() == HASH_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
