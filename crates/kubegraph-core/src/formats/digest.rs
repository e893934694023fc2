//! # Content Digest
//!
//! Stable hex token for manifest text, used as a file's version token when
//! the source collaborator does not supply one.
//!
//! With the `crypto-hash` feature the token is a BLAKE3 hash (64 hex
//! characters). Without it, FNV-1a 64 (16 hex characters): cheap change
//! detection, not collision resistant.

#[cfg(not(feature = "crypto-hash"))]
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
#[cfg(not(feature = "crypto-hash"))]
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Digest of `text` as lowercase hex.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn content_digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Digest of `text` as lowercase hex.
#[cfg(not(feature = "crypto-hash"))]
#[must_use]
pub fn content_digest(text: &str) -> String {
    let hash = text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("{:016x}", hash)
}
