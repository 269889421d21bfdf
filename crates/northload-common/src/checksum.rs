//! Content checksums for source files
//!
//! The loader records a digest of every file it reads so two runs over the
//! same input can be shown to have consumed identical bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// Hex digest of an in-memory buffer
pub fn checksum_bytes(bytes: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        ChecksumAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
    }
}
