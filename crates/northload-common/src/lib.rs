//! Northload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the northload workspace.
//!
//! - **Error Handling**: [`CommonError`] for invalid shared settings
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Checksums**: content digests recorded for each loaded source file
//!
//! # Example
//!
//! ```
//! use northload_common::checksum::{checksum_bytes, ChecksumAlgorithm};
//!
//! let digest = checksum_bytes(b"customer_id,name\n", ChecksumAlgorithm::Sha256);
//! assert_eq!(digest.len(), 64);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

pub use error::CommonError;
