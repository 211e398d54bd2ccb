//! # HCP Types
//!
//! Core type definitions for the HCP chain.
//!
//! This crate provides the fundamental types shared across the node:
//! - [`Address`] - 20-byte operator (account) addresses
//! - [`ConsAddress`] - 20-byte consensus addresses derived from consensus keys
//! - [`AddressCodec`] - prefix-aware string encoding for both address kinds
//! - [`H256`] - 32-byte digests with SHA-256 support
//!
//! ## Example
//!
//! ```rust
//! use hcp_types::{Address, AddressCodec, H256};
//!
//! let codec = AddressCodec::new("hcpvaloper", "hcpvalcons");
//! let addr = Address::new([0x42; 20]);
//!
//! // Round-trip through the human-readable form
//! let encoded = codec.encode_operator(&addr);
//! assert_eq!(codec.decode_operator(&encoded).unwrap(), addr);
//!
//! // Digest some bytes
//! let digest = H256::sha256(b"proposal payload");
//! assert!(!digest.is_zero());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod address;
pub mod hash;

pub use address::{Address, AddressCodec, ConsAddress, ADDRESS_SIZE};
pub use hash::{H256, HASH_SIZE};

/// Result type alias for HCP type operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with HCP types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid address format
    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    /// Address string does not carry the expected human-readable prefix
    #[error("wrong address prefix: expected {expected}, got {got}")]
    WrongPrefix {
        /// The prefix the codec was configured with
        expected: String,
        /// The prefix found on the input
        got: String,
    },

    /// Invalid hash format
    #[error("invalid hash format: {0}")]
    InvalidHash(String),
}
