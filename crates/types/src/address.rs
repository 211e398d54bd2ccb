//! Validator address types and the prefix-aware address codec.
//!
//! Two 20-byte address kinds exist on the chain:
//!
//! - [`Address`] identifies a validator operator (the staking identity).
//! - [`ConsAddress`] identifies a validator in vote records; it is derived
//!   from the validator's consensus public key by truncated SHA-256.
//!
//! Human-readable renderings carry a configurable prefix (for example
//! `hcpvaloper` / `hcpvalcons`) supplied by an [`AddressCodec`] value. The
//! codec is an immutable value threaded through whoever needs to render or
//! parse addresses; there is no process-wide prefix registry.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Size of an address in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Separator between the human-readable prefix and the hex body
const PREFIX_SEPARATOR: char = '1';

/// A 20-byte validator operator address.
///
/// Operator addresses key every per-validator record in the consensus
/// subsystem: trust scores, performance histories, and committee membership.
///
/// # Example
///
/// ```rust
/// use hcp_types::Address;
///
/// let addr: Address = "0x742d35cc6634c0532925a3b844bc9e7595f0beb1".parse().unwrap();
/// let bytes: [u8; 20] = addr.into();
/// assert_eq!(Address::from(bytes), addr);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

/// A 20-byte consensus address, derived from a consensus public key.
///
/// Vote records identify validators by consensus address rather than by
/// operator address; the staking view maps between the two.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConsAddress([u8; ADDRESS_SIZE]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_SIZE]);

    /// Creates a new address from a 20-byte array.
    #[inline]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice.
    ///
    /// Returns an error if the slice length is not exactly 20 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_SIZE {
            return Err(Error::InvalidLength {
                expected: ADDRESS_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Returns the address as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks if this is the zero address.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Creates an address from its hex representation.
    ///
    /// The input can optionally have a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let s = s.strip_prefix("0X").unwrap_or(s);

        if s.len() != ADDRESS_SIZE * 2 {
            return Err(Error::InvalidAddress(format!(
                "expected {} hex characters, got {}",
                ADDRESS_SIZE * 2,
                s.len()
            )));
        }

        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl ConsAddress {
    /// The zero consensus address.
    pub const ZERO: Self = Self([0u8; ADDRESS_SIZE]);

    /// Creates a new consensus address from a 20-byte array.
    #[inline]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a consensus address from a slice.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_SIZE {
            return Err(Error::InvalidLength {
                expected: ADDRESS_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Derives the consensus address from a consensus public key.
    ///
    /// The address is the first 20 bytes of the SHA-256 digest of the raw
    /// key bytes.
    pub fn from_pubkey(pubkey: &[u8]) -> Self {
        let digest = Sha256::digest(pubkey);
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest[..ADDRESS_SIZE]);
        Self(bytes)
    }

    /// Returns the consensus address as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks if this is the zero consensus address.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }
}

/// Prefix-aware encoder/decoder for the chain's address kinds.
///
/// A codec value is constructed once at node wiring time and handed to every
/// component that renders or parses addresses. The rendered form is
/// `<prefix>1<hex>`, for example:
///
/// ```text
/// hcpvaloper1742d35cc6634c0532925a3b844bc9e7595f0beb1
/// ```
///
/// # Example
///
/// ```rust
/// use hcp_types::{Address, AddressCodec};
///
/// let codec = AddressCodec::new("hcpvaloper", "hcpvalcons");
/// let addr = Address::new([7u8; 20]);
/// let s = codec.encode_operator(&addr);
/// assert!(s.starts_with("hcpvaloper1"));
/// assert_eq!(codec.decode_operator(&s).unwrap(), addr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCodec {
    operator_prefix: String,
    consensus_prefix: String,
}

impl AddressCodec {
    /// Creates a codec with the given human-readable prefixes.
    pub fn new(operator_prefix: impl Into<String>, consensus_prefix: impl Into<String>) -> Self {
        Self {
            operator_prefix: operator_prefix.into(),
            consensus_prefix: consensus_prefix.into(),
        }
    }

    /// Returns the operator address prefix.
    pub fn operator_prefix(&self) -> &str {
        &self.operator_prefix
    }

    /// Returns the consensus address prefix.
    pub fn consensus_prefix(&self) -> &str {
        &self.consensus_prefix
    }

    /// Renders an operator address in its human-readable form.
    pub fn encode_operator(&self, addr: &Address) -> String {
        Self::encode(&self.operator_prefix, addr.as_bytes())
    }

    /// Renders a consensus address in its human-readable form.
    pub fn encode_consensus(&self, addr: &ConsAddress) -> String {
        Self::encode(&self.consensus_prefix, addr.as_bytes())
    }

    /// Parses a human-readable operator address.
    pub fn decode_operator(&self, s: &str) -> Result<Address> {
        let body = self.strip(&self.operator_prefix, s)?;
        Address::from_hex(body)
    }

    /// Parses a human-readable consensus address.
    pub fn decode_consensus(&self, s: &str) -> Result<ConsAddress> {
        let body = self.strip(&self.consensus_prefix, s)?;
        let bytes = hex::decode(body)?;
        ConsAddress::from_slice(&bytes)
    }

    fn encode(prefix: &str, bytes: &[u8]) -> String {
        format!("{}{}{}", prefix, PREFIX_SEPARATOR, hex::encode(bytes))
    }

    fn strip<'a>(&self, prefix: &str, s: &'a str) -> Result<&'a str> {
        let rest = s.strip_prefix(prefix).ok_or_else(|| Error::WrongPrefix {
            expected: prefix.to_string(),
            got: s.chars().take_while(|c| c.is_ascii_alphabetic()).collect(),
        })?;
        rest.strip_prefix(PREFIX_SEPARATOR)
            .ok_or_else(|| Error::InvalidAddress(format!("missing separator in {s}")))
    }
}

impl Default for AddressCodec {
    fn default() -> Self {
        Self::new("hcpvaloper", "hcpvalcons")
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsAddress(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; ADDRESS_SIZE]> for Address {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; ADDRESS_SIZE] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_SIZE]> for ConsAddress {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<ConsAddress> for [u8; ADDRESS_SIZE] {
    fn from(addr: ConsAddress) -> Self {
        addr.0
    }
}

impl AsRef<[u8]> for ConsAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ConsAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for ConsAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_hex() {
        let addr = Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f0beb1").unwrap();
        assert!(!addr.is_zero());

        // Without 0x prefix
        let addr2 = Address::from_hex("742d35cc6634c0532925a3b844bc9e7595f0beb1").unwrap();
        assert_eq!(addr, addr2);
    }

    #[test]
    fn test_zero_address() {
        let zero = Address::ZERO;
        assert!(zero.is_zero());
        assert_eq!(
            zero.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_invalid_address() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f0beb1ff").is_err());
        assert!(Address::from_hex("0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG").is_err());
    }

    #[test]
    fn test_cons_address_from_pubkey() {
        let a = ConsAddress::from_pubkey(&[1u8; 32]);
        let b = ConsAddress::from_pubkey(&[1u8; 32]);
        let c = ConsAddress::from_pubkey(&[2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_codec_round_trip() {
        let codec = AddressCodec::default();
        let addr = Address::new([0x42; 20]);
        let s = codec.encode_operator(&addr);
        assert!(s.starts_with("hcpvaloper1"));
        assert_eq!(codec.decode_operator(&s).unwrap(), addr);

        let cons = ConsAddress::new([0x17; 20]);
        let s = codec.encode_consensus(&cons);
        assert!(s.starts_with("hcpvalcons1"));
        assert_eq!(codec.decode_consensus(&s).unwrap(), cons);
    }

    #[test]
    fn test_codec_wrong_prefix() {
        let codec = AddressCodec::default();
        let other = AddressCodec::new("othervaloper", "othervalcons");
        let addr = Address::new([9u8; 20]);
        let s = other.encode_operator(&addr);
        assert!(matches!(
            codec.decode_operator(&s),
            Err(Error::WrongPrefix { .. })
        ));
    }

    #[test]
    fn test_address_serde() {
        let addr = Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f0beb1").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, decoded);
    }
}
