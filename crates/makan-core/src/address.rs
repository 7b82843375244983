//! Account addresses and 32-byte digests.
//!
//! An address is a 32-byte public key (or program hash). Its text form is
//! the unpadded RFC 4648 base32 encoding of `key || checksum`, where the
//! checksum is the last 4 bytes of SHA-512/256(key).

use sha2::{Digest as _, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain separator for logic-signature program addresses.
pub const PROGRAM_PREFIX: &[u8] = b"Program";

/// Domain separator for transaction ids.
pub const TX_PREFIX: &[u8] = b"TX";

/// Domain separator for transaction group ids.
pub const GROUP_PREFIX: &[u8] = b"TG";

const CHECKSUM_LEN: usize = 4;
const ADDRESS_TEXT_LEN: usize = 58;
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must be 58 characters, got {0}")]
    InvalidLength(usize),

    #[error("Address contains characters outside the base32 alphabet")]
    InvalidEncoding,

    #[error("Address checksum mismatch")]
    BadChecksum,

    #[error("Expected 32 key bytes, got {0}")]
    InvalidKeyLength(usize),
}

/// SHA-512/256 over the concatenation of `parts`.
pub fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// A ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address. Canonical encodings omit it.
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// The address controlled by a logic-signature program.
    ///
    /// This is a one-way function of the exact program bytes: a single
    /// differing byte yields an unrelated account.
    pub fn for_program(program: &[u8]) -> Self {
        Self(sha512_256(&[PROGRAM_PREFIX, program]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let hash = sha512_256(&[&self.0]);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&hash[32 - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = Vec::with_capacity(32 + CHECKSUM_LEN);
        bytes.extend_from_slice(&self.0);
        bytes.extend_from_slice(&self.checksum());
        f.write_str(&base32_encode(&bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let bytes = base32_decode(s).ok_or(AddressError::InvalidEncoding)?;
        if bytes.len() != 32 + CHECKSUM_LEN {
            return Err(AddressError::InvalidEncoding);
        }
        let address = Self::from_slice(&bytes[..32])?;
        if address.checksum() != bytes[32..] {
            return Err(AddressError::BadChecksum);
        }
        Ok(address)
    }
}

/// A SHA-512/256 digest: transaction ids and group ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

/// Transaction id.
pub type TxId = Digest;

/// Commitment to the ordered member ids of an atomic transaction group.
pub type GroupId = Digest;

impl Digest {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Hash `prefix || data`.
    pub fn hash_with_prefix(prefix: &[u8], data: &[u8]) -> Self {
        Self(sha512_256(&[prefix, data]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base32_encode(&self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

// ============================================================================
// Base32 (RFC 4648, no padding)
// ============================================================================

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for c in text.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    // Leftover padding bits must be zero, otherwise two strings decode alike.
    if buffer != 0 {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ADDRESS: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

    #[test]
    fn test_zero_address_text() {
        assert_eq!(Address::ZERO.to_string(), ZERO_ADDRESS);
        assert_eq!(ZERO_ADDRESS.parse::<Address>().unwrap(), Address::ZERO);
    }

    #[test]
    fn test_address_text_roundtrip() {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        let address = Address::new(key);
        let text = address.to_string();
        assert_eq!(text.len(), ADDRESS_TEXT_LEN);
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_checksum_detects_typo() {
        let address = Address::for_program(&[0x08, 0x81, 0x01]);
        let mut text = address.to_string().into_bytes();
        // Flip a key character, keep the checksum.
        text[3] = if text[3] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(text).unwrap();
        assert_eq!(
            tampered.parse::<Address>(),
            Err(AddressError::BadChecksum)
        );
    }

    #[test]
    fn test_rejects_bad_length_and_alphabet() {
        assert_eq!(
            "ABC".parse::<Address>(),
            Err(AddressError::InvalidLength(3))
        );
        let lowercase = ZERO_ADDRESS.to_lowercase();
        assert_eq!(
            lowercase.parse::<Address>(),
            Err(AddressError::InvalidEncoding)
        );
    }

    #[test]
    fn test_program_address_depends_on_every_byte() {
        let a = Address::for_program(&[0x08, 0x81, 0x01]);
        let b = Address::for_program(&[0x08, 0x81, 0x00]);
        let c = Address::for_program(&[0x08, 0x81, 0x01]);
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_program_address_is_domain_separated() {
        let program = [0x08, 0x81, 0x01];
        let plain = Address::new(sha512_256(&[&program]));
        assert_ne!(Address::for_program(&program), plain);
    }

    #[test]
    fn test_digest_text_is_52_chars() {
        let digest = Digest::hash_with_prefix(TX_PREFIX, b"payload");
        assert_eq!(digest.to_string().len(), 52);
    }

    #[test]
    fn test_from_slice_length() {
        assert_eq!(
            Address::from_slice(&[1u8; 31]),
            Err(AddressError::InvalidKeyLength(31))
        );
        assert!(Digest::from_slice(&[1u8; 33]).is_none());
    }
}
