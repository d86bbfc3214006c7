//! Core type aliases, constants, and hex helpers shared across Blocklane crates.

use alloc::string::String;

/// 32-byte hash used for transaction hashes, bundle digests, and proposal hashes.
pub type Hash = [u8; 32];

/// 32-byte address identifying accounts. Equal to the account's ed25519
/// public key.
pub type Address = [u8; 32];

/// Block height (monotonically increasing).
pub type BlockHeight = u64;

/// A zero-valued address (32 zero bytes).
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Convert a 32-byte value to a `0x`-prefixed lowercase hex string.
pub fn hash_to_hex(hash: &Hash) -> String {
    let mut s = String::with_capacity(66);
    s.push_str("0x");
    for byte in hash {
        use core::fmt::Write;
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Short form used in log fields: the first four bytes as hex.
pub fn short_hex(hash: &Hash) -> String {
    let mut s = String::with_capacity(8);
    for byte in &hash[..4] {
        use core::fmt::Write;
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Parse a 32-byte value from hex, with or without a `0x` prefix.
pub fn hash_from_hex(s: &str) -> Option<Hash> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 64 {
        return None;
    }
    let bytes = digits.as_bytes();
    let mut out = [0u8; 32];
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = hex_nibble(bytes[2 * i])?;
        let lo = hex_nibble(bytes[2 * i + 1])?;
        *slot = (hi << 4) | lo;
    }
    Some(out)
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Serde adapter storing an [`Address`] as a `0x`-prefixed hex string.
///
/// Use with `#[serde(with = "blocklane_primitives::types::hex_address")]`.
pub mod hex_address {
    use super::{hash_from_hex, hash_to_hex, Address};
    use alloc::string::String;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(addr: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_hex(addr))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        hash_from_hex(&s).ok_or_else(|| D::Error::custom("expected 32-byte hex address"))
    }
}

/// Serde adapter storing a [`Hash`] as a `0x`-prefixed hex string.
pub use self::hex_address as hex_hash;
