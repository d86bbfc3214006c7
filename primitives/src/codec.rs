//! Deterministic binary encoding helpers for the transaction wire format.
//!
//! Encoding format:
//! - Fixed-size fields (Address, u64, u128) are written directly, little-endian
//! - Variable-length fields (bytes, strings) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - A `Coin` is its denom string followed by a u128 amount

use alloc::string::String;
use alloc::vec::Vec;

use crate::coin::Coin;
use crate::error::CodecError;
use crate::types::Address;

/// Upper bound on any length or count prefix, so a corrupt prefix cannot
/// trigger a huge allocation before the bounds check fails.
pub const MAX_PREFIX: u32 = 16 * 1024 * 1024;

/// A cursor for reading bytes during decoding.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Fails with `TrailingBytes` unless the whole input was consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEnd);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_u128(&mut self) -> Result<u128, CodecError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.read_bytes(16)?);
        Ok(u128::from_le_bytes(buf))
    }

    pub fn read_address(&mut self) -> Result<Address, CodecError> {
        let mut addr = [0u8; 32];
        addr.copy_from_slice(self.read_bytes(32)?);
        Ok(addr)
    }

    pub fn read_signature(&mut self) -> Result<[u8; 64], CodecError> {
        let mut sig = [0u8; 64];
        sig.copy_from_slice(self.read_bytes(64)?);
        Ok(sig)
    }

    /// Read a count prefix, bounded by [`MAX_PREFIX`].
    pub fn read_count(&mut self) -> Result<usize, CodecError> {
        let n = self.read_u32()?;
        if n > MAX_PREFIX {
            return Err(CodecError::InvalidField(alloc::format!("prefix too large: {}", n)));
        }
        Ok(n as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_count()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn read_coin(&mut self) -> Result<Coin, CodecError> {
        let denom = self.read_string()?;
        let amount = self.read_u128()?;
        let coin = Coin::new(amount, denom);
        if !coin.is_valid() {
            return Err(CodecError::InvalidField(alloc::format!(
                "invalid denom: {:?}",
                coin.denom
            )));
        }
        Ok(coin)
    }
}

// ── Encoding helpers ──

pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u128(buf: &mut Vec<u8>, v: u128) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn write_address(buf: &mut Vec<u8>, addr: &Address) {
    buf.extend_from_slice(addr);
}

pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

pub fn write_coin(buf: &mut Vec<u8>, coin: &Coin) {
    write_string(buf, &coin.denom);
    write_u128(buf, coin.amount);
}
