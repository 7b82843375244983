//! Canonical MessagePack, restricted to what ledger transactions use.
//!
//! Supported: nil, bool, unsigned integers, str, bin, array, and maps with
//! string keys. Negative integers, floats and extension types are rejected.
//! [`encode`] always produces the canonical form (sorted keys, shortest
//! headers), so `encode(decode(b)) == b` holds exactly for canonical input.

use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum container nesting accepted by [`decode`].
pub const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Nil,
    Bool(bool),
    Uint(u64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsgpackError {
    #[error("Unexpected end of input")]
    Truncated,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Unsupported marker byte 0x{0:02x}")]
    UnsupportedMarker(u8),

    #[error("Map keys must be strings")]
    NonStringKey,

    #[error("Duplicate map key: {0}")]
    DuplicateKey(String),

    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("Nesting too deep")]
    TooDeep,
}

/// Decode exactly one value from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value, MsgpackError> {
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.value(0)?;
    let rest = bytes.len() - reader.pos;
    if rest != 0 {
        return Err(MsgpackError::TrailingBytes(rest));
    }
    Ok(value)
}

/// Encode `value` canonically.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MsgpackError> {
        if n > self.remaining() {
            return Err(MsgpackError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, MsgpackError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, MsgpackError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, MsgpackError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, MsgpackError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    fn value(&mut self, depth: usize) -> Result<Value, MsgpackError> {
        if depth > MAX_DEPTH {
            return Err(MsgpackError::TooDeep);
        }
        let marker = self.read_u8()?;
        match marker {
            0x00..=0x7f => Ok(Value::Uint(marker as u64)),
            0x80..=0x8f => self.map((marker & 0x0f) as usize, depth),
            0x90..=0x9f => self.array((marker & 0x0f) as usize, depth),
            0xa0..=0xbf => self.string((marker & 0x1f) as usize),
            0xc0 => Ok(Value::Nil),
            0xc2 => Ok(Value::Bool(false)),
            0xc3 => Ok(Value::Bool(true)),
            0xc4 => {
                let len = self.read_u8()? as usize;
                Ok(Value::Bin(self.take(len)?.to_vec()))
            }
            0xc5 => {
                let len = self.read_u16()? as usize;
                Ok(Value::Bin(self.take(len)?.to_vec()))
            }
            0xc6 => {
                let len = self.read_u32()? as usize;
                Ok(Value::Bin(self.take(len)?.to_vec()))
            }
            0xcc => Ok(Value::Uint(self.read_u8()? as u64)),
            0xcd => Ok(Value::Uint(self.read_u16()? as u64)),
            0xce => Ok(Value::Uint(self.read_u32()? as u64)),
            0xcf => Ok(Value::Uint(self.read_u64()?)),
            0xd9 => {
                let len = self.read_u8()? as usize;
                self.string(len)
            }
            0xda => {
                let len = self.read_u16()? as usize;
                self.string(len)
            }
            0xdb => {
                let len = self.read_u32()? as usize;
                self.string(len)
            }
            0xdc => {
                let len = self.read_u16()? as usize;
                self.array(len, depth)
            }
            0xdd => {
                let len = self.read_u32()? as usize;
                self.array(len, depth)
            }
            0xde => {
                let len = self.read_u16()? as usize;
                self.map(len, depth)
            }
            0xdf => {
                let len = self.read_u32()? as usize;
                self.map(len, depth)
            }
            other => Err(MsgpackError::UnsupportedMarker(other)),
        }
    }

    fn string(&mut self, len: usize) -> Result<Value, MsgpackError> {
        let bytes = self.take(len)?;
        let s = std::str::from_utf8(bytes).map_err(|_| MsgpackError::InvalidUtf8)?;
        Ok(Value::Str(s.to_string()))
    }

    fn array(&mut self, len: usize, depth: usize) -> Result<Value, MsgpackError> {
        // Every element takes at least one byte; reject absurd lengths before allocating.
        if len > self.remaining() {
            return Err(MsgpackError::Truncated);
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.value(depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    fn map(&mut self, len: usize, depth: usize) -> Result<Value, MsgpackError> {
        if len > self.remaining() / 2 {
            return Err(MsgpackError::Truncated);
        }
        let mut entries = BTreeMap::new();
        for _ in 0..len {
            let key = match self.value(depth + 1)? {
                Value::Str(s) => s,
                _ => return Err(MsgpackError::NonStringKey),
            };
            let value = self.value(depth + 1)?;
            if entries.contains_key(&key) {
                return Err(MsgpackError::DuplicateKey(key));
            }
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Nil => out.push(0xc0),
        Value::Bool(false) => out.push(0xc2),
        Value::Bool(true) => out.push(0xc3),
        Value::Uint(n) => write_uint(out, *n),
        Value::Str(s) => write_str(out, s),
        Value::Bin(b) => {
            let len = b.len();
            if len <= u8::MAX as usize {
                out.push(0xc4);
                out.push(len as u8);
            } else if len <= u16::MAX as usize {
                out.push(0xc5);
                out.extend_from_slice(&(len as u16).to_be_bytes());
            } else {
                out.push(0xc6);
                out.extend_from_slice(&(len as u32).to_be_bytes());
            }
            out.extend_from_slice(b);
        }
        Value::Array(items) => {
            write_container_header(out, items.len(), 0x90, 0xdc, 0xdd);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Map(entries) => {
            write_container_header(out, entries.len(), 0x80, 0xde, 0xdf);
            for (key, value) in entries {
                write_str(out, key);
                write_value(out, value);
            }
        }
    }
}

fn write_uint(out: &mut Vec<u8>, n: u64) {
    if n <= 0x7f {
        out.push(n as u8);
    } else if n <= u8::MAX as u64 {
        out.push(0xcc);
        out.push(n as u8);
    } else if n <= u16::MAX as u64 {
        out.push(0xcd);
        out.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= u32::MAX as u64 {
        out.push(0xce);
        out.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        out.push(0xcf);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    let len = s.len();
    if len <= 31 {
        out.push(0xa0 | len as u8);
    } else if len <= u8::MAX as usize {
        out.push(0xd9);
        out.push(len as u8);
    } else if len <= u16::MAX as usize {
        out.push(0xda);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(0xdb);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(s.as_bytes());
}

fn write_container_header(out: &mut Vec<u8>, len: usize, fix: u8, m16: u8, m32: u8) {
    if len <= 15 {
        out.push(fix | len as u8);
    } else if len <= u16::MAX as usize {
        out.push(m16);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(m32);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}
