//! Length ceilings for MsgPack decoding.
//!
//! Every `bin`, `str`, `array`, `map` and `ext` header in a buffer is
//! compared with its ceiling before the payload reaches `rmp-serde`. The
//! facade default raises all five to [`MAX_MSGPACK_LEN`] so large numeric
//! payloads pass; [`DecodeLimits::STRICT`] keeps the conservative ceilings
//! MessagePack decoders ship with.
//!
//! A truncated or malformed buffer is not reported here; the scan simply
//! stops and leaves the diagnosis to the decoder.

#[cfg(feature = "msgpack")]
use rmp::Marker;

#[cfg(feature = "msgpack")]
use crate::error::{Result, SerializeError};

// Stop scanning when the buffer runs out.
#[cfg(feature = "msgpack")]
macro_rules! some_or_done {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => return Ok(()),
        }
    };
}

/// Ceiling applied to every MsgPack length header by default.
pub const MAX_MSGPACK_LEN: u64 = 1_000_000_000;

/// Per-kind maximum lengths accepted while decoding MsgPack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum `bin` length in bytes.
    pub max_bin_len: u64,
    /// Maximum `str` length in bytes.
    pub max_str_len: u64,
    /// Maximum number of `array` items.
    pub max_array_len: u64,
    /// Maximum number of `map` entries.
    pub max_map_len: u64,
    /// Maximum `ext` payload length in bytes.
    pub max_ext_len: u64,
}

impl DecodeLimits {
    /// Conservative MessagePack defaults: 1 MiB blobs, 128 Ki array items,
    /// 32 Ki map entries.
    pub const STRICT: DecodeLimits = DecodeLimits {
        max_bin_len: 1024 * 1024,
        max_str_len: 1024 * 1024,
        max_array_len: 128 * 1024,
        max_map_len: 32 * 1024,
        max_ext_len: 1024 * 1024,
    };

    /// Same ceiling for all five kinds.
    pub const fn uniform(max: u64) -> Self {
        Self {
            max_bin_len: max,
            max_str_len: max,
            max_array_len: max,
            max_map_len: max,
            max_ext_len: max,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::uniform(MAX_MSGPACK_LEN)
    }
}

#[cfg(feature = "msgpack")]
impl DecodeLimits {
    /// Scan the first MsgPack value in `buf` and reject any length header
    /// above its ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::LimitExceeded`] for the first oversize header.
    pub fn check(&self, buf: &[u8]) -> Result<()> {
        let mut cursor = Cursor { buf, pos: 0 };
        // Values still to visit; containers push their children.
        let mut remaining: u64 = 1;

        while remaining > 0 {
            remaining -= 1;
            let Some(byte) = cursor.read_uint(1) else {
                return Ok(());
            };

            let step = match Marker::from_u8(byte as u8) {
                Marker::FixPos(_)
                | Marker::FixNeg(_)
                | Marker::Null
                | Marker::True
                | Marker::False => Step::Skip(0),
                Marker::U8 | Marker::I8 => Step::Skip(1),
                Marker::U16 | Marker::I16 => Step::Skip(2),
                Marker::U32 | Marker::I32 | Marker::F32 => Step::Skip(4),
                Marker::U64 | Marker::I64 | Marker::F64 => Step::Skip(8),

                Marker::FixStr(n) => Step::Str(n as u64),
                Marker::Str8 => Step::Str(some_or_done!(cursor.read_uint(1))),
                Marker::Str16 => Step::Str(some_or_done!(cursor.read_uint(2))),
                Marker::Str32 => Step::Str(some_or_done!(cursor.read_uint(4))),

                Marker::Bin8 => Step::Bin(some_or_done!(cursor.read_uint(1))),
                Marker::Bin16 => Step::Bin(some_or_done!(cursor.read_uint(2))),
                Marker::Bin32 => Step::Bin(some_or_done!(cursor.read_uint(4))),

                Marker::FixArray(n) => Step::Array(n as u64),
                Marker::Array16 => Step::Array(some_or_done!(cursor.read_uint(2))),
                Marker::Array32 => Step::Array(some_or_done!(cursor.read_uint(4))),

                Marker::FixMap(n) => Step::Map(n as u64),
                Marker::Map16 => Step::Map(some_or_done!(cursor.read_uint(2))),
                Marker::Map32 => Step::Map(some_or_done!(cursor.read_uint(4))),

                Marker::FixExt1 => Step::Ext(1),
                Marker::FixExt2 => Step::Ext(2),
                Marker::FixExt4 => Step::Ext(4),
                Marker::FixExt8 => Step::Ext(8),
                Marker::FixExt16 => Step::Ext(16),
                Marker::Ext8 => Step::Ext(some_or_done!(cursor.read_uint(1))),
                Marker::Ext16 => Step::Ext(some_or_done!(cursor.read_uint(2))),
                Marker::Ext32 => Step::Ext(some_or_done!(cursor.read_uint(4))),

                Marker::Reserved => return Ok(()),
            };

            let advanced = match step {
                Step::Skip(n) => cursor.skip(n),
                Step::Str(len) => {
                    limit("str", len, self.max_str_len)?;
                    cursor.skip(len)
                }
                Step::Bin(len) => {
                    limit("bin", len, self.max_bin_len)?;
                    cursor.skip(len)
                }
                Step::Ext(len) => {
                    limit("ext", len, self.max_ext_len)?;
                    // One type byte precedes the payload.
                    cursor.skip(len.saturating_add(1))
                }
                Step::Array(len) => {
                    limit("array", len, self.max_array_len)?;
                    remaining = remaining.saturating_add(len);
                    true
                }
                Step::Map(len) => {
                    limit("map", len, self.max_map_len)?;
                    remaining = remaining.saturating_add(len.saturating_mul(2));
                    true
                }
            };
            if !advanced {
                return Ok(());
            }
        }

        Ok(())
    }
}

#[cfg(feature = "msgpack")]
enum Step {
    Skip(u64),
    Str(u64),
    Bin(u64),
    Ext(u64),
    Array(u64),
    Map(u64),
}

#[cfg(feature = "msgpack")]
fn limit(kind: &'static str, len: u64, max: u64) -> Result<()> {
    if len > max {
        return Err(SerializeError::LimitExceeded { kind, len, max });
    }
    Ok(())
}

#[cfg(feature = "msgpack")]
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

#[cfg(feature = "msgpack")]
impl Cursor<'_> {
    /// Read a big-endian unsigned integer of `width` bytes.
    fn read_uint(&mut self, width: usize) -> Option<u64> {
        let end = self.pos.checked_add(width)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// Advance past `n` payload bytes; false when the buffer is too short.
    fn skip(&mut self, n: u64) -> bool {
        let left = (self.buf.len() - self.pos) as u64;
        if n > left {
            return false;
        }
        self.pos += n as usize;
        true
    }
}
