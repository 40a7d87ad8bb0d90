//! MsgPack codec using `rmp-serde`.
//!
//! Encoding always uses `to_vec_named`, so structs land on the wire as maps
//! keyed by field name and any standalone MessagePack decoder can read them.
//! Byte blobs wrapped in `serde_bytes` are written as `bin`, strings as `str`.
//!
//! Decoding runs the buffer through [`DecodeLimits`] before handing it to
//! `rmp-serde`, so a single oversize length header is rejected up front.
//!
//! # Example
//!
//! ```
//! use tensorpack_serialize::codec::{DecodeLimits, MsgPackCodec};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Sample {
//!     label: u32,
//!     name: String,
//! }
//!
//! let sample = Sample { label: 7, name: "cat".to_string() };
//! let encoded = MsgPackCodec::encode(&sample).unwrap();
//! let decoded: Sample = MsgPackCodec::decode_with_limits(&encoded, &DecodeLimits::STRICT).unwrap();
//! assert_eq!(decoded, sample);
//! ```

use super::{DecodeLimits, Version};
use crate::error::Result;

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Minimum `rmp-serde` release this crate requires (the API level it
    /// is written against); Cargo may resolve a newer patch release.
    pub const VERSION: Version = Version::new(1, 3, 0);

    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes under the default (generous) limits.
    ///
    /// # Errors
    ///
    /// Returns error if a length header exceeds the limits or the bytes
    /// cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Self::decode_with_limits(bytes, &DecodeLimits::default())
    }

    /// Decode MsgPack bytes, enforcing `limits` on every length header.
    pub fn decode_with_limits<T: serde::de::DeserializeOwned>(
        bytes: &[u8],
        limits: &DecodeLimits,
    ) -> Result<T> {
        limits.check(bytes)?;
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
