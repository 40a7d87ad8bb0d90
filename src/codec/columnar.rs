//! Columnar codec using `serde-pickle`.
//!
//! Binary-object encoding in the pickle format (protocol 3). Values carry
//! their own type tags, so the codec decodes dynamic types such as
//! `serde_json::Value` as well as typed structs. Byte blobs wrapped in
//! `serde_bytes` are written as pickle `bytes` objects, which keeps numeric
//! arrays compact.

use crate::error::Result;

/// Binary-object codec for array-heavy data.
pub struct ColumnarCodec;

impl ColumnarCodec {
    /// Encode a value to bytes.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_pickle::to_vec(&value, serde_pickle::SerOptions::new())?)
    }

    /// Decode bytes produced by [`ColumnarCodec::encode`].
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_pickle::from_slice(bytes, serde_pickle::DeOptions::new())?)
    }
}
