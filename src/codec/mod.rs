//! Codec module - the concrete backends behind the facade.
//!
//! - [`ColumnarCodec`] - binary-object codec using `serde-pickle` (feature `columnar`)
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (feature `msgpack`)
//!
//! Both work on any `serde` type. [`NdArray`] carries numeric arrays through
//! either backend, and [`DecodeLimits`] bounds MsgPack length headers.
//!
//! # Design
//!
//! Codecs are marker structs with static generic methods rather than trait
//! objects, so `dumps`/`loads` stay generic over the payload type. Runtime
//! selection happens one level up, in [`crate::backend`].
//!
//! # Example
//!
//! ```
//! use tensorpack_serialize::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&vec![1u32, 2, 3]).unwrap();
//! let decoded: Vec<u32> = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

use std::fmt;

#[cfg(feature = "columnar")]
mod columnar;
mod limits;
#[cfg(feature = "msgpack")]
mod msgpack;
mod ndarray;

#[cfg(feature = "columnar")]
pub use columnar::ColumnarCodec;
pub use limits::{DecodeLimits, MAX_MSGPACK_LEN};
#[cfg(feature = "msgpack")]
pub use msgpack::MsgPackCodec;
pub use ndarray::{register_array_extension, ArrayExtension, DType, Element, NdArray};

/// Oldest MsgPack codec release the facade accepts.
pub const MIN_MSGPACK_VERSION: Version = Version::new(0, 5, 2);

/// Semantic version of a codec library.
///
/// Ordering is lexicographic over `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Create a version from its three components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A codec version below the required minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatch {
    pub found: Version,
    pub required: Version,
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "msgpack codec {} found, {} or newer required",
            self.found, self.required
        )
    }
}

/// Check a MsgPack codec version against [`MIN_MSGPACK_VERSION`].
pub fn check_msgpack_version(found: Version) -> std::result::Result<(), VersionMismatch> {
    if found >= MIN_MSGPACK_VERSION {
        Ok(())
    } else {
        Err(VersionMismatch {
            found,
            required: MIN_MSGPACK_VERSION,
        })
    }
}
