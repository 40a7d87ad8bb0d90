//! # tensorpack-serialize
//!
//! Pluggable object serialization for moving data between processes.
//!
//! One `dumps`/`loads` pair fronts two interchangeable codecs. Which one is
//! used is decided once per process from the `TENSORPACK_SERIALIZE`
//! environment variable:
//!
//! - `pyarrow` (default) - binary-object codec built on `serde-pickle`
//! - `msgpack` - map-oriented MessagePack built on `rmp-serde`
//!
//! Each codec sits behind a cargo feature (`columnar`, `msgpack`; both on by
//! default). When the preferred codec is not compiled in, the facade falls
//! back to MsgPack; when a codec is missing entirely its entry points still
//! exist and fail with [`SerializeError::MissingDependency`].
//!
//! Any `serde` type can be serialized. Numeric arrays use
//! [`codec::NdArray`].
//!
//! ## Example
//!
//! ```
//! use tensorpack_serialize::codec::NdArray;
//!
//! let batch = NdArray::from_vec(vec![2, 2], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
//! let buf = tensorpack_serialize::dumps(&batch).unwrap();
//! let back: NdArray = tensorpack_serialize::loads(&buf).unwrap();
//! assert_eq!(back, batch);
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;

mod facade;

pub use backend::{Backend, Codec, Probe};
pub use config::{Preference, SerializeConfig};
pub use error::SerializeError;
pub use facade::{dumps, loads, serializer, Serializer};
