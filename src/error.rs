//! Error types for tensorpack-serialize.

use thiserror::Error;

use crate::codec::VersionMismatch;

/// Main error type for all serialization operations.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The backend behind this entry point was not compiled in.
    ///
    /// Returned at call time by the stand-in of an unavailable backend.
    #[error(
        "Cannot import {}, therefore '{func}' is not available (enable the `{feature}` feature)",
        quote_list(.packages)
    )]
    MissingDependency {
        /// Entry point that was invoked, e.g. `dumps_msgpack`.
        func: &'static str,
        /// Crates the backend needs.
        packages: &'static [&'static str],
        /// Cargo feature that enables the backend.
        feature: &'static str,
    },

    /// The MsgPack codec is older than the minimum supported version.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(VersionMismatch),

    /// MsgPack serialization error.
    #[cfg(feature = "msgpack")]
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[cfg(feature = "msgpack")]
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Columnar (pickle) serialization or deserialization error.
    #[cfg(feature = "columnar")]
    #[error("Columnar codec error: {0}")]
    Columnar(#[from] serde_pickle::Error),

    /// A MsgPack length header exceeds the configured decode limit.
    #[error("{kind} length {len} exceeds limit {max}")]
    LimitExceeded {
        /// Which limit was hit (`bin`, `str`, `array`, `map` or `ext`).
        kind: &'static str,
        /// Length announced by the buffer.
        len: u64,
        /// Configured ceiling.
        max: u64,
    },

    /// Numeric array whose data does not match its dtype and shape.
    #[error("Invalid array: {0}")]
    InvalidArray(String),
}

fn quote_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using SerializeError.
pub type Result<T> = std::result::Result<T, SerializeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Version;

    #[test]
    fn test_missing_dependency_message() {
        let err = SerializeError::MissingDependency {
            func: "loads_msgpack",
            packages: &["rmp-serde", "rmp"],
            feature: "msgpack",
        };
        assert_eq!(
            err.to_string(),
            "Cannot import 'rmp-serde', 'rmp', therefore 'loads_msgpack' is not available \
             (enable the `msgpack` feature)"
        );
    }

    #[test]
    fn test_unsupported_version_message() {
        let err = SerializeError::UnsupportedVersion(VersionMismatch {
            found: Version::new(0, 5, 1),
            required: Version::new(0, 5, 2),
        });
        let msg = err.to_string();
        assert!(msg.contains("0.5.1"), "{}", msg);
        assert!(msg.contains("0.5.2"), "{}", msg);
    }

    #[test]
    fn test_limit_exceeded_message() {
        let err = SerializeError::LimitExceeded {
            kind: "bin",
            len: 10,
            max: 5,
        };
        assert_eq!(err.to_string(), "bin length 10 exceeds limit 5");
    }
}
