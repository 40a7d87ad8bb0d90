//! Backend availability and dispatch.
//!
//! A [`Codec`] names one of the two interchangeable backends. Whether it is
//! usable in this build is captured once by a [`Probe`] and frozen into a
//! [`Backend`]: either `Available(codec)` or `Unavailable(codec)`. An
//! unavailable backend keeps the same call surface; every call returns
//! [`SerializeError::MissingDependency`] naming the crates it needs.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(feature = "columnar")]
use crate::codec::ColumnarCodec;
#[cfg(feature = "msgpack")]
use crate::codec::MsgPackCodec;
use crate::codec::{DecodeLimits, Version};
use crate::error::{Result, SerializeError};

/// Environment variable set by Horovod launchers in every worker.
pub const HOROVOD_ENV: &str = "HOROVOD_RANK";

/// The two interchangeable serialization backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Binary-object codec (`serde-pickle`), selected by `pyarrow`.
    Columnar,
    /// Map-oriented MessagePack codec (`rmp-serde`), selected by `msgpack`.
    MsgPack,
}

impl Codec {
    /// Selection value naming this codec in `TENSORPACK_SERIALIZE`.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Columnar => "pyarrow",
            Codec::MsgPack => "msgpack",
        }
    }

    /// Cargo feature that compiles this codec in.
    pub fn feature(self) -> &'static str {
        match self {
            Codec::Columnar => "columnar",
            Codec::MsgPack => "msgpack",
        }
    }

    /// Crates the codec is built on.
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            Codec::Columnar => &["serde-pickle"],
            Codec::MsgPack => &["rmp-serde", "rmp"],
        }
    }

    fn dumps_name(self) -> &'static str {
        match self {
            Codec::Columnar => "dumps_pyarrow",
            Codec::MsgPack => "dumps_msgpack",
        }
    }

    fn loads_name(self) -> &'static str {
        match self {
            Codec::Columnar => "loads_pyarrow",
            Codec::MsgPack => "loads_msgpack",
        }
    }

    /// Failure returned by the stand-in for `func`.
    fn missing(self, func: &'static str) -> SerializeError {
        SerializeError::MissingDependency {
            func,
            packages: self.packages(),
            feature: self.feature(),
        }
    }
}

/// A codec resolved against what this build provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Codec compiled in; calls go to the codec.
    Available(Codec),
    /// Codec not compiled in; calls fail with `MissingDependency`.
    Unavailable(Codec),
}

impl Backend {
    /// Codec this backend stands for, available or not.
    pub fn codec(&self) -> Codec {
        match self {
            Backend::Available(codec) | Backend::Unavailable(codec) => *codec,
        }
    }

    /// Whether calls reach a real codec rather than the stand-in.
    pub fn is_available(&self) -> bool {
        matches!(self, Backend::Available(_))
    }

    /// Serialize `value` with this backend.
    pub fn dumps<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        match *self {
            #[cfg(feature = "columnar")]
            Backend::Available(Codec::Columnar) => ColumnarCodec::encode(value).map(Bytes::from),
            #[cfg(feature = "msgpack")]
            Backend::Available(Codec::MsgPack) => MsgPackCodec::encode(value).map(Bytes::from),
            #[allow(unreachable_patterns)]
            Backend::Available(codec) | Backend::Unavailable(codec) => {
                Err(codec.missing(codec.dumps_name()))
            }
        }
    }

    /// Deserialize `buf` with this backend. `limits` applies to MsgPack only.
    #[cfg_attr(not(feature = "msgpack"), allow(unused_variables))]
    pub fn loads<T: DeserializeOwned>(&self, buf: &[u8], limits: &DecodeLimits) -> Result<T> {
        match *self {
            #[cfg(feature = "columnar")]
            Backend::Available(Codec::Columnar) => ColumnarCodec::decode(buf),
            #[cfg(feature = "msgpack")]
            Backend::Available(Codec::MsgPack) => MsgPackCodec::decode_with_limits(buf, limits),
            #[allow(unreachable_patterns)]
            Backend::Available(codec) | Backend::Unavailable(codec) => {
                Err(codec.missing(codec.loads_name()))
            }
        }
    }
}

/// Snapshot of which codecs this process can use.
///
/// [`Probe::detect`] reflects the compiled features and environment. The
/// narrowing methods only ever remove capabilities, so a probe can never
/// claim a codec the build does not contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    columnar: bool,
    msgpack: Option<Version>,
    conflicting_runtime: bool,
}

impl Probe {
    /// Probe compiled features and the process environment.
    pub fn detect() -> Self {
        #[cfg(feature = "msgpack")]
        let msgpack = Some(MsgPackCodec::VERSION);
        #[cfg(not(feature = "msgpack"))]
        let msgpack = None;

        Self {
            columnar: cfg!(feature = "columnar"),
            msgpack,
            conflicting_runtime: std::env::var_os(HOROVOD_ENV).is_some(),
        }
    }

    /// Treat the columnar codec as missing.
    pub fn without_columnar(mut self) -> Self {
        self.columnar = false;
        self
    }

    /// Treat the MsgPack codec as missing.
    pub fn without_msgpack(mut self) -> Self {
        self.msgpack = None;
        self
    }

    /// Report a different MsgPack codec version, if MsgPack is present.
    pub fn with_msgpack_version(mut self, version: Version) -> Self {
        if self.msgpack.is_some() {
            self.msgpack = Some(version);
        }
        self
    }

    /// Override whether a runtime known to conflict with the columnar
    /// codec is loaded.
    pub fn with_conflicting_runtime(mut self, loaded: bool) -> Self {
        self.conflicting_runtime = loaded;
        self
    }

    pub fn has_columnar(&self) -> bool {
        self.columnar
    }

    /// Version of the MsgPack codec, `None` when it is not compiled in.
    pub fn msgpack_version(&self) -> Option<Version> {
        self.msgpack
    }

    pub fn conflicting_runtime(&self) -> bool {
        self.conflicting_runtime
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_metadata() {
        assert_eq!(Codec::Columnar.name(), "pyarrow");
        assert_eq!(Codec::MsgPack.name(), "msgpack");
        assert_eq!(Codec::MsgPack.packages(), &["rmp-serde", "rmp"]);
        assert_eq!(Codec::Columnar.feature(), "columnar");
    }

    #[test]
    fn test_backend_reports_codec_and_availability() {
        let available = Backend::Available(Codec::MsgPack);
        assert_eq!(available.codec(), Codec::MsgPack);
        assert!(available.is_available());

        let stand_in = Backend::Unavailable(Codec::Columnar);
        assert_eq!(stand_in.codec(), Codec::Columnar);
        assert!(!stand_in.is_available());
    }

    #[test]
    fn test_unavailable_dumps_is_missing_dependency() {
        let backend = Backend::Unavailable(Codec::MsgPack);
        assert!(!backend.is_available());

        match backend.dumps(&42u32) {
            Err(SerializeError::MissingDependency {
                func,
                packages,
                feature,
            }) => {
                assert_eq!(func, "dumps_msgpack");
                assert_eq!(packages, &["rmp-serde", "rmp"]);
                assert_eq!(feature, "msgpack");
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_loads_is_missing_dependency() {
        let backend = Backend::Unavailable(Codec::Columnar);
        let result: Result<u32> = backend.loads(&[0, 0, 0, 0], &DecodeLimits::default());
        match result {
            Err(SerializeError::MissingDependency { func, packages, .. }) => {
                assert_eq!(func, "loads_pyarrow");
                assert_eq!(packages, &["serde-pickle"]);
            }
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_available_msgpack_round_trip() {
        let backend = Backend::Available(Codec::MsgPack);
        let buf = backend.dumps(&vec!["x".to_string(), "y".to_string()]).unwrap();
        let decoded: Vec<String> = backend.loads(&buf, &DecodeLimits::default()).unwrap();
        assert_eq!(decoded, vec!["x", "y"]);
    }

    #[cfg(feature = "columnar")]
    #[test]
    fn test_available_columnar_round_trip() {
        let backend = Backend::Available(Codec::Columnar);
        let buf = backend.dumps(&(1u8, -2i64, 3.5f64)).unwrap();
        let decoded: (u8, i64, f64) = backend.loads(&buf, &DecodeLimits::STRICT).unwrap();
        assert_eq!(decoded, (1, -2, 3.5));
    }

    #[test]
    fn test_availability_narrowing() {
        let probe = Probe::detect()
            .without_columnar()
            .without_msgpack()
            .with_msgpack_version(Version::new(9, 9, 9))
            .with_conflicting_runtime(true);

        assert!(!probe.has_columnar());
        assert_eq!(probe.msgpack_version(), None);
        assert!(probe.conflicting_runtime());
    }

    #[cfg(all(feature = "columnar", feature = "msgpack"))]
    #[test]
    fn test_detect_reports_default_features() {
        let probe = Probe::detect();
        assert!(probe.has_columnar());
        assert_eq!(probe.msgpack_version(), Some(MsgPackCodec::VERSION));
    }
}
