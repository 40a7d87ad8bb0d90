//! Backend selection and the `dumps`/`loads` entry points.
//!
//! [`Serializer::resolve`] runs the selection once:
//! 1. The columnar codec is used only when the preference is `pyarrow` (or
//!    unset) and the codec is compiled in. If a Horovod worker is detected
//!    a one-time warning is logged, since the two are known to conflict.
//! 2. The MsgPack codec is probed independently. When present, the numeric
//!    array extension is registered and its version must be at least
//!    [`MIN_MSGPACK_VERSION`](crate::codec::MIN_MSGPACK_VERSION).
//! 3. Anything else selects MsgPack.
//!
//! The resulting [`Serializer`] is immutable. The crate-level [`dumps`] and
//! [`loads`] share one process-wide instance resolved from the environment
//! on first use; later changes to the environment have no effect.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use tensorpack_serialize::{Codec, Probe, SerializeConfig, Serializer};
//!
//! let config = SerializeConfig::from_value(Some("msgpack"));
//! let serializer = Serializer::resolve(config, &Probe::detect()).unwrap();
//! assert_eq!(serializer.selected(), Codec::MsgPack);
//!
//! let mut obj = BTreeMap::new();
//! obj.insert("b".to_string(), vec![1, 2, 3]);
//! let buf = serializer.dumps(&obj).unwrap();
//! let back: BTreeMap<String, Vec<i32>> = serializer.loads(&buf).unwrap();
//! assert_eq!(back, obj);
//! ```

use std::sync::{Once, OnceLock};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{Backend, Codec, Probe};
use crate::codec::{check_msgpack_version, register_array_extension, DecodeLimits, VersionMismatch};
use crate::config::{Preference, SerializeConfig, ENV_SERIALIZE};
use crate::error::{Result, SerializeError};

static CONFLICT_WARNING: Once = Once::new();

static GLOBAL: OnceLock<std::result::Result<Serializer, VersionMismatch>> = OnceLock::new();

/// Resolved backend selection with `dumps`/`loads` bound to it.
#[derive(Debug, Clone)]
pub struct Serializer {
    columnar: Backend,
    msgpack: Backend,
    selected: Codec,
    limits: DecodeLimits,
    conflict_warned: bool,
}

impl Serializer {
    /// Resolve from the `TENSORPACK_SERIALIZE` environment variable and the
    /// compiled features.
    pub fn from_env() -> Result<Self> {
        Self::resolve(SerializeConfig::from_env(), &Probe::detect())
    }

    /// Resolve `config` against what `probe` reports as available.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::UnsupportedVersion`] if the MsgPack codec
    /// is older than the supported minimum. This is not recoverable.
    pub fn resolve(config: SerializeConfig, probe: &Probe) -> Result<Self> {
        Self::try_resolve(config, probe).map_err(SerializeError::UnsupportedVersion)
    }

    fn try_resolve(
        config: SerializeConfig,
        probe: &Probe,
    ) -> std::result::Result<Self, VersionMismatch> {
        Self::try_resolve_with(config, probe, &CONFLICT_WARNING)
    }

    /// Resolve, logging the Horovod conflict warning at most once per `gate`.
    fn try_resolve_with(
        config: SerializeConfig,
        probe: &Probe,
        gate: &Once,
    ) -> std::result::Result<Self, VersionMismatch> {
        if let Preference::Unrecognized(value) = &config.preference {
            tracing::warn!(
                "Unrecognized {}={:?}, expected \"pyarrow\" or \"msgpack\"",
                ENV_SERIALIZE,
                value
            );
        }

        let columnar = if probe.has_columnar() {
            Backend::Available(Codec::Columnar)
        } else {
            Backend::Unavailable(Codec::Columnar)
        };
        let use_columnar = config.preference == Preference::Columnar && columnar.is_available();

        let mut conflict_warned = false;
        if use_columnar && probe.conflicting_runtime() {
            gate.call_once(|| {
                tracing::warn!(
                    "Horovod and pyarrow may conflict due to pyarrow bugs. \
                     Uninstall pyarrow and use msgpack instead."
                );
                conflict_warned = true;
            });
        }

        let msgpack = match probe.msgpack_version() {
            Some(version) => {
                register_array_extension();
                check_msgpack_version(version)?;
                Backend::Available(Codec::MsgPack)
            }
            None => Backend::Unavailable(Codec::MsgPack),
        };

        let selected = if use_columnar {
            Codec::Columnar
        } else {
            Codec::MsgPack
        };
        tracing::debug!(
            "Serialization backend: {} (columnar available: {}, msgpack available: {})",
            selected.name(),
            columnar.is_available(),
            msgpack.is_available()
        );

        Ok(Self {
            columnar,
            msgpack,
            selected,
            limits: config.limits,
            conflict_warned,
        })
    }

    /// Codec that `dumps`/`loads` dispatch to.
    pub fn selected(&self) -> Codec {
        self.selected
    }

    /// Availability of a specific codec.
    pub fn backend(&self, codec: Codec) -> Backend {
        match codec {
            Codec::Columnar => self.columnar,
            Codec::MsgPack => self.msgpack,
        }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Whether resolving this serializer logged the Horovod conflict
    /// warning. Only the first resolution in a process logs it.
    pub fn conflict_warned(&self) -> bool {
        self.conflict_warned
    }

    /// Serialize `value` with the selected backend.
    ///
    /// # Errors
    ///
    /// [`SerializeError::MissingDependency`] if the selected backend is not
    /// compiled in; otherwise the backend's own encode error, unchanged.
    pub fn dumps<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        self.backend(self.selected).dumps(value)
    }

    /// Deserialize a buffer produced by [`Serializer::dumps`].
    ///
    /// Buffers are not tagged with their backend; a buffer from the other
    /// backend fails as an ordinary decode error.
    pub fn loads<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T> {
        self.backend(self.selected).loads(buf, &self.limits)
    }

    /// Serialize with MsgPack regardless of the selection.
    pub fn dumps_msgpack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        self.msgpack.dumps(value)
    }

    /// Deserialize with MsgPack regardless of the selection.
    pub fn loads_msgpack<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T> {
        self.msgpack.loads(buf, &self.limits)
    }

    /// Serialize with the columnar codec regardless of the selection.
    pub fn dumps_columnar<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        self.columnar.dumps(value)
    }

    /// Deserialize with the columnar codec regardless of the selection.
    pub fn loads_columnar<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T> {
        self.columnar.loads(buf, &self.limits)
    }
}

/// Process-wide serializer, resolved from the environment on first call.
///
/// # Errors
///
/// If resolution failed, every call returns the same
/// [`SerializeError::UnsupportedVersion`].
pub fn serializer() -> Result<&'static Serializer> {
    let resolved = GLOBAL.get_or_init(|| {
        let resolved = Serializer::try_resolve(SerializeConfig::from_env(), &Probe::detect());
        if let Err(mismatch) = &resolved {
            tracing::error!("Serialization backend unusable: {}", mismatch);
        }
        resolved
    });
    resolved
        .as_ref()
        .map_err(|mismatch| SerializeError::UnsupportedVersion(*mismatch))
}

/// Serialize `value` with the process-wide backend.
pub fn dumps<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serializer()?.dumps(value)
}

/// Deserialize `buf` with the process-wide backend.
pub fn loads<T: DeserializeOwned>(buf: &[u8]) -> Result<T> {
    serializer()?.loads(buf)
}
