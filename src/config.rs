//! Serializer configuration.
//!
//! The backend preference comes from the `TENSORPACK_SERIALIZE` environment
//! variable and is read once, when a [`SerializeConfig`] is built.
//!
//! # Example
//!
//! ```
//! use tensorpack_serialize::config::{Preference, SerializeConfig};
//!
//! let config = SerializeConfig::from_value(Some("msgpack"));
//! assert_eq!(config.preference, Preference::MsgPack);
//!
//! let config = SerializeConfig::from_value(None);
//! assert_eq!(config.preference, Preference::Columnar);
//! ```

use crate::codec::DecodeLimits;

/// Environment variable selecting the serialization backend.
pub const ENV_SERIALIZE: &str = "TENSORPACK_SERIALIZE";

/// Backend requested through [`ENV_SERIALIZE`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Preference {
    /// `pyarrow`, or unset.
    #[default]
    Columnar,
    /// `msgpack`.
    MsgPack,
    /// Any other value. The columnar codec is not attempted.
    Unrecognized(String),
}

impl Preference {
    /// Parse an environment value; `None` means the variable is unset.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("pyarrow") => Preference::Columnar,
            Some("msgpack") => Preference::MsgPack,
            Some(other) => Preference::Unrecognized(other.to_string()),
        }
    }
}

/// Configuration for resolving a [`Serializer`](crate::Serializer).
#[derive(Debug, Clone, Default)]
pub struct SerializeConfig {
    /// Requested backend.
    pub preference: Preference,
    /// Length ceilings for MsgPack decoding.
    pub limits: DecodeLimits,
}

impl SerializeConfig {
    /// Read [`ENV_SERIALIZE`] from the process environment.
    pub fn from_env() -> Self {
        let value = std::env::var(ENV_SERIALIZE).ok();
        Self::from_value(value.as_deref())
    }

    /// Build from an explicit environment value.
    pub fn from_value(value: Option<&str>) -> Self {
        Self {
            preference: Preference::parse(value),
            ..Self::default()
        }
    }

    /// Set the backend preference.
    pub fn with_preference(mut self, preference: Preference) -> Self {
        self.preference = preference;
        self
    }

    /// Set the MsgPack decode limits.
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_MSGPACK_LEN;

    #[test]
    fn test_default_config() {
        let config = SerializeConfig::default();
        assert_eq!(config.preference, Preference::Columnar);
        assert_eq!(config.limits.max_bin_len, MAX_MSGPACK_LEN);
        assert_eq!(config.limits.max_map_len, MAX_MSGPACK_LEN);
    }

    #[test]
    fn test_parse_preference() {
        assert_eq!(Preference::parse(None), Preference::Columnar);
        assert_eq!(Preference::parse(Some("pyarrow")), Preference::Columnar);
        assert_eq!(Preference::parse(Some("msgpack")), Preference::MsgPack);
        assert_eq!(
            Preference::parse(Some("MSGPACK")),
            Preference::Unrecognized("MSGPACK".to_string())
        );
        assert_eq!(
            Preference::parse(Some("")),
            Preference::Unrecognized(String::new())
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = SerializeConfig::from_value(Some("msgpack"))
            .with_limits(DecodeLimits::STRICT)
            .with_preference(Preference::Columnar);
        assert_eq!(config.preference, Preference::Columnar);
        assert_eq!(config.limits, DecodeLimits::STRICT);
    }
}
