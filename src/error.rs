//! Error Types
//!
//! Expected outcomes (a rejected email, a throttled login, a blocked upload)
//! are values, not errors. [`GateError`] covers a caller breaking the API
//! contract, such as passing an empty identity. [`ConfigError`] is returned
//! by the configuration loaders and parsers.
//!
//! Neither is ever folded into a `blocked` decision; conflating "bad call"
//! with "attacker blocked" would corrupt the security event stream.

use thiserror::Error;

/// Errors returned by the gate's public operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// An identity was empty or whitespace only
    #[error("identity must not be empty")]
    EmptyIdentity,
}

/// Errors produced while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Environment variable or TOML key
        key: String,
        /// Raw value as supplied
        value: String,
        /// What was expected
        reason: String,
    },

    /// A TOML document could not be parsed
    #[error("failed to parse configuration: {0}")]
    Toml(String),
}

impl ConfigError {
    pub(crate) fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(GateError::EmptyIdentity.to_string(), "identity must not be empty");

        let err = ConfigError::invalid("PORTCULLIS_AUTO_UNLOCK", "maybe", "expected true or false");
        assert_eq!(
            err.to_string(),
            "invalid value for PORTCULLIS_AUTO_UNLOCK: \"maybe\" (expected true or false)"
        );
    }

    #[test]
    fn test_toml_error_converts() {
        let err: ConfigError = toml::from_str::<toml::Table>("key = ").unwrap_err().into();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().starts_with("failed to parse configuration: "));
    }
}
