//! Gate configuration
//!
//! One [`GateConfig`] holds the lockout, password and upload policies. It can
//! be built in code, read from environment variables, or parsed from TOML.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use portcullis::config::GateConfig;
//!
//! let config = GateConfig::builder()
//!     .max_failed_attempts(3)
//!     .lockout_duration(Duration::from_secs(600))
//!     .password_min_length(12)
//!     .max_upload_size(5 * 1024 * 1024)
//!     .build();
//!
//! assert_eq!(config.lockout.max_failed_attempts, 3);
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::login::{LockoutPolicy, RateLimiter};
use crate::observability::EventSink;
use crate::parse::{parse_bool, parse_duration, parse_size};
use crate::password::PasswordPolicy;
use crate::sanitize::InputClassifier;
use crate::upload::{FileUploadGate, UploadPolicy};
use crate::validation::FieldValidator;

/// Failure threshold
pub const ENV_MAX_FAILED_ATTEMPTS: &str = "PORTCULLIS_MAX_FAILED_ATTEMPTS";
/// Lockout window, e.g. `15m`
pub const ENV_LOCKOUT_DURATION: &str = "PORTCULLIS_LOCKOUT_DURATION";
/// Release identities when the window closes
pub const ENV_AUTO_UNLOCK: &str = "PORTCULLIS_AUTO_UNLOCK";
/// Minimum password length
pub const ENV_PASSWORD_MIN_LENGTH: &str = "PORTCULLIS_PASSWORD_MIN_LENGTH";
/// Upload size limit, e.g. `10MB`
pub const ENV_MAX_UPLOAD_SIZE: &str = "PORTCULLIS_MAX_UPLOAD_SIZE";

/// Policies for every gate component
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    /// Failed-login lockout
    pub lockout: LockoutPolicy,
    /// Password acceptance rules
    pub password: PasswordPolicy,
    /// Upload limits
    pub upload: UploadPolicy,
}

impl GateConfig {
    /// Create a new builder for programmatic configuration.
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORTCULLIS_MAX_FAILED_ATTEMPTS`: failures before lockout (default: 5)
    /// - `PORTCULLIS_LOCKOUT_DURATION`: e.g. "15m", "900s" (default: "15m")
    /// - `PORTCULLIS_AUTO_UNLOCK`: "true"/"false" (default: "false")
    /// - `PORTCULLIS_PASSWORD_MIN_LENGTH`: characters (default: 8)
    /// - `PORTCULLIS_MAX_UPLOAD_SIZE`: e.g. "10MB" (default: "10MB")
    ///
    /// Unset variables keep their defaults. Set but malformed variables are
    /// an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(raw) = lookup(ENV_MAX_FAILED_ATTEMPTS) {
            builder = builder.max_failed_attempts(parse_count(ENV_MAX_FAILED_ATTEMPTS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_LOCKOUT_DURATION) {
            builder = builder.lockout_duration(parse_duration(&raw).map_err(|e| rekey(e, ENV_LOCKOUT_DURATION))?);
        }
        if let Some(raw) = lookup(ENV_AUTO_UNLOCK) {
            builder = builder.auto_unlock(parse_bool(&raw).map_err(|e| rekey(e, ENV_AUTO_UNLOCK))?);
        }
        if let Some(raw) = lookup(ENV_PASSWORD_MIN_LENGTH) {
            let min = parse_count(ENV_PASSWORD_MIN_LENGTH, &raw)?;
            builder = builder.password_min_length(min as usize);
        }
        if let Some(raw) = lookup(ENV_MAX_UPLOAD_SIZE) {
            builder = builder.max_upload_size(parse_size(&raw).map_err(|e| rekey(e, ENV_MAX_UPLOAD_SIZE))?);
        }

        Ok(builder.build())
    }

    /// Parse a TOML document. Missing sections and keys keep their defaults.
    ///
    /// ```toml
    /// [lockout]
    /// max_failed_attempts = 5
    /// lockout_duration = "15m"
    /// auto_unlock = false
    ///
    /// [password]
    /// min_length = 8
    /// check_common_passwords = true
    ///
    /// [upload]
    /// max_size = "10MB"
    /// deny_extensions = ["svg"]
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(document)?;
        file.into_config()
    }

    /// Rate limiter using this lockout policy
    pub fn rate_limiter(&self, sink: Arc<dyn EventSink>) -> RateLimiter {
        RateLimiter::new(self.lockout.clone()).with_sink(sink)
    }

    /// Field validator using this password policy
    pub fn field_validator(&self, sink: Arc<dyn EventSink>) -> FieldValidator {
        FieldValidator::new(self.password.clone(), sink)
    }

    /// Upload gate using this upload policy
    pub fn upload_gate(&self, sink: Arc<dyn EventSink>) -> FileUploadGate {
        FileUploadGate::new(self.upload.clone(), sink)
    }

    /// Free-text classifier
    pub fn input_classifier(&self, sink: Arc<dyn EventSink>) -> InputClassifier {
        InputClassifier::new(sink)
    }
}

fn parse_count(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(key, raw, "expected a non-negative integer"))
}

fn rekey(err: ConfigError, key: &str) -> ConfigError {
    match err {
        ConfigError::InvalidValue { value, reason, .. } => ConfigError::invalid(key, value, reason),
        other => other,
    }
}

/// Builder for GateConfig
#[derive(Debug, Clone, Default)]
pub struct GateConfigBuilder {
    config: GateConfig,
}

impl GateConfigBuilder {
    /// Set the lockout policy wholesale.
    pub fn lockout(mut self, policy: LockoutPolicy) -> Self {
        self.config.lockout = policy;
        self
    }

    /// Set failures before lockout.
    pub fn max_failed_attempts(mut self, attempts: u32) -> Self {
        self.config.lockout.max_failed_attempts = attempts;
        self
    }

    /// Set the lockout window.
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.config.lockout.lockout_duration = duration;
        self
    }

    /// Release identities automatically when the window closes.
    pub fn auto_unlock(mut self, enabled: bool) -> Self {
        self.config.lockout.auto_unlock = enabled;
        self
    }

    /// Set the password policy wholesale.
    pub fn password(mut self, policy: PasswordPolicy) -> Self {
        self.config.password = policy;
        self
    }

    /// Set the minimum password length.
    pub fn password_min_length(mut self, len: usize) -> Self {
        self.config.password.min_length = len;
        self
    }

    /// Set the upload policy wholesale.
    pub fn upload(mut self, policy: UploadPolicy) -> Self {
        self.config.upload = policy;
        self
    }

    /// Set the upload size limit in bytes.
    pub fn max_upload_size(mut self, bytes: u64) -> Self {
        self.config.upload.max_size = bytes;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> GateConfig {
        self.config
    }
}

// ============================================================================
// TOML Layout
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    lockout: LockoutSection,
    password: PasswordSection,
    upload: UploadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LockoutSection {
    max_failed_attempts: Option<u32>,
    lockout_duration: Option<String>,
    auto_unlock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PasswordSection {
    min_length: Option<usize>,
    max_length: Option<usize>,
    required_character_classes: Option<usize>,
    check_common_passwords: Option<bool>,
    disallow_identity_in_password: Option<bool>,
    disallow_all_numeric: Option<bool>,
    blocked_passwords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UploadSection {
    max_size: Option<String>,
    deny_extensions: Vec<String>,
}

impl ConfigFile {
    fn into_config(self) -> Result<GateConfig, ConfigError> {
        let mut lockout = LockoutPolicy::default();
        if let Some(attempts) = self.lockout.max_failed_attempts {
            lockout.max_failed_attempts = attempts;
        }
        if let Some(raw) = self.lockout.lockout_duration {
            lockout.lockout_duration =
                parse_duration(&raw).map_err(|e| rekey(e, "lockout.lockout_duration"))?;
        }
        if let Some(auto_unlock) = self.lockout.auto_unlock {
            lockout.auto_unlock = auto_unlock;
        }

        let p = self.password;
        let mut password = PasswordPolicy::builder();
        if let Some(min) = p.min_length {
            password = password.min_length(min);
        }
        if let Some(max) = p.max_length {
            password = password.max_length(max);
        }
        if let Some(classes) = p.required_character_classes {
            password = password.require_character_classes(classes);
        }
        if let Some(check) = p.check_common_passwords {
            password = password.check_common_passwords(check);
        }
        if let Some(disallow) = p.disallow_identity_in_password {
            password = password.disallow_identity_in_password(disallow);
        }
        if let Some(disallow) = p.disallow_all_numeric {
            password = password.disallow_all_numeric(disallow);
        }
        let password = password.block_passwords(p.blocked_passwords).build();

        let mut upload = UploadPolicy::default().deny_extensions(self.upload.deny_extensions);
        if let Some(raw) = self.upload.max_size {
            upload.max_size = parse_size(&raw).map_err(|e| rekey(e, "upload.max_size"))?;
        }

        Ok(GateConfig {
            lockout,
            password,
            upload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(900));
        assert!(!config.lockout.auto_unlock);
        assert_eq!(config.password.min_length, 8);
        assert_eq!(config.upload.max_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_from_lookup_empty_keeps_defaults() {
        let config = GateConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.lockout, LockoutPolicy::default());
        assert_eq!(config.upload, UploadPolicy::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = GateConfig::from_lookup(lookup(&[
            (ENV_MAX_FAILED_ATTEMPTS, "3"),
            (ENV_LOCKOUT_DURATION, "30m"),
            (ENV_AUTO_UNLOCK, "true"),
            (ENV_PASSWORD_MIN_LENGTH, "12"),
            (ENV_MAX_UPLOAD_SIZE, "2MB"),
        ]))
        .unwrap();

        assert_eq!(config.lockout.max_failed_attempts, 3);
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(1800));
        assert!(config.lockout.auto_unlock);
        assert_eq!(config.password.min_length, 12);
        assert_eq!(config.upload.max_size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_from_lookup_rejects_malformed() {
        let err = GateConfig::from_lookup(lookup(&[(ENV_AUTO_UNLOCK, "maybe")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == ENV_AUTO_UNLOCK
        ));

        assert!(GateConfig::from_lookup(lookup(&[(ENV_MAX_FAILED_ATTEMPTS, "-1")])).is_err());
        assert!(GateConfig::from_lookup(lookup(&[(ENV_LOCKOUT_DURATION, "forever")])).is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = GateConfig::from_toml_str(
            r#"
            [lockout]
            max_failed_attempts = 4
            lockout_duration = "1h"

            [password]
            min_length = 10
            check_common_passwords = true
            blocked_passwords = ["AcmeCorp2024"]

            [upload]
            max_size = "1MB"
            deny_extensions = ["svg"]
            "#,
        )
        .unwrap();

        assert_eq!(config.lockout.max_failed_attempts, 4);
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(3600));
        assert_eq!(config.password.min_length, 10);
        assert!(config.password.check_common_passwords);
        assert!(config.password.blocked_passwords.contains("acmecorp2024"));
        assert_eq!(config.upload.max_size, 1024 * 1024);
        assert!(config.upload.is_denied(".svg"));
        assert!(config.upload.is_denied(".exe"));
    }

    #[test]
    fn test_from_toml_empty_document() {
        let config = GateConfig::from_toml_str("").unwrap();
        assert_eq!(config.lockout, LockoutPolicy::default());
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(matches!(
            GateConfig::from_toml_str("[lockout]\nmax_attempts = 3"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            GateConfig::from_toml_str("[upload]\nmax_size = \"lots\""),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = GateConfig::builder()
            .max_failed_attempts(3)
            .auto_unlock(true)
            .password_min_length(16)
            .build();
        assert_eq!(config.lockout.max_failed_attempts, 3);
        assert!(config.lockout.auto_unlock);
        assert_eq!(config.password.min_length, 16);
    }
}
