//! # Portcullis
//!
//! Input classification, upload screening and lockout-gated authentication.
//!
//! Portcullis is a synchronous, deterministic gate. It recognizes known attack
//! shapes in untrusted input, refuses or cleans what it finds, and throttles
//! identities that keep failing to log in. It is not a WAF, not an RFC 5322
//! parser and not a password hasher.
//!
//! ## Features
//!
//! - **Signature catalog**: SQL injection, script, mail header injection and
//!   path traversal signatures, matched case-insensitively
//! - **Free-text sanitization**: SQL path blocks; markup path strips and reports
//! - **Field validation**: email (security checks before format) and password
//!   (length baseline, opt-in richer rules)
//! - **Failed-login lockout**: per-identity counters with a sharded store and
//!   an atomic check-verify-update path
//! - **Upload screening**: extension denylist, traversal, NUL bytes, size
//! - **Structured events**: redacted [`observability::EventRecord`]s through an
//!   injected sink, forwarded to `tracing` by default
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use portcullis::{AuthenticationGateway, GateConfig, StaticCredentials, TracingSink};
//!
//! let config = GateConfig::from_env().unwrap_or_default();
//! let sink = Arc::new(TracingSink);
//!
//! let validator = config.field_validator(sink.clone());
//! assert!(validator.validate_email("user@example.com").valid);
//!
//! let credentials = StaticCredentials::new().with_user("alice", "correct-password");
//! let gateway = AuthenticationGateway::new(config.rate_limiter(sink.clone()), credentials)
//!     .with_sink(sink);
//!
//! let decision = gateway.login("alice", "wrong").unwrap();
//! assert!(!decision.authenticated);
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod login;
pub mod observability;
pub mod parse;
pub mod password;
pub mod patterns;
pub mod sanitize;
pub mod testing;
pub mod upload;
pub mod validation;


// Re-exports
pub use auth::{AuthenticationGateway, CredentialCheck, LoginDecision, StaticCredentials};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GateConfig, GateConfigBuilder};
pub use crypto::{constant_time_eq, secret_matches};
pub use error::{ConfigError, GateError};
pub use login::{AttemptRecord, Identity, LockoutPolicy, RateLimiter};
pub use observability::{EventRecord, EventSink, NullSink, SecurityEvent, Severity, TracingSink};
pub use parse::{parse_duration, parse_size};
pub use password::{PasswordPolicy, PasswordRule};
pub use patterns::PatternCategory;
pub use sanitize::{InputClassifier, SanitizationOutcome, ThreatLevel};
pub use upload::{FileDecision, FileDescriptor, FileUploadGate, UploadPolicy};
pub use validation::{FieldValidator, ValidationOutcome};
