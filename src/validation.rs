//! Field Validation
//!
//! Format-level checks for the email and password fields of a login or
//! registration form, layered on top of the attack signature catalog.
//!
//! Email checks run in a fixed order and the first failure wins:
//!
//! 1. empty or whitespace
//! 2. SQL injection signatures
//! 3. script signatures (the full catalog, wider than the markup sanitizer)
//! 4. header injection markers
//! 5. path traversal markers
//! 6. format: one `@`, non-empty local part, dotted domain, length limits
//!
//! Security checks come before the format check so a malformed but malicious
//! string is reported as an attack, not as a typo.
//!
//! # Usage
//!
//! ```
//! use portcullis::validation::FieldValidator;
//!
//! let validator = FieldValidator::default();
//!
//! let ok = validator.validate_email("user@example.com");
//! assert!(ok.valid);
//!
//! let bad = validator.validate_email("<script>@x.com");
//! assert_eq!(bad.error_message, "Invalid HTML/script content detected");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::observability::{default_sink, preview_payload, EventRecord, EventSink, SecurityEvent};
use crate::password::PasswordPolicy;
use crate::patterns::{matches, strip_all, PatternCategory};

/// Maximum total length of an email address
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of the local part of an email address
pub const MAX_EMAIL_LOCAL_LENGTH: usize = 64;

/// Substrings removed from a rejected field before it is echoed back
pub const STRIP_SIGNATURES: &[&str] = &["../", "--", "<", ">", "'", "\"", ";", "\r", "\n"];

// ============================================================================
// Outcome
// ============================================================================

/// Why a field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Nothing supplied
    Empty,
    /// SQL signature present
    SqlInjection,
    /// Script signature present
    Script,
    /// CR/LF or mail header name present
    HeaderInjection,
    /// Traversal signature present
    PathTraversal,
    /// Malformed but harmless
    Format,
    /// Password policy violation
    Policy,
}

impl RejectionReason {
    /// Reason name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SqlInjection => "sql_injection",
            Self::Script => "script",
            Self::HeaderInjection => "header_injection",
            Self::PathTraversal => "path_traversal",
            Self::Format => "format",
            Self::Policy => "policy",
        }
    }

    /// True for rejections caused by an attack signature
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::SqlInjection | Self::Script | Self::HeaderInjection | Self::PathTraversal
        )
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of validating a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Whether the field is acceptable
    pub valid: bool,
    /// User-facing reason, empty when valid
    pub error_message: String,
    /// Copy safe to echo back to the user
    pub sanitized_input: String,
    /// Machine-readable reason, `None` when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
}

impl ValidationOutcome {
    fn accept(sanitized: impl Into<String>) -> Self {
        Self {
            valid: true,
            error_message: String::new(),
            sanitized_input: sanitized.into(),
            reason: None,
        }
    }

    fn reject(
        reason: RejectionReason,
        message: impl Into<String>,
        sanitized: impl Into<String>,
    ) -> Self {
        Self {
            valid: false,
            error_message: message.into(),
            sanitized_input: sanitized.into(),
            reason: Some(reason),
        }
    }
}

/// Remove markup, quotes, statement separators, comment tokens, line breaks,
/// and `../` until none remain.
pub fn strip_dangerous_chars(input: &str) -> String {
    strip_all(input, STRIP_SIGNATURES)
}

fn is_well_formed_email(email: &str) -> bool {
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && local.chars().count() <= MAX_EMAIL_LOCAL_LENGTH
        && !domain.is_empty()
        && domain.contains('.')
}

// ============================================================================
// Validator
// ============================================================================

/// Email and password field validator.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    password_policy: PasswordPolicy,
    sink: Arc<dyn EventSink>,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::new(PasswordPolicy::default(), default_sink())
    }
}

impl FieldValidator {
    /// Create a validator with a password policy, reporting to `sink`
    pub fn new(password_policy: PasswordPolicy, sink: Arc<dyn EventSink>) -> Self {
        Self {
            password_policy,
            sink,
        }
    }

    /// The password policy in force
    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password_policy
    }

    /// Validate an email address.
    pub fn validate_email(&self, email: &str) -> ValidationOutcome {
        if email.trim().is_empty() {
            return ValidationOutcome::reject(RejectionReason::Empty, "Email cannot be empty", "");
        }

        let security_checks = [
            (
                PatternCategory::SqlInjection,
                RejectionReason::SqlInjection,
                "Invalid characters detected",
            ),
            (
                PatternCategory::Script,
                RejectionReason::Script,
                "Invalid HTML/script content detected",
            ),
            (
                PatternCategory::HeaderInjection,
                RejectionReason::HeaderInjection,
                "Invalid email format - header injection detected",
            ),
            (
                PatternCategory::PathTraversal,
                RejectionReason::PathTraversal,
                "Invalid characters in email address",
            ),
        ];

        for (category, reason, message) in security_checks {
            if matches(category, email) {
                let outcome =
                    ValidationOutcome::reject(reason, message, strip_dangerous_chars(email));
                self.report("email", reason, email);
                return outcome;
            }
        }

        if !is_well_formed_email(email) {
            self.report("email", RejectionReason::Format, email);
            return ValidationOutcome::reject(RejectionReason::Format, "Invalid email format", email);
        }

        ValidationOutcome::accept(email)
    }

    /// Validate a password, optionally against the identity it belongs to.
    ///
    /// The sanitized copy is always empty; passwords are never echoed.
    pub fn validate_password(&self, password: &str, identity_hint: Option<&str>) -> ValidationOutcome {
        match self
            .password_policy
            .validate_with_identity(password, identity_hint)
        {
            Ok(()) => ValidationOutcome::accept(""),
            Err(err) => {
                self.sink.emit(
                    &EventRecord::new(SecurityEvent::InputRejected, "Password rejected by policy")
                        .field("field", "password")
                        .field("reason", RejectionReason::Policy)
                        .field("rule", err.code()),
                );
                ValidationOutcome::reject(RejectionReason::Policy, err.to_string(), "")
            }
        }
    }

    fn report(&self, field: &'static str, reason: RejectionReason, payload: &str) {
        self.sink.emit(
            &EventRecord::new(SecurityEvent::InputRejected, "Field rejected")
                .field("field", field)
                .field("reason", reason)
                .field("security", reason.is_security())
                .field("payload", preview_payload(payload)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{header_injection_payloads, xss_payloads, MemorySink};

    fn validator() -> (FieldValidator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (
            FieldValidator::new(PasswordPolicy::default(), sink.clone()),
            sink,
        )
    }

    #[test]
    fn test_valid_email() {
        let (validator, sink) = validator();
        let outcome = validator.validate_email("user.name+tag@example.co.uk");
        assert!(outcome.valid);
        assert_eq!(outcome.error_message, "");
        assert_eq!(outcome.sanitized_input, "user.name+tag@example.co.uk");
        assert_eq!(outcome.reason, None);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_email() {
        let (validator, _) = validator();
        for input in ["", "   ", "\t"] {
            let outcome = validator.validate_email(input);
            assert!(!outcome.valid);
            assert_eq!(outcome.error_message, "Email cannot be empty");
            assert_eq!(outcome.sanitized_input, "");
        }
    }

    #[test]
    fn test_missing_at_is_format_error() {
        let (validator, _) = validator();
        for input in ["userexample.com", "plainaddress", "no-at.example.org"] {
            let outcome = validator.validate_email(input);
            assert!(!outcome.valid);
            assert_eq!(outcome.error_message, "Invalid email format");
            assert_eq!(outcome.reason, Some(RejectionReason::Format));
            assert_eq!(outcome.sanitized_input, input);
        }
    }

    #[test]
    fn test_format_rules() {
        let (validator, _) = validator();
        assert!(!validator.validate_email("a@b@example.com").valid);
        assert!(!validator.validate_email("@example.com").valid);
        assert!(!validator.validate_email("user@").valid);
        assert!(!validator.validate_email("user@localhost").valid);

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(!validator.validate_email(&long_local).valid);
        let max_local = format!("{}@example.com", "a".repeat(64));
        assert!(validator.validate_email(&max_local).valid);

        let long_total = format!("user@{}.com", "d".repeat(250));
        assert!(!validator.validate_email(&long_total).valid);
    }

    #[test]
    fn test_sql_injection_email() {
        let (validator, sink) = validator();
        let outcome = validator.validate_email("admin'--@example.com");
        assert!(!outcome.valid);
        assert_eq!(outcome.error_message, "Invalid characters detected");
        assert_eq!(outcome.sanitized_input, "admin@example.com");
        assert_eq!(sink.count(SecurityEvent::InputRejected), 1);
    }

    #[test]
    fn test_sql_checked_before_format() {
        let (validator, _) = validator();
        let outcome = validator.validate_email("x'; DROP TABLE users");
        assert_eq!(outcome.reason, Some(RejectionReason::SqlInjection));
    }

    #[test]
    fn test_script_email() {
        let (validator, _) = validator();
        for payload in xss_payloads() {
            let outcome = validator.validate_email(&format!("{payload}@example.com"));
            assert!(!outcome.valid, "accepted: {payload}");
            assert!(outcome.reason.is_some_and(|r| r.is_security()));
        }

        let outcome = validator.validate_email("<iframe src=x>@example.com");
        assert_eq!(outcome.error_message, "Invalid HTML/script content detected");
        assert_eq!(outcome.sanitized_input, "iframe src=x@example.com");
    }

    #[test]
    fn test_header_injection_email() {
        let (validator, _) = validator();
        for payload in header_injection_payloads() {
            let outcome = validator.validate_email(payload);
            assert!(!outcome.valid, "accepted: {payload:?}");
        }

        let outcome = validator.validate_email("user@example.com\r\nBcc: victim@example.com");
        assert_eq!(
            outcome.error_message,
            "Invalid email format - header injection detected"
        );
        assert!(!outcome.sanitized_input.contains('\n'));
    }

    #[test]
    fn test_path_traversal_email() {
        let (validator, _) = validator();
        let outcome = validator.validate_email("../../etc/passwd@example.com");
        assert_eq!(outcome.error_message, "Invalid characters in email address");
        assert_eq!(outcome.sanitized_input, "etc/passwd@example.com");
    }

    #[test]
    fn test_strip_dangerous_chars() {
        assert_eq!(strip_dangerous_chars("<b>'hi';</b>"), "bhi/b");
        assert_eq!(strip_dangerous_chars("....//x"), "x");
        assert_eq!(strip_dangerous_chars("-\u{2d}-"), "-");
    }

    #[test]
    fn test_password_boundary() {
        let (validator, _) = validator();
        let ok = validator.validate_password("abcdefgh", None);
        assert!(ok.valid);
        assert_eq!(ok.sanitized_input, "");

        let short = validator.validate_password("abcdefg", None);
        assert!(!short.valid);
        assert_eq!(
            short.error_message,
            "Password must be at least 8 characters long"
        );
        assert_eq!(short.sanitized_input, "");
    }

    #[test]
    fn test_password_empty() {
        let (validator, sink) = validator();
        let outcome = validator.validate_password("", Some("alice"));
        assert!(!outcome.valid);
        assert_eq!(outcome.error_message, "Password cannot be empty");
        assert_eq!(sink.count(SecurityEvent::InputRejected), 1);
    }

    #[test]
    fn test_password_never_logged() {
        let (validator, sink) = validator();
        validator.validate_password("hunter2", None);
        let records = sink.records();
        assert!(records
            .iter()
            .all(|r| r.fields.iter().all(|(_, v)| !v.contains("hunter2"))));
    }

    #[test]
    fn test_password_identity_hint() {
        let sink = Arc::new(MemorySink::new());
        let policy = PasswordPolicy::builder()
            .disallow_identity_in_password(true)
            .build();
        let validator = FieldValidator::new(policy, sink);

        assert!(!validator.validate_password("alice-rocks-1", Some("alice")).valid);
        assert!(validator.validate_password("alice-rocks-1", None).valid);
    }
}
