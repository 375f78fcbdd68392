//! Password Policy
//!
//! The baseline policy is length-only: a password must be non-empty and at
//! least 8 characters, counted in Unicode scalar values. Everything beyond
//! that is opt-in through the builder:
//!
//! - maximum length
//! - required character classes (lowercase, uppercase, digit, other)
//! - common-password denylist, including `common + digits` variants
//! - identity-in-password (username, or the local part of an email)
//! - all-numeric (PIN-like) passwords
//! - application block list
//! - caller-supplied [`PasswordRule`] trait objects
//!
//! # Usage
//!
//! ```
//! use portcullis::password::{PasswordError, PasswordPolicy};
//!
//! let policy = PasswordPolicy::default();
//! assert!(policy.validate("correct horse").is_ok());
//! assert!(matches!(policy.validate("short"), Err(PasswordError::TooShort { .. })));
//!
//! let strict = PasswordPolicy::builder()
//!     .min_length(12)
//!     .check_common_passwords(true)
//!     .disallow_identity_in_password(true)
//!     .build();
//! assert!(strict.validate_with_identity("alice-secret-2024", Some("alice")).is_err());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Minimum length of the baseline policy
pub const DEFAULT_MIN_LENGTH: usize = 8;

// ============================================================================
// Extension Point
// ============================================================================

/// A caller-defined password rule.
///
/// Returning `Some(reason)` rejects the password with that reason.
pub trait PasswordRule: Send + Sync + fmt::Debug {
    /// Short rule name for logs
    fn name(&self) -> &str;

    /// Check a password, with the identity it belongs to when known
    fn check(&self, password: &str, identity: Option<&str>) -> Option<String>;
}

// ============================================================================
// Password Policy Configuration
// ============================================================================

/// Password policy.
///
/// [`Default`] is the length-only baseline. Richer rules are switched on
/// individually.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum length in characters
    pub min_length: usize,

    /// Maximum length in characters, unlimited when `None`
    pub max_length: Option<usize>,

    /// Number of character classes (of 4) the password must draw from
    pub required_character_classes: usize,

    /// Reject passwords on the built-in common list
    pub check_common_passwords: bool,

    /// Reject passwords containing the identity
    pub disallow_identity_in_password: bool,

    /// Reject passwords made only of ASCII digits
    pub disallow_all_numeric: bool,

    /// Application block list, stored lowercase
    pub blocked_passwords: HashSet<String>,

    rules: Vec<Arc<dyn PasswordRule>>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: None,
            required_character_classes: 0,
            check_common_passwords: false,
            disallow_identity_in_password: false,
            disallow_all_numeric: false,
            blocked_passwords: HashSet::new(),
            rules: Vec::new(),
        }
    }
}

impl PasswordPolicy {
    /// Create a new builder starting from the baseline
    pub fn builder() -> PasswordPolicyBuilder {
        PasswordPolicyBuilder::default()
    }

    /// Baseline plus every built-in rule
    pub fn strict() -> Self {
        Self::builder()
            .min_length(12)
            .max_length(128)
            .require_character_classes(3)
            .check_common_passwords(true)
            .disallow_identity_in_password(true)
            .disallow_all_numeric(true)
            .build()
    }

    /// Number of caller-supplied rules
    pub fn custom_rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Validate a password against the policy
    pub fn validate(&self, password: &str) -> Result<(), PasswordError> {
        self.validate_with_identity(password, None)
    }

    /// Validate a password, checking it against the owning identity when given
    pub fn validate_with_identity(
        &self,
        password: &str,
        identity: Option<&str>,
    ) -> Result<(), PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::Empty);
        }

        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordError::TooShort {
                min: self.min_length,
                actual: length,
            });
        }

        if let Some(max) = self.max_length {
            if length > max {
                return Err(PasswordError::TooLong { max, actual: length });
            }
        }

        if self.required_character_classes > 0 {
            let found = character_classes(password);
            if found < self.required_character_classes {
                return Err(PasswordError::TooFewCharacterClasses {
                    required: self.required_character_classes,
                    found,
                });
            }
        }

        if self.disallow_all_numeric && password.chars().all(|c| c.is_ascii_digit()) {
            return Err(PasswordError::AllNumeric);
        }

        if self.disallow_identity_in_password {
            if let Some(identity) = identity {
                if contains_identity(password, identity) {
                    return Err(PasswordError::ContainsIdentity);
                }
            }
        }

        if self.blocked_passwords.contains(&password.to_lowercase()) {
            return Err(PasswordError::Blocked);
        }

        if self.check_common_passwords && is_common_password(password) {
            return Err(PasswordError::TooCommon);
        }

        for rule in &self.rules {
            if let Some(reason) = rule.check(password, identity) {
                return Err(PasswordError::Rule {
                    rule: rule.name().to_string(),
                    reason,
                });
            }
        }

        Ok(())
    }

    /// Estimate password strength (informational, not for validation)
    pub fn estimate_strength(&self, password: &str) -> PasswordStrength {
        let len = password.chars().count();
        let classes = character_classes(password);

        if len < 8 {
            PasswordStrength::VeryWeak
        } else if len < 12 && classes < 2 {
            PasswordStrength::Weak
        } else if len < 12 {
            PasswordStrength::Fair
        } else if len >= 16 && classes >= 3 {
            PasswordStrength::Strong
        } else {
            PasswordStrength::Good
        }
    }
}

fn character_classes(password: &str) -> usize {
    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_other = password.chars().any(|c| !c.is_alphanumeric());

    [has_lower, has_upper, has_digit, has_other]
        .iter()
        .filter(|&&x| x)
        .count()
}

/// Username match, or the local part of an email when it is longer than 2 chars.
fn contains_identity(password: &str, identity: &str) -> bool {
    let password = password.to_lowercase();
    let identity = identity.trim().to_lowercase();
    if identity.is_empty() {
        return false;
    }
    if password.contains(&identity) {
        return true;
    }
    match identity.split_once('@') {
        Some((local, _)) if local.chars().count() > 2 => password.contains(local),
        _ => false,
    }
}

/// Builder for [`PasswordPolicy`]
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicyBuilder {
    policy: PasswordPolicy,
}

impl PasswordPolicyBuilder {
    /// Set minimum password length
    pub fn min_length(mut self, len: usize) -> Self {
        self.policy.min_length = len;
        self
    }

    /// Set maximum password length
    pub fn max_length(mut self, len: usize) -> Self {
        self.policy.max_length = Some(len);
        self
    }

    /// Require `count` of lowercase, uppercase, digit, other
    pub fn require_character_classes(mut self, count: usize) -> Self {
        self.policy.required_character_classes = count.min(4);
        self
    }

    /// Enable/disable common password checking
    pub fn check_common_passwords(mut self, check: bool) -> Self {
        self.policy.check_common_passwords = check;
        self
    }

    /// Enable/disable identity-in-password check
    pub fn disallow_identity_in_password(mut self, disallow: bool) -> Self {
        self.policy.disallow_identity_in_password = disallow;
        self
    }

    /// Enable/disable all-numeric password check
    pub fn disallow_all_numeric(mut self, disallow: bool) -> Self {
        self.policy.disallow_all_numeric = disallow;
        self
    }

    /// Add custom blocked passwords
    pub fn block_passwords(
        mut self,
        passwords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.policy
            .blocked_passwords
            .extend(passwords.into_iter().map(|p| p.into().to_lowercase()));
        self
    }

    /// Append a caller-defined rule
    pub fn rule(mut self, rule: impl PasswordRule + 'static) -> Self {
        self.policy.rules.push(Arc::new(rule));
        self
    }

    /// Build the policy
    pub fn build(self) -> PasswordPolicy {
        self.policy
    }
}

// ============================================================================
// Password Errors
// ============================================================================

/// Reasons a password is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    /// Nothing supplied
    #[error("Password cannot be empty")]
    Empty,
    /// Below the minimum length
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize, actual: usize },
    /// Above the maximum length
    #[error("Password must be at most {max} characters long")]
    TooLong { max: usize, actual: usize },
    /// Not enough character variety
    #[error("Password must use at least {required} of: lowercase, uppercase, digits, symbols")]
    TooFewCharacterClasses { required: usize, found: usize },
    /// On the common list
    #[error("Password is too common")]
    TooCommon,
    /// Contains the username or email
    #[error("Password cannot contain your username or email")]
    ContainsIdentity,
    /// On the application block list
    #[error("This password is not allowed")]
    Blocked,
    /// Digits only
    #[error("Password cannot be all numbers")]
    AllNumeric,
    /// Rejected by a caller-defined rule
    #[error("{reason}")]
    Rule { rule: String, reason: String },
}

impl PasswordError {
    /// Stable code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort { .. } => "too_short",
            Self::TooLong { .. } => "too_long",
            Self::TooFewCharacterClasses { .. } => "character_classes",
            Self::TooCommon => "too_common",
            Self::ContainsIdentity => "contains_identity",
            Self::Blocked => "blocked",
            Self::AllNumeric => "all_numeric",
            Self::Rule { .. } => "custom_rule",
        }
    }
}

// ============================================================================
// Password Strength (Informational)
// ============================================================================

/// Password strength estimation (informational only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    /// Easily guessable
    VeryWeak,
    /// Could be cracked quickly
    Weak,
    /// Acceptable but not ideal
    Fair,
    /// Reasonably strong
    Good,
    /// Very difficult to crack
    Strong,
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryWeak => write!(f, "very_weak"),
            Self::Weak => write!(f, "weak"),
            Self::Fair => write!(f, "fair"),
            Self::Good => write!(f, "good"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

// ============================================================================
// Common Password List
// ============================================================================

/// Direct hit, or a common base of 4+ chars followed only by digits
fn is_common_password(password: &str) -> bool {
    let lower = password.to_lowercase();

    if COMMON_PASSWORDS.contains(&lower.as_str()) {
        return true;
    }

    COMMON_PASSWORDS.iter().any(|common| {
        common.len() >= 4
            && lower
                .strip_prefix(common)
                .is_some_and(|suffix| suffix.chars().all(|c| c.is_ascii_digit()))
    })
}

static COMMON_PASSWORDS: &[&str] = &[
    "123456", "password", "12345678", "qwerty", "123456789",
    "12345", "1234", "111111", "1234567", "dragon",
    "123123", "baseball", "abc123", "football", "monkey",
    "letmein", "shadow", "master", "666666", "qwertyuiop",
    "123321", "mustang", "1234567890", "michael", "654321",
    "superman", "1qaz2wsx", "7777777", "121212", "000000",
    "qazwsx", "123qwe", "killer", "trustno1", "jordan",
    "zxcvbnm", "asdfgh", "hunter", "buster", "soccer",
    "harley", "batman", "tigger", "sunshine", "iloveyou",
    "charlie", "hockey", "ranger", "starwars", "computer",
    "freedom", "princess", "cheese", "summer", "access",
    "thunder", "matrix", "password1", "password123", "passw0rd",
    "admin", "admin123", "root", "toor", "pass123",
    "qwerty123", "welcome", "welcome1", "login", "guest",
    "changeme", "test123", "testing", "default", "secret",
    "administrator",
];

// ============================================================================
// Tests
// ============================================================================
