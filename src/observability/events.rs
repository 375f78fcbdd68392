//! Security Event Vocabulary
//!
//! Every decision this crate makes that matters to an operator is described by
//! a [`SecurityEvent`]. Events carry a category and a [`Severity`] so downstream
//! alerting can route them without parsing messages.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::observability::{SecurityEvent, security_event};
//!
//! security_event!(
//!     SecurityEvent::AccountLocked,
//!     identity = %fingerprint,
//!     failed_count = 5,
//!     "Account locked after repeated failures"
//! );
//! ```

use std::fmt;

use serde::Serialize;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEvent {
    // Authentication events
    /// Credentials verified, counters reset
    AuthenticationSuccess,
    /// Credentials rejected, failure recorded
    AuthenticationFailure,
    /// Attempt refused before credentials were checked
    LoginThrottled,
    /// Failure threshold reached, lockout window started
    AccountLocked,
    /// Administrative reset of an identity's counters
    AccountUnlocked,

    // Input events
    /// SQL injection signature found in free text
    InjectionBlocked,
    /// Script markup removed from free text
    MarkupSanitized,
    /// Field rejected by a validator
    InputRejected,
    /// Login fields carried injection or traversal markers
    CredentialProbeDetected,

    // Upload events
    /// File refused by the upload gate
    UploadBlocked,
    /// File passed every upload check
    UploadAccepted,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::LoginThrottled => "authentication",

            Self::AccountLocked | Self::AccountUnlocked => "lockout",

            Self::InjectionBlocked
            | Self::MarkupSanitized
            | Self::InputRejected
            | Self::CredentialProbeDetected => "input",

            Self::UploadBlocked | Self::UploadAccepted => "upload",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::CredentialProbeDetected => Severity::Critical,

            Self::AuthenticationFailure
            | Self::LoginThrottled
            | Self::AccountLocked
            | Self::InjectionBlocked
            | Self::UploadBlocked => Severity::High,

            Self::AuthenticationSuccess
            | Self::AccountUnlocked
            | Self::MarkupSanitized
            | Self::InputRejected => Severity::Medium,

            Self::UploadAccepted => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::LoginThrottled => "login_throttled",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::InjectionBlocked => "injection_blocked",
            Self::MarkupSanitized => "markup_sanitized",
            Self::InputRejected => "input_rejected",
            Self::CredentialProbeDetected => "credential_probe_detected",
            Self::UploadBlocked => "upload_blocked",
            Self::UploadAccepted => "upload_accepted",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine operations
    Low,
    /// Notable but expected outcomes
    Medium,
    /// Rejected or throttled activity
    High,
    /// Active probing, needs a human
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro adds `security_event`, `category`, and `severity` fields and
/// picks the tracing level from the severity: critical → error, high → warn,
/// medium → info, low → debug.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
