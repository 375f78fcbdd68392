//! Free-Text Classification and Sanitization
//!
//! Classifies untrusted free text (comments, search boxes, display names)
//! against the [`patterns`](crate::patterns) catalog and produces a cleaned copy.
//!
//! Two paths with deliberately different contracts:
//!
//! - **SQL path** ([`InputClassifier::sanitize_input`]): any SQL signature
//!   blocks the input with [`ThreatLevel::High`]. The sanitized copy has
//!   statement phrases and comment tokens removed and single quotes doubled.
//! - **Markup path** ([`InputClassifier::sanitize_html`]): strips the literal
//!   substrings `<script>`, `</script>`, `javascript:`, `onerror=`, `onload=`
//!   and reports [`ThreatLevel::Medium`] when anything was removed. It never
//!   sets `blocked`; free text is cleaned, not refused. Fields that must
//!   refuse markup outright (email) do so in [`validation`](crate::validation).
//!
//! Neither path is an HTML parser. Both strip to a fixpoint, ignoring ASCII case.
//!
//! Quote doubling is not idempotent: sanitizing `''` yields `''''`. Callers
//! that store sanitized text must sanitize exactly once.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::observability::{default_sink, preview_payload, EventRecord, EventSink, SecurityEvent};
use crate::patterns::{first_match, strip_all, PatternCategory, SQL_STRIP_SIGNATURES};

/// Literal markup removed by the markup path
pub const HTML_STRIP_SIGNATURES: &[&str] =
    &["<script>", "</script>", "javascript:", "onerror=", "onload="];

// ============================================================================
// Outcome Types
// ============================================================================

/// Ordinal severity assigned to a detected attack pattern.
///
/// Used for alert priority only; never compare levels across unrelated checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    /// Nothing detected
    #[default]
    None,
    /// Suspicious but harmless in context
    Low,
    /// Dangerous content that was neutralized
    Medium,
    /// Injection attempt, input refused
    High,
    /// Active attack on the authentication surface
    Critical,
}

impl ThreatLevel {
    /// Level name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying and sanitizing free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizationOutcome {
    /// Whether the caller must refuse the input
    pub blocked: bool,
    /// Cleaned copy of the input
    pub sanitized_input: String,
    /// Severity of what was found
    pub threat_level: ThreatLevel,
}

// ============================================================================
// Pure Transformations
// ============================================================================

/// Double every single quote.
pub fn escape_sql_quotes(input: &str) -> String {
    input.replace('\'', "''")
}

fn sanitize_sql(input: &str) -> (SanitizationOutcome, Option<&'static str>) {
    let signature = first_match(PatternCategory::SqlInjection, input);
    let stripped = strip_all(input, SQL_STRIP_SIGNATURES);
    let outcome = SanitizationOutcome {
        blocked: signature.is_some(),
        sanitized_input: escape_sql_quotes(&stripped),
        threat_level: if signature.is_some() {
            ThreatLevel::High
        } else {
            ThreatLevel::None
        },
    };
    (outcome, signature)
}

fn sanitize_markup(input: &str) -> SanitizationOutcome {
    let sanitized = strip_all(input, HTML_STRIP_SIGNATURES);
    let threat_level = if sanitized != input {
        ThreatLevel::Medium
    } else {
        ThreatLevel::None
    };
    SanitizationOutcome {
        blocked: false,
        sanitized_input: sanitized,
        threat_level,
    }
}

// ============================================================================
// Credential Screening
// ============================================================================

/// Marker raised when a login field looks like a bypass attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityFlag {
    /// A single quote in a credential field
    SqlInjectionAttempt,
    /// `../` in a credential field
    PathTraversalAttempt,
    /// NUL byte in a credential field
    NullByteInjection,
}

impl SecurityFlag {
    /// Flag name as reported to operators
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            Self::PathTraversalAttempt => "PATH_TRAVERSAL_ATTEMPT",
            Self::NullByteInjection => "NULL_BYTE_INJECTION",
        }
    }
}

impl fmt::Display for SecurityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags raised by [`InputClassifier::screen_credentials`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialScreening {
    /// Distinct flags, in detection order
    pub flags: Vec<SecurityFlag>,
}

impl CredentialScreening {
    /// True when any flag was raised
    pub fn is_blocked(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Operator-facing summary
    pub fn message(&self) -> String {
        if self.flags.is_empty() {
            return "Authentication failed".to_string();
        }
        let names: Vec<&str> = self.flags.iter().map(SecurityFlag::as_str).collect();
        format!("Blocked due to: {}", names.join(", "))
    }
}

fn screen_fields(fields: [&str; 2]) -> CredentialScreening {
    let checks: [(SecurityFlag, fn(&str) -> bool); 3] = [
        (SecurityFlag::SqlInjectionAttempt, |f| f.contains('\'')),
        (SecurityFlag::PathTraversalAttempt, |f| f.contains("../")),
        (SecurityFlag::NullByteInjection, |f| f.contains('\0')),
    ];

    let flags = checks
        .iter()
        .filter(|(_, check)| fields.iter().any(|f| check(f)))
        .map(|(flag, _)| *flag)
        .collect();

    CredentialScreening { flags }
}

// ============================================================================
// Classifier
// ============================================================================

/// Free-text classifier that reports what it found to an [`EventSink`].
#[derive(Debug, Clone)]
pub struct InputClassifier {
    sink: Arc<dyn EventSink>,
}

impl Default for InputClassifier {
    fn default() -> Self {
        Self::new(default_sink())
    }
}

impl InputClassifier {
    /// Create a classifier reporting to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// SQL-focused sanitization.
    ///
    /// Blocks with [`ThreatLevel::High`] when any SQL signature (including a
    /// bare `'`) is present.
    pub fn sanitize_input(&self, input: &str) -> SanitizationOutcome {
        let (outcome, signature) = sanitize_sql(input);

        if let Some(signature) = signature {
            self.sink.emit(
                &EventRecord::new(SecurityEvent::InjectionBlocked, "SQL injection pattern blocked")
                    .field("category", PatternCategory::SqlInjection)
                    .field("signature", preview_payload(signature))
                    .field("threat_level", outcome.threat_level)
                    .field("payload", preview_payload(input)),
            );
        }

        outcome
    }

    /// XSS-focused sanitization. Never blocks.
    pub fn sanitize_html(&self, input: &str) -> SanitizationOutcome {
        let outcome = sanitize_markup(input);

        if outcome.threat_level != ThreatLevel::None {
            self.sink.emit(
                &EventRecord::new(SecurityEvent::MarkupSanitized, "Script markup removed")
                    .field("category", PatternCategory::Script)
                    .field("threat_level", outcome.threat_level)
                    .field("payload", preview_payload(input)),
            );
        }

        outcome
    }

    /// Classify free text: the SQL path when any SQL signature is present,
    /// otherwise the markup path.
    pub fn classify(&self, input: &str) -> SanitizationOutcome {
        if first_match(PatternCategory::SqlInjection, input).is_some() {
            self.sanitize_input(input)
        } else {
            self.sanitize_html(input)
        }
    }

    /// Flag login fields that carry bypass markers.
    ///
    /// Both fields are checked; each flag is reported once.
    pub fn screen_credentials(&self, username: &str, password: &str) -> CredentialScreening {
        let screening = screen_fields([username, password]);

        if screening.is_blocked() {
            let flags: Vec<&str> = screening.flags.iter().map(SecurityFlag::as_str).collect();
            self.sink.emit(
                &EventRecord::new(
                    SecurityEvent::CredentialProbeDetected,
                    "Credential fields carry bypass markers",
                )
                .field("flags", flags.join(","))
                .field("username", preview_payload(username)),
            );
        }

        screening
    }
}
