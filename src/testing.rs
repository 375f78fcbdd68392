//! Security Testing Utilities
//!
//! Payload generators and fakes for exercising the gate from tests.
//!
//! # What This Module Provides
//!
//! - Attack payload generators (script, SQL, header injection, traversal)
//! - Credential probe pairs for login screening
//! - [`MemorySink`], an [`EventSink`] that records events for assertions
//! - [`ManualClock`], for driving lockout windows without sleeping
//!
//! Every payload here is caught by the signature catalog; none are clever
//! encodings that a literal matcher would miss.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use portcullis::observability::SecurityEvent;
//! use portcullis::sanitize::InputClassifier;
//! use portcullis::testing::{sql_injection_payloads, MemorySink};
//!
//! let sink = Arc::new(MemorySink::new());
//! let classifier = InputClassifier::new(sink.clone());
//!
//! for payload in sql_injection_payloads() {
//!     assert!(classifier.sanitize_input(payload).blocked, "{payload}");
//! }
//! assert_eq!(sink.count(SecurityEvent::InjectionBlocked), sql_injection_payloads().len());
//! ```

use parking_lot::Mutex;

use crate::observability::{EventRecord, EventSink, SecurityEvent};

pub use crate::clock::ManualClock;

// ============================================================================
// Attack Payload Generators
// ============================================================================

/// Script injection payloads
pub fn xss_payloads() -> Vec<&'static str> {
    vec![
        // Script tags
        "<script>alert('xss')</script>",
        "<SCRIPT>alert(1)</SCRIPT>",
        "<scr<script>ipt>alert(1)</script>",

        // Event handlers
        "<img src=x onerror=alert(1)>",
        "<svg onload=alert(1)>",
        "<svg/onload=alert(1)>",
        "<body onload=alert('xss')>",
        "<div onmouseover=alert(1)>hover</div>",
        "<button onclick=steal()>",

        // Script URLs
        "<a href=\"javascript:alert(1)\">click</a>",
        "<a href='vbscript:msgbox(1)'>",

        // Embedded content
        "<iframe src=//evil.example>",
        "<object data=evil.swf>",
        "<embed src=evil.swf>",
    ]
}

/// SQL injection payloads
pub fn sql_injection_payloads() -> Vec<&'static str> {
    vec![
        // Tautologies
        "' OR '1'='1",
        "' OR '1'='1'--",
        "1' OR '1'='1",

        // Comment truncation
        "admin'--",
        "admin'/*",
        "1 /* comment */ OR 1=1",

        // Union-based
        "' UNION SELECT NULL--",
        "1 UNION SELECT username, password FROM users",

        // Stacked queries
        "'; DROP TABLE users;--",
        "1; drop table sessions",
        "'; DELETE FROM accounts;--",
        "'; INSERT INTO users VALUES('hacker','pw');--",
        "x'; UPDATE SET role='admin'--",
    ]
}

/// Mail header injection payloads
pub fn header_injection_payloads() -> Vec<&'static str> {
    vec![
        "user@example.com\r\nBcc: victim@example.com",
        "user@example.com\nCc: victim@example.com",
        "user@example.com%0d%0aBcc: victim@example.com",
        "To: victim@example.com",
        "From: ceo@example.com\r\n",
    ]
}

/// Directory traversal payloads
pub fn path_traversal_payloads() -> Vec<&'static str> {
    vec![
        "../",
        "../../etc/passwd",
        "..\\..\\boot.ini",
        "....//....//etc/passwd",
        "/etc/shadow",
        "C:\\Windows\\System32\\config\\SAM",
    ]
}

/// Username/password pairs that try to bypass a login form
pub fn credential_probe_payloads() -> Vec<(&'static str, &'static str)> {
    vec![
        ("admin' OR '1'='1' --", "anything"),
        ("admin", "' OR '1'='1' --"),
        ("../../../etc/passwd", "password"),
        ("admin\0", "password"),
        ("admin'--", "x\0"),
    ]
}

/// Common weak passwords for testing password policy
pub fn weak_passwords() -> Vec<&'static str> {
    vec![
        "password",
        "123456",
        "12345678",
        "qwerty",
        "abc123",
        "password1",
        "letmein",
        "welcome",
        "iloveyou",
        "trustno1",
    ]
}

// ============================================================================
// Recording Sink
// ============================================================================

/// An [`EventSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, oldest first
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Number of events of kind `event`
    pub fn count(&self, event: SecurityEvent) -> usize {
        self.records.lock().iter().filter(|r| r.event == event).count()
    }

    /// Most recent event
    pub fn last(&self) -> Option<EventRecord> {
        self.records.lock().last().cloned()
    }

    /// Total number of events
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True when nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{matches, PatternCategory};

    #[test]
    fn test_payloads_hit_their_category() {
        for payload in xss_payloads() {
            assert!(matches(PatternCategory::Script, payload), "{payload}");
        }
        for payload in sql_injection_payloads() {
            assert!(matches(PatternCategory::SqlInjection, payload), "{payload}");
        }
        for payload in header_injection_payloads() {
            assert!(matches(PatternCategory::HeaderInjection, payload), "{payload:?}");
        }
        for payload in path_traversal_payloads() {
            assert!(matches(PatternCategory::PathTraversal, payload), "{payload}");
        }
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(&EventRecord::new(SecurityEvent::UploadBlocked, "blocked"));
        sink.emit(&EventRecord::new(SecurityEvent::UploadAccepted, "ok"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(SecurityEvent::UploadBlocked), 1);
        assert_eq!(sink.last().map(|r| r.event), Some(SecurityEvent::UploadAccepted));

        sink.clear();
        assert!(sink.is_empty());
    }
}
