//! Observability sinks
//!
//! Components never log directly. They build an [`EventRecord`] and hand it to
//! an injected [`EventSink`], which keeps decision logic independent of where
//! events end up. [`TracingSink`] is the production default.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{SecurityEvent, Severity};

/// A structured security event, already redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// What happened
    pub event: SecurityEvent,
    /// Human-readable summary
    pub message: &'static str,
    /// Event-specific fields in insertion order
    pub fields: Vec<(&'static str, String)>,
}

impl EventRecord {
    /// Start a record with no fields
    pub fn new(event: SecurityEvent, message: &'static str) -> Self {
        Self {
            event,
            message,
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Look up a field by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Severity of the underlying event
    pub fn severity(&self) -> Severity {
        self.event.severity()
    }

    /// Render fields as `key="value"` pairs separated by spaces.
    ///
    /// Values are quoted and escaped, so a value containing ` key=` cannot
    /// read as another field.
    pub fn render_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Destination for security events.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Deliver one event. Must not block on I/O for long; callers are on the
    /// request path.
    fn emit(&self, record: &EventRecord);
}

/// Forwards events to `tracing` through [`security_event!`](crate::security_event).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, record: &EventRecord) {
        let fields = record.render_fields();
        crate::security_event!(record.event, fields = %fields, "{}", record.message);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _record: &EventRecord) {}
}

/// Shared handle to the default sink
pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_in_order() {
        let record = EventRecord::new(SecurityEvent::AccountLocked, "locked")
            .field("identity", "a***#00")
            .field("failed_count", 5);
        assert_eq!(record.get("failed_count"), Some("5"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.render_fields(), r#"identity="a***#00" failed_count="5""#);
        assert_eq!(record.severity(), Severity::High);
    }

    #[test]
    fn test_rendered_values_cannot_add_fields() {
        let record = EventRecord::new(SecurityEvent::InputRejected, "rejected")
            .field("reason", "format")
            .field("payload", "x reason=empty security=false")
            .field("quoted", r#"x" reason="empty"#);
        let rendered = record.render_fields();

        assert_eq!(rendered.matches(r#"reason=""#).count(), 1, "{rendered}");
        assert!(!rendered.contains(r#"security=""#));
        assert!(rendered.starts_with(r#"reason="format" "#));
    }

    #[test]
    fn test_null_sink_accepts_events() {
        let sink = NullSink;
        sink.emit(&EventRecord::new(SecurityEvent::UploadAccepted, "ok"));
    }
}
