//! Observability (security events)
//!
//! Every component in this crate reports what it decided through an injected
//! [`EventSink`]. The default sink forwards to `tracing`, so application code
//! keeps using whatever subscriber it already installs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ Validators, limiter, │  ← build EventRecord (redacted)
//! │ gateway, upload gate │
//! └──────────┬───────────┘
//!            │ Arc<dyn EventSink>
//! ┌──────────▼───────────┐
//! │ TracingSink (default)│  ← security_event! → tracing
//! │ MemorySink (tests)   │
//! │ your sink            │
//! └──────────────────────┘
//! ```
//!
//! Identities are fingerprinted and payloads truncated before they reach a
//! sink; see [`fingerprint_identity`] and [`preview_payload`].

mod events;
mod redact;
mod sink;

pub use events::{security_event, SecurityEvent, Severity};
pub use redact::{
    fingerprint_identity, init_fingerprint_key, preview_payload, PAYLOAD_PREVIEW_CHARS,
};
pub use sink::{default_sink, EventRecord, EventSink, NullSink, TracingSink};
