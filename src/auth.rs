//! Lockout-Gated Authentication
//!
//! [`AuthenticationGateway`] combines a [`RateLimiter`] with a caller-supplied
//! [`CredentialCheck`] into one login decision. The order is fixed:
//!
//! 1. A throttled identity is refused without its credential being checked,
//!    so a locked account gives no signal about whether a guess was right.
//! 2. The credential is checked.
//! 3. Success clears the identity's failures; failure records one.
//!
//! Steps 1 to 3 run under the identity's limiter lock
//! ([`RateLimiter::attempt`]), so concurrent logins cannot exceed the
//! threshold.
//!
//! The gateway does not hand out its limiter. Administrative resets go
//! through a [`RateLimiter`] clone kept by whoever built the gateway; clones
//! share state.
//!
//! # Usage
//!
//! ```
//! use portcullis::auth::{AuthenticationGateway, StaticCredentials};
//! use portcullis::login::{LockoutPolicy, RateLimiter};
//!
//! let credentials = StaticCredentials::new().with_user("alice", "correct-password");
//! let gateway = AuthenticationGateway::new(RateLimiter::new(LockoutPolicy::default()), credentials);
//!
//! let decision = gateway.login("alice", "correct-password").unwrap();
//! assert!(decision.authenticated);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::crypto::secret_matches;
use crate::error::GateError;
use crate::login::{AttemptOutcome, Identity, RateLimiter};
use crate::observability::{default_sink, EventRecord, EventSink, SecurityEvent};

// ============================================================================
// Credential Verification
// ============================================================================

/// Verifies a credential for an identity.
///
/// Production wiring compares against a stored password hash; this crate
/// only consumes the yes/no answer.
pub trait CredentialCheck: Send + Sync {
    /// Whether `credential` is valid for `identity`
    fn check_credential(&self, identity: &str, credential: &str) -> bool;
}

impl<F> CredentialCheck for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn check_credential(&self, identity: &str, credential: &str) -> bool {
        self(identity, credential)
    }
}

/// In-memory credential table compared in constant time.
///
/// Unknown identities are compared against a placeholder so they take as long
/// as known ones.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    secrets: HashMap<String, Vec<u8>>,
}

impl StaticCredentials {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user
    pub fn with_user(mut self, identity: impl Into<String>, secret: impl AsRef<[u8]>) -> Self {
        self.secrets.insert(identity.into(), secret.as_ref().to_vec());
        self
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// True when no users are registered
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl CredentialCheck for StaticCredentials {
    fn check_credential(&self, identity: &str, credential: &str) -> bool {
        match self.secrets.get(identity) {
            Some(secret) => secret_matches(secret, credential.as_bytes()),
            None => {
                secret_matches(b"\0unknown-identity\0", credential.as_bytes());
                false
            }
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.secrets.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Login Decision
// ============================================================================

/// Reason given when a throttled identity tries to log in
pub const REASON_RATE_LIMITED: &str = "Rate limited - too many failed attempts";
/// Reason given on success
pub const REASON_SUCCESS: &str = "Login successful";
/// Reason given on a wrong credential
pub const REASON_INVALID: &str = "Invalid credentials";

/// Outcome of one login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginDecision {
    /// Credentials verified
    pub authenticated: bool,
    /// Refused by the limiter before verification
    pub blocked: bool,
    /// Human-readable reason
    pub reason: String,
}

impl LoginDecision {
    fn throttled() -> Self {
        Self {
            authenticated: false,
            blocked: true,
            reason: REASON_RATE_LIMITED.to_string(),
        }
    }

    fn success() -> Self {
        Self {
            authenticated: true,
            blocked: false,
            reason: REASON_SUCCESS.to_string(),
        }
    }

    fn invalid() -> Self {
        Self {
            authenticated: false,
            blocked: false,
            reason: REASON_INVALID.to_string(),
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Rate-limited login front door
#[derive(Clone)]
pub struct AuthenticationGateway {
    limiter: RateLimiter,
    credentials: Arc<dyn CredentialCheck>,
    sink: Arc<dyn EventSink>,
}

impl AuthenticationGateway {
    /// Create a gateway from a limiter and a credential check
    pub fn new(limiter: RateLimiter, credentials: impl CredentialCheck + 'static) -> Self {
        Self {
            limiter,
            credentials: Arc::new(credentials),
            sink: default_sink(),
        }
    }

    /// Report events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Attempt a login.
    ///
    /// # Errors
    ///
    /// [`GateError::EmptyIdentity`] when `identity` is empty or whitespace.
    /// Nothing is recorded in that case.
    pub fn login(&self, identity: &str, credential: &str) -> Result<LoginDecision, GateError> {
        let identity = Identity::parse(identity)?;

        let outcome = self.limiter.attempt(&identity, || {
            self.credentials.check_credential(identity.as_str(), credential)
        });

        let decision = match outcome {
            AttemptOutcome::Throttled { blocked_until } => {
                let mut record = EventRecord::new(
                    SecurityEvent::LoginThrottled,
                    "Login refused while identity is throttled",
                )
                .field("identity", identity.fingerprint());
                if let Some(until) = blocked_until {
                    record = record.field("blocked_until", until.to_rfc3339());
                }
                self.sink.emit(&record);
                LoginDecision::throttled()
            }
            AttemptOutcome::Succeeded => {
                self.sink.emit(
                    &EventRecord::new(SecurityEvent::AuthenticationSuccess, "Login successful")
                        .field("identity", identity.fingerprint()),
                );
                LoginDecision::success()
            }
            AttemptOutcome::Failed(result) => {
                self.sink.emit(
                    &EventRecord::new(SecurityEvent::AuthenticationFailure, "Login failed")
                        .field("identity", identity.fingerprint())
                        .field("failed_count", result.failed_count)
                        .field("remaining_attempts", result.remaining_attempts),
                );
                LoginDecision::invalid()
            }
        };

        Ok(decision)
    }
}

impl fmt::Debug for AuthenticationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGateway")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::LockoutPolicy;
    use crate::testing::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway() -> (AuthenticationGateway, Arc<MemorySink>) {
        let (gateway, _, sink) = gateway_with_admin();
        (gateway, sink)
    }

    /// Gateway plus the operator's handle on its limiter
    fn gateway_with_admin() -> (AuthenticationGateway, RateLimiter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let limiter = RateLimiter::new(LockoutPolicy::default()).with_sink(sink.clone());
        let credentials = StaticCredentials::new().with_user("alice", "correct-password");
        let gateway =
            AuthenticationGateway::new(limiter.clone(), credentials).with_sink(sink.clone());
        (gateway, limiter, sink)
    }

    #[test]
    fn test_lockout_end_to_end() {
        let (gateway, admin, sink) = gateway_with_admin();

        for _ in 0..5 {
            let decision = gateway.login("alice", "wrong").unwrap();
            assert!(!decision.authenticated);
            assert!(!decision.blocked);
            assert_eq!(decision.reason, "Invalid credentials");
        }

        let sixth = gateway.login("alice", "wrong").unwrap();
        assert!(sixth.blocked);
        assert_eq!(sixth.reason, "Rate limited - too many failed attempts");

        let correct_while_blocked = gateway.login("alice", "correct-password").unwrap();
        assert!(correct_while_blocked.blocked);
        assert!(!correct_while_blocked.authenticated);

        let identity = Identity::parse("alice").unwrap();
        admin.reset_for_testing(&identity);

        let decision = gateway.login("alice", "correct-password").unwrap();
        assert!(decision.authenticated);
        assert!(!decision.blocked);
        assert_eq!(decision.reason, "Login successful");

        assert_eq!(sink.count(SecurityEvent::AuthenticationFailure), 5);
        assert_eq!(sink.count(SecurityEvent::LoginThrottled), 2);
        assert_eq!(sink.count(SecurityEvent::AccountLocked), 1);
        assert_eq!(sink.count(SecurityEvent::AccountUnlocked), 1);
        assert_eq!(sink.count(SecurityEvent::AuthenticationSuccess), 1);
    }

    #[test]
    fn test_success_resets_failures() {
        let (gateway, _) = gateway();
        for _ in 0..4 {
            gateway.login("alice", "wrong").unwrap();
        }
        assert!(gateway.login("alice", "correct-password").unwrap().authenticated);
        for _ in 0..4 {
            assert!(!gateway.login("alice", "wrong").unwrap().blocked);
        }
    }

    #[test]
    fn test_throttled_login_skips_credential_check() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let check = move |_: &str, _: &str| {
            counted.fetch_add(1, Ordering::SeqCst);
            false
        };
        let gateway = AuthenticationGateway::new(
            RateLimiter::new(LockoutPolicy::default()).with_sink(Arc::new(MemorySink::new())),
            check,
        )
        .with_sink(Arc::new(MemorySink::new()));

        for _ in 0..10 {
            gateway.login("mallory", "guess").unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_empty_identity_is_an_error() {
        let (gateway, admin, sink) = gateway_with_admin();
        assert_eq!(gateway.login("", "x"), Err(GateError::EmptyIdentity));
        assert_eq!(gateway.login("   ", "x"), Err(GateError::EmptyIdentity));
        assert!(sink.is_empty());
        assert_eq!(admin.tracked_identities(), 0);
    }

    #[test]
    fn test_admin_handle_sees_gateway_lockout() {
        let (gateway, admin, _) = gateway_with_admin();
        let identity = Identity::parse("alice").unwrap();

        for _ in 0..5 {
            gateway.login("alice", "wrong").unwrap();
        }
        assert!(!admin.is_allowed(&identity));

        admin.reset_for_testing(&identity);
        assert!(admin.is_allowed(&identity));
        assert!(gateway.login("alice", "correct-password").unwrap().authenticated);
    }

    #[test]
    fn test_unknown_user_fails() {
        let (gateway, _) = gateway();
        let decision = gateway.login("bob", "correct-password").unwrap();
        assert!(!decision.authenticated);
        assert_eq!(decision.reason, "Invalid credentials");
    }

    #[test]
    fn test_events_never_carry_raw_identity() {
        let (gateway, sink) = gateway();
        gateway.login("alice", "wrong").unwrap();
        for record in sink.records() {
            for (_, value) in &record.fields {
                assert_ne!(value, "alice");
                assert!(!value.contains("wrong"));
            }
        }
    }

    #[test]
    fn test_static_credentials_debug_hides_secrets() {
        let credentials = StaticCredentials::new().with_user("alice", "hunter22");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hunter22"));
        assert_eq!(credentials.len(), 1);
    }
}
