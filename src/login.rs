//! Failed-Login Rate Limiting
//!
//! Per-identity failure counting and lockout. Each identity moves between two
//! states:
//!
//! ```text
//!              failed_count reaches threshold
//! Unthrottled ─────────────────────────────────▶ Throttled
//!      ▲                                             │
//!      └──────── record_success / reset_for_testing ─┘
//! ```
//!
//! An identity is throttled while its lockout window is open. Under the
//! default policy it also stays throttled after the window closes for as
//! long as `failed_count` is at or above the threshold; only a success or an
//! administrative reset releases it. With [`LockoutPolicy::auto_unlock`] set,
//! a closed window releases the identity and the next failure starts a fresh
//! count.
//!
//! # Storage
//!
//! Records live in a sharded in-memory [`AttemptStore`]. Each identity maps to
//! one shard lock, so checks and updates for the same identity are serialized
//! while unrelated identities proceed in parallel. Records are created on the
//! first failure, never on a query, and are never deleted.
//!
//! [`RateLimiter::attempt`] runs check, verify and update under one shard lock
//! so concurrent attempts cannot slip past the threshold.
//!
//! # Usage
//!
//! ```
//! use portcullis::login::{Identity, LockoutPolicy, RateLimiter};
//!
//! let limiter = RateLimiter::new(LockoutPolicy::default());
//! let user = Identity::parse("alice@example.com").unwrap();
//!
//! for _ in 0..5 {
//!     limiter.record_failure(&user);
//! }
//! assert!(!limiter.is_allowed(&user));
//!
//! limiter.record_success(&user);
//! assert!(limiter.is_allowed(&user));
//! ```

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::GateError;
use crate::observability::{default_sink, fingerprint_identity, EventRecord, EventSink, SecurityEvent};

/// Default number of lock shards in an [`AttemptStore`]
pub const DEFAULT_SHARDS: usize = 16;

// ============================================================================
// Lockout Policy
// ============================================================================

/// Lockout policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that start a lockout
    pub max_failed_attempts: u32,

    /// Length of the lockout window
    pub lockout_duration: Duration,

    /// Release identities when their window closes
    pub auto_unlock: bool,
}

impl Default for LockoutPolicy {
    /// 5 failures, 15 minute lockout, manual release
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            auto_unlock: false,
        }
    }
}

impl LockoutPolicy {
    /// Create a builder starting from the default policy
    pub fn builder() -> LockoutPolicyBuilder {
        LockoutPolicyBuilder::default()
    }

    /// 3 failures, 30 minute lockout
    pub fn strict() -> Self {
        Self {
            max_failed_attempts: 3,
            lockout_duration: Duration::from_secs(30 * 60),
            auto_unlock: false,
        }
    }

    /// Lockout window as a chrono span, saturating for absurd durations
    fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lockout_duration).unwrap_or(chrono::Duration::MAX)
    }

    fn threshold(&self) -> u32 {
        self.max_failed_attempts.max(1)
    }
}

/// Builder for [`LockoutPolicy`]
#[derive(Debug, Clone, Default)]
pub struct LockoutPolicyBuilder {
    policy: LockoutPolicy,
}

impl LockoutPolicyBuilder {
    /// Set the failure threshold
    pub fn max_failed_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_failed_attempts = attempts;
        self
    }

    /// Set the lockout window
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.policy.lockout_duration = duration;
        self
    }

    /// Release identities automatically when the window closes
    pub fn auto_unlock(mut self, enabled: bool) -> Self {
        self.policy.auto_unlock = enabled;
        self
    }

    /// Build the policy
    pub fn build(self) -> LockoutPolicy {
        self.policy
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Rate-limiter partition key: a username or email.
///
/// Construction rejects empty and whitespace-only strings. The value is kept
/// as given; callers wanting case-insensitive buckets normalize first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Parse an identity, rejecting empty input
    pub fn parse(raw: &str) -> Result<Self, GateError> {
        if raw.trim().is_empty() {
            return Err(GateError::EmptyIdentity);
        }
        Ok(Self(raw.to_string()))
    }

    /// The identity as supplied
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Redacted form safe for logs
    pub fn fingerprint(&self) -> String {
        fingerprint_identity(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&self.fingerprint()).finish()
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Identity {
    type Error = GateError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

// ============================================================================
// Attempt Records
// ============================================================================

/// Failure bookkeeping for one identity.
///
/// Invariant: `blocked_until.is_some()` implies `failed_count >= threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Failures since the last success or reset
    pub failed_count: u32,
    /// Time of the most recent failure or success
    pub last_attempt_time: DateTime<Utc>,
    /// End of the current or most recent lockout window
    pub blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            failed_count: 0,
            last_attempt_time: now,
            blocked_until: None,
        }
    }

    /// Whether the lockout window is open at `now`
    pub fn window_open_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    /// Whether this record throttles its identity at `now` under `policy`
    pub fn is_throttled_at(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> bool {
        if self.window_open_at(now) {
            return true;
        }
        !policy.auto_unlock && self.failed_count >= policy.threshold()
    }

    /// Time left in the lockout window
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> Option<Duration> {
        let until = self.blocked_until?;
        (until - now).to_std().ok().filter(|d| !d.is_zero())
    }

    fn register_failure(&mut self, now: DateTime<Utc>, policy: &LockoutPolicy) -> AttemptResult {
        let was_throttled = self.is_throttled_at(now, policy);

        if policy.auto_unlock && self.blocked_until.is_some_and(|until| now >= until) {
            self.failed_count = 0;
            self.blocked_until = None;
        }

        self.failed_count = self.failed_count.saturating_add(1);
        self.last_attempt_time = now;

        let threshold = policy.threshold();
        if self.failed_count >= threshold {
            let candidate = now.checked_add_signed(policy.window()).unwrap_or(DateTime::<Utc>::MAX_UTC);
            // Never shorten an open window
            self.blocked_until = Some(self.blocked_until.map_or(candidate, |until| until.max(candidate)));
        }

        let is_locked_out = self.is_throttled_at(now, policy);
        AttemptResult {
            failed_count: self.failed_count,
            remaining_attempts: threshold.saturating_sub(self.failed_count),
            is_locked_out,
            newly_locked: is_locked_out && !was_throttled,
            blocked_until: self.blocked_until,
        }
    }

    fn clear(&mut self, now: DateTime<Utc>) {
        self.failed_count = 0;
        self.blocked_until = None;
        self.last_attempt_time = now;
    }
}

/// Result of recording a failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptResult {
    /// Failures counted so far
    pub failed_count: u32,
    /// Failures left before lockout
    pub remaining_attempts: u32,
    /// Whether the identity is now throttled
    pub is_locked_out: bool,
    /// Whether this failure started the lockout
    pub newly_locked: bool,
    /// End of the lockout window, if one is set
    pub blocked_until: Option<DateTime<Utc>>,
}

/// Result of [`RateLimiter::attempt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Refused before verification
    Throttled {
        /// End of the lockout window, if one is set
        blocked_until: Option<DateTime<Utc>>,
    },
    /// Verification passed and the record was cleared
    Succeeded,
    /// Verification failed and was recorded
    Failed(AttemptResult),
}

// ============================================================================
// Attempt Store
// ============================================================================

type Shard = RwLock<HashMap<String, AttemptRecord>>;

/// Sharded in-memory record store.
///
/// Only [`RateLimiter`] mutates records; callers get clones through
/// [`RateLimiter::snapshot`].
pub struct AttemptStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl AttemptStore {
    /// Create a store with [`DEFAULT_SHARDS`] shards
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a store with `count` shards (at least one)
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Number of identities with a record
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// True when no identity has a record
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    fn shard(&self, key: &str) -> &Shard {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }

    fn get(&self, key: &str) -> Option<AttemptRecord> {
        self.shard(key).read().get(key).cloned()
    }
}

impl Default for AttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttemptStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptStore")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    failures: AtomicU64,
    successes: AtomicU64,
    lockouts: AtomicU64,
    throttled: AtomicU64,
    resets: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time limiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    /// Failures recorded
    pub failures_recorded: u64,
    /// Successes recorded
    pub successes_recorded: u64,
    /// Lockouts started
    pub lockouts_started: u64,
    /// Attempts refused while throttled
    pub throttled_attempts: u64,
    /// Administrative resets
    pub resets: u64,
}

// ============================================================================
// Rate Limiter
// ============================================================================

/// Per-identity failed-login limiter.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: LockoutPolicy,
    store: Arc<AttemptStore>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    counters: Arc<Counters>,
}

impl RateLimiter {
    /// Create a limiter with its own store, the system clock and the default sink
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            store: Arc::new(AttemptStore::new()),
            clock: Arc::new(SystemClock),
            sink: default_sink(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Report events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use an existing store
    pub fn with_store(mut self, store: Arc<AttemptStore>) -> Self {
        self.store = store;
        self
    }

    /// The policy in force
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Whether `identity` may attempt a login now.
    ///
    /// Never creates a record.
    pub fn is_allowed(&self, identity: &Identity) -> bool {
        let now = self.clock.now();
        let shard = self.store.shard(identity.as_str()).read();
        !shard
            .get(identity.as_str())
            .is_some_and(|record| record.is_throttled_at(now, &self.policy))
    }

    /// Record a failed attempt, creating the record if needed.
    pub fn record_failure(&self, identity: &Identity) -> AttemptResult {
        let now = self.clock.now();
        let result = {
            let mut shard = self.store.shard(identity.as_str()).write();
            shard
                .entry(identity.as_str().to_string())
                .or_insert_with(|| AttemptRecord::new(now))
                .register_failure(now, &self.policy)
        };
        self.after_failure(identity, &result);
        result
    }

    /// Record a successful attempt. A no-op for identities without a record.
    pub fn record_success(&self, identity: &Identity) {
        let now = self.clock.now();
        if let Some(record) = self.store.shard(identity.as_str()).write().get_mut(identity.as_str()) {
            record.clear(now);
        }
        Counters::bump(&self.counters.successes);
    }

    /// Administrative reset of an identity's counters.
    ///
    /// Same effect as [`record_success`](Self::record_success) but reported as
    /// an operator override. Not part of any authorization path.
    pub fn reset_for_testing(&self, identity: &Identity) {
        let now = self.clock.now();
        let previous = {
            let mut shard = self.store.shard(identity.as_str()).write();
            shard.get_mut(identity.as_str()).map(|record| {
                let previous = record.failed_count;
                record.clear(now);
                previous
            })
        };

        Counters::bump(&self.counters.resets);
        self.sink.emit(
            &EventRecord::new(SecurityEvent::AccountUnlocked, "Identity counters reset by operator")
                .field("identity", identity.fingerprint())
                .field("previous_failures", previous.unwrap_or(0)),
        );
    }

    /// Check, verify and update as one critical section.
    ///
    /// `verify` runs only when the identity is not throttled, and runs while
    /// the identity's shard lock is held.
    pub fn attempt<F>(&self, identity: &Identity, verify: F) -> AttemptOutcome
    where
        F: FnOnce() -> bool,
    {
        let now = self.clock.now();
        let outcome = {
            let key = identity.as_str();
            let mut shard = self.store.shard(key).write();
            let throttled = shard
                .get(key)
                .filter(|record| record.is_throttled_at(now, &self.policy))
                .map(|record| record.blocked_until);

            if let Some(blocked_until) = throttled {
                AttemptOutcome::Throttled { blocked_until }
            } else if verify() {
                if let Some(record) = shard.get_mut(key) {
                    record.clear(now);
                }
                AttemptOutcome::Succeeded
            } else {
                let result = shard
                    .entry(key.to_string())
                    .or_insert_with(|| AttemptRecord::new(now))
                    .register_failure(now, &self.policy);
                AttemptOutcome::Failed(result)
            }
        };

        match &outcome {
            AttemptOutcome::Throttled { .. } => Counters::bump(&self.counters.throttled),
            AttemptOutcome::Succeeded => Counters::bump(&self.counters.successes),
            AttemptOutcome::Failed(result) => self.after_failure(identity, result),
        }
        outcome
    }

    /// Copy of the identity's record, if one exists
    pub fn snapshot(&self, identity: &Identity) -> Option<AttemptRecord> {
        self.store.get(identity.as_str())
    }

    /// Counter snapshot. Lock-free.
    pub fn stats(&self) -> LimiterStats {
        let c = &self.counters;
        LimiterStats {
            failures_recorded: c.failures.load(Ordering::Relaxed),
            successes_recorded: c.successes.load(Ordering::Relaxed),
            lockouts_started: c.lockouts.load(Ordering::Relaxed),
            throttled_attempts: c.throttled.load(Ordering::Relaxed),
            resets: c.resets.load(Ordering::Relaxed),
        }
    }

    /// Number of identities with a record
    pub fn tracked_identities(&self) -> usize {
        self.store.len()
    }

    fn after_failure(&self, identity: &Identity, result: &AttemptResult) {
        Counters::bump(&self.counters.failures);
        if result.newly_locked {
            Counters::bump(&self.counters.lockouts);
            self.sink.emit(
                &EventRecord::new(
                    SecurityEvent::AccountLocked,
                    "Identity locked after repeated failures",
                )
                .field("identity", identity.fingerprint())
                .field("failed_count", result.failed_count)
                .field("lockout_secs", self.policy.lockout_duration.as_secs()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::MemorySink;
    use std::sync::atomic::AtomicUsize;

    struct Fixture {
        limiter: RateLimiter,
        clock: Arc<ManualClock>,
        sink: Arc<MemorySink>,
    }

    fn fixture(policy: LockoutPolicy) -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let sink = Arc::new(MemorySink::new());
        let limiter = RateLimiter::new(policy)
            .with_clock(clock.clone())
            .with_sink(sink.clone());
        Fixture { limiter, clock, sink }
    }

    fn id(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    #[test]
    fn test_identity_rejects_empty() {
        assert_eq!(Identity::parse(""), Err(GateError::EmptyIdentity));
        assert_eq!(Identity::parse("  \t"), Err(GateError::EmptyIdentity));
        assert_eq!(id("alice").as_str(), "alice");
    }

    #[test]
    fn test_identity_debug_is_redacted() {
        let debug = format!("{:?}", id("alice@example.com"));
        assert!(!debug.contains("alice@example.com"));
    }

    #[test]
    fn test_default_policy() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.max_failed_attempts, 5);
        assert_eq!(policy.lockout_duration, Duration::from_secs(900));
        assert!(!policy.auto_unlock);
    }

    #[test]
    fn test_unknown_identity_is_allowed_without_record() {
        let f = fixture(LockoutPolicy::default());
        let user = id("ghost");
        assert!(f.limiter.is_allowed(&user));
        f.limiter.record_success(&user);
        assert_eq!(f.limiter.snapshot(&user), None);
        assert_eq!(f.limiter.tracked_identities(), 0);
    }

    #[test]
    fn test_five_failures_throttle() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");

        for n in 1..=4 {
            let result = f.limiter.record_failure(&user);
            assert_eq!(result.failed_count, n);
            assert!(!result.is_locked_out);
            assert!(f.limiter.is_allowed(&user));
        }

        let result = f.limiter.record_failure(&user);
        assert!(result.is_locked_out);
        assert!(result.newly_locked);
        assert_eq!(result.remaining_attempts, 0);
        assert!(!f.limiter.is_allowed(&user));
        assert_eq!(f.sink.count(SecurityEvent::AccountLocked), 1);

        let record = f.limiter.snapshot(&user).unwrap();
        assert_eq!(record.failed_count, 5);
        assert_eq!(
            record.blocked_until,
            Some(f.clock.now() + chrono::Duration::minutes(15))
        );
    }

    #[test]
    fn test_sixth_failure_never_shortens_lockout() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }
        let first = f.limiter.snapshot(&user).unwrap().blocked_until.unwrap();

        f.clock.advance(Duration::from_secs(60));
        let result = f.limiter.record_failure(&user);
        assert!(!result.newly_locked);
        assert!(result.blocked_until.unwrap() >= first);
        assert_eq!(f.sink.count(SecurityEvent::AccountLocked), 1);
    }

    #[test]
    fn test_success_releases_immediately() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }
        f.limiter.record_success(&user);

        assert!(f.limiter.is_allowed(&user));
        let record = f.limiter.snapshot(&user).unwrap();
        assert_eq!(record.failed_count, 0);
        assert_eq!(record.blocked_until, None);
    }

    #[test]
    fn test_expired_window_still_throttles_without_auto_unlock() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }

        f.clock.advance(Duration::from_secs(16 * 60));
        let record = f.limiter.snapshot(&user).unwrap();
        assert!(!record.window_open_at(f.clock.now()));
        assert!(!f.limiter.is_allowed(&user));
    }

    #[test]
    fn test_auto_unlock_releases_after_window() {
        let policy = LockoutPolicy::builder().auto_unlock(true).build();
        let f = fixture(policy);
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }
        assert!(!f.limiter.is_allowed(&user));

        f.clock.advance(Duration::from_secs(15 * 60));
        assert!(f.limiter.is_allowed(&user));

        let result = f.limiter.record_failure(&user);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.blocked_until, None);
    }

    #[test]
    fn test_remaining_lockout() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }
        f.clock.advance(Duration::from_secs(5 * 60));
        let record = f.limiter.snapshot(&user).unwrap();
        assert_eq!(
            record.remaining_lockout(f.clock.now()),
            Some(Duration::from_secs(10 * 60))
        );

        f.clock.advance(Duration::from_secs(20 * 60));
        assert_eq!(record.remaining_lockout(f.clock.now()), None);
    }

    #[test]
    fn test_reset_for_testing_keeps_record() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            f.limiter.record_failure(&user);
        }
        f.limiter.reset_for_testing(&user);

        assert!(f.limiter.is_allowed(&user));
        assert_eq!(f.limiter.snapshot(&user).unwrap().failed_count, 0);
        assert_eq!(f.sink.count(SecurityEvent::AccountUnlocked), 1);
        assert_eq!(f.limiter.stats().resets, 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let f = fixture(LockoutPolicy::default());
        for _ in 0..5 {
            f.limiter.record_failure(&id("alice"));
        }
        assert!(!f.limiter.is_allowed(&id("alice")));
        assert!(f.limiter.is_allowed(&id("bob")));
    }

    #[test]
    fn test_attempt_skips_verify_while_throttled() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        for _ in 0..5 {
            assert!(matches!(
                f.limiter.attempt(&user, || false),
                AttemptOutcome::Failed(_)
            ));
        }

        let mut called = false;
        let outcome = f.limiter.attempt(&user, || {
            called = true;
            true
        });
        assert!(matches!(outcome, AttemptOutcome::Throttled { .. }));
        assert!(!called);
        assert_eq!(f.limiter.stats().throttled_attempts, 1);
    }

    #[test]
    fn test_attempt_success_clears() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        f.limiter.attempt(&user, || false);
        assert_eq!(f.limiter.attempt(&user, || true), AttemptOutcome::Succeeded);
        assert_eq!(f.limiter.snapshot(&user).unwrap().failed_count, 0);
    }

    #[test]
    fn test_concurrent_attempts_respect_threshold() {
        let f = fixture(LockoutPolicy::default());
        let user = id("alice");
        let verified = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..5 {
                        f.limiter.attempt(&user, || {
                            verified.fetch_add(1, Ordering::SeqCst);
                            false
                        });
                    }
                });
            }
        });

        assert_eq!(verified.load(Ordering::SeqCst), 5);
        let stats = f.limiter.stats();
        assert_eq!(stats.failures_recorded, 5);
        assert_eq!(stats.lockouts_started, 1);
        assert_eq!(stats.throttled_attempts, 35);
    }

    #[test]
    fn test_concurrent_failures_are_all_counted() {
        let f = fixture(LockoutPolicy::builder().max_failed_attempts(1000).build());
        let user = id("alice");

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        f.limiter.record_failure(&user);
                    }
                });
            }
        });

        assert_eq!(f.limiter.snapshot(&user).unwrap().failed_count, 200);
    }

    #[test]
    fn test_clones_share_state() {
        let f = fixture(LockoutPolicy::default());
        let other = f.limiter.clone();
        let user = id("alice");
        for _ in 0..5 {
            other.record_failure(&user);
        }
        assert!(!f.limiter.is_allowed(&user));
    }

    #[test]
    fn test_shared_store() {
        let store = Arc::new(AttemptStore::with_shards(2));
        let a = RateLimiter::new(LockoutPolicy::default()).with_store(store.clone());
        let b = RateLimiter::new(LockoutPolicy::default()).with_store(store.clone());
        for _ in 0..5 {
            a.record_failure(&id("alice"));
        }
        assert!(!b.is_allowed(&id("alice")));
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_zero_threshold_treated_as_one() {
        let f = fixture(LockoutPolicy::builder().max_failed_attempts(0).build());
        let user = id("alice");
        assert!(f.limiter.is_allowed(&user));
        f.limiter.record_failure(&user);
        assert!(!f.limiter.is_allowed(&user));
    }
}
