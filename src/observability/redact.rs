//! Payload redaction for security events
//!
//! Identities and attacker-supplied strings never reach a sink verbatim.
//! Identities become a keyed fingerprint; payloads are truncated and have
//! control characters escaped so a CR/LF in an input cannot forge log lines.
//!
//! Fingerprints are HMAC-SHA256 under a process key. Without the key, a log
//! reader cannot confirm a guessed username by hashing it. The key is random
//! per process unless [`init_fingerprint_key`] installs one first; install a
//! shared key when fingerprints must correlate across restarts or hosts.

use std::sync::OnceLock;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

static FINGERPRINT_KEY: OnceLock<[u8; 32]> = OnceLock::new();

/// Maximum number of characters of an attack payload kept in an event
pub const PAYLOAD_PREVIEW_CHARS: usize = 50;

/// Install the fingerprint key (call once at startup).
///
/// Returns `false` if a key is already in place, either from an earlier call
/// or because a fingerprint was already taken under the random default.
pub fn init_fingerprint_key(key: [u8; 32]) -> bool {
    FINGERPRINT_KEY.set(key).is_ok()
}

fn fingerprint_key() -> &'static [u8; 32] {
    FINGERPRINT_KEY.get_or_init(|| {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    })
}

/// Reduce an identity to `<first char>***#<8 hex chars of HMAC-SHA256>`.
///
/// The fingerprint is stable within a process, so repeated events for one
/// identity correlate without the event stream becoming a list of usernames.
pub fn fingerprint_identity(identity: &str) -> String {
    fingerprint_with_key(fingerprint_key(), identity)
}

fn fingerprint_with_key(key: &[u8], identity: &str) -> String {
    let first = identity
        .chars()
        .next()
        .filter(|c| !c.is_control())
        .unwrap_or('?');

    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return format!("{}***#????????", first);
    };
    Mac::update(&mut mac, identity.as_bytes());
    let tag = mac.finalize().into_bytes();
    let hex: String = tag.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("{}***#{}", first, hex)
}

/// Truncate a payload and escape control characters for logging.
pub fn preview_payload(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len().min(PAYLOAD_PREVIEW_CHARS * 2));
    for c in payload.chars().take(PAYLOAD_PREVIEW_CHARS) {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    if payload.chars().count() > PAYLOAD_PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let a = fingerprint_identity("alice@example.com");
        let b = fingerprint_identity("alice@example.com");
        assert_eq!(a, b);
        assert!(a.starts_with("a***#"));
        assert_eq!(a.len(), "a***#".len() + 8);
        assert!(!a.contains("example"));
    }

    #[test]
    fn test_fingerprint_distinguishes_identities() {
        assert_ne!(fingerprint_identity("alice"), fingerprint_identity("alicf"));
    }

    #[test]
    fn test_fingerprint_depends_on_key() {
        let a = fingerprint_with_key(&[1u8; 32], "alice@example.com");
        let b = fingerprint_with_key(&[2u8; 32], "alice@example.com");
        assert_ne!(a, b);
        assert_eq!(a, fingerprint_with_key(&[1u8; 32], "alice@example.com"));
    }

    #[test]
    fn test_fingerprint_is_not_plain_digest() {
        use sha2::Digest;

        let identity = "alice@example.com";
        let plain: String = Sha256::digest(identity.as_bytes())
            .iter()
            .take(4)
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_ne!(fingerprint_identity(identity), format!("a***#{}", plain));
    }

    #[test]
    fn test_fingerprint_key_fixed_after_first_use() {
        let before = fingerprint_identity("bob");
        assert!(!init_fingerprint_key([7u8; 32]));
        assert_eq!(fingerprint_identity("bob"), before);
    }

    #[test]
    fn test_fingerprint_control_first_char() {
        assert!(fingerprint_identity("\nmallory").starts_with("?***#"));
    }

    #[test]
    fn test_preview_escapes_control_characters() {
        assert_eq!(preview_payload("a\r\nBCC: x"), "a\\r\\nBCC: x");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(80);
        let preview = preview_payload(&long);
        assert_eq!(preview, format!("{}...", "x".repeat(PAYLOAD_PREVIEW_CHARS)));
    }
}
