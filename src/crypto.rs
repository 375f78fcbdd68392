//! Constant-time secret comparison
//!
//! Credential checks must not leak how much of a guess was right. `==` on
//! strings exits at the first differing byte; the functions here do not.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare two byte slices in constant time for equal lengths.
///
/// Slices of different length compare unequal immediately, which reveals the
/// length. Use [`secret_matches`] when the length itself is secret.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compare a supplied secret against the expected one without revealing
/// either its content or its length.
///
/// Both inputs are reduced to SHA-256 digests first, so the comparison always
/// runs over 32 bytes.
pub fn secret_matches(expected: &[u8], supplied: &[u8]) -> bool {
    let expected = Sha256::digest(expected);
    let supplied = Sha256::digest(supplied);
    constant_time_eq(expected.as_slice(), supplied.as_slice())
}
