//! Salted password hashing: PBKDF2-HMAC-SHA512, hex-encoded on both sides.
//!
//! The stored salt is itself a hex string and feeds the KDF as text, so a
//! hash is only meaningful together with the exact salt text, iteration
//! count and digest that produced it.

use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;

const ITERATIONS: u32 = 100_000;
const KEY_LENGTH: usize = 64;
const SALT_LENGTH: usize = 32;

/// Derive the hex-encoded key for a password and salt text.
#[must_use]
pub fn derive(password: &str, salt: &str) -> String {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut key);
    hex::encode(key)
}

/// Check a password against a stored hash/salt pair.
///
/// Comparison runs over the decoded bytes in constant time. A malformed
/// stored hash decodes to a failure, never a panic, so login degrades to
/// "invalid credentials".
#[must_use]
pub fn verify(password: &str, stored_hash: &str, salt: &str) -> bool {
    let derived = derive(password, salt);

    let (Ok(stored), Ok(computed)) = (hex::decode(stored_hash), hex::decode(&derived)) else {
        return false;
    };

    constant_time_eq(&stored, &computed)
}

/// Fresh random salt from the OS CSPRNG, lowercase hex.
#[must_use]
pub fn new_salt() -> String {
    let mut bytes = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password under a newly generated salt, returning `(hash, salt)`.
#[must_use]
pub fn create(password: &str) -> (String, String) {
    let salt = new_salt();
    let hash = derive(password, &salt);
    (hash, salt)
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
