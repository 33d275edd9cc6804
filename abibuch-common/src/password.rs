//! Password hashing and random token generation
//!
//! Passwords are stored as iterated, salted SHA-256 digests (64 hex chars).
//! Session tokens and salts are random bytes rendered as lowercase hex.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of SHA-256 rounds applied to each password
const HASH_ROUNDS: usize = 10_000;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password with the given salt
///
/// # Examples
///
/// ```
/// use abibuch_common::password::hash_password;
///
/// let hash = hash_password("correct horse", "salt");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_password("correct horse", "salt"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(password.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

/// Verify a password against a stored salt and hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), expected_hash.as_bytes())
}

/// Generate a random 16-byte salt (32 hex chars)
pub fn generate_salt() -> String {
    random_hex::<16>()
}

/// Generate a random 32-byte token (64 hex chars)
pub fn generate_token() -> String {
    random_hex::<32>()
}

fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
