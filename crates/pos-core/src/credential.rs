//! Salted password hashes for kiosk and user credentials.
//!
//! Hashes are stored as text in the form
//!
//! ```text
//! pbkdf2:sha256:<iterations>$<salt>$<hex digest>
//! ```
//!
//! which is the format `werkzeug.security.generate_password_hash` writes, so
//! records created by werkzeug-based tooling keep verifying.
//!
//! # Why re-derive instead of comparing strings? (for beginners)
//!
//! A password is never stored, only a *digest* derived from it with a slow,
//! salted key-derivation function.  To check a candidate we run the same
//! derivation with the stored salt and iteration count and compare the two
//! digests.  The comparison is constant-time so the time it takes does not
//! reveal how many leading bytes matched.

use pbkdf2::pbkdf2_hmac;
use rand::{distributions::Alphanumeric, Rng};
use sha2::Sha256;
use tracing::debug;

/// Iteration count used by [`hash_password`].
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Length of the random alphanumeric salt.
pub const SALT_LENGTH: usize = 16;

const METHOD_PREFIX: &str = "pbkdf2:sha256";
const DIGEST_LEN: usize = 32;

/// Hashes `password` with [`DEFAULT_ITERATIONS`] and a fresh random salt.
pub fn hash_password(password: &str) -> String {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// Hashes `password` with a caller-chosen iteration count.
///
/// `iterations` is clamped to at least 1.
pub fn hash_password_with(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();
    let digest = derive(password, &salt, iterations);
    format!("{METHOD_PREFIX}:{iterations}${salt}${}", hex::encode(digest))
}

/// Checks `candidate` against a stored hash string.
///
/// Returns `false` for a wrong password *and* for a stored string that is not
/// in the expected format; neither case is an error to the caller.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let Some(parsed) = ParsedHash::parse(stored) else {
        debug!("stored credential is not a pbkdf2:sha256 hash");
        return false;
    };
    let actual = derive(candidate, parsed.salt, parsed.iterations);
    constant_time_eq(&actual, &parsed.digest)
}

struct ParsedHash<'a> {
    iterations: u32,
    salt: &'a str,
    digest: Vec<u8>,
}

impl<'a> ParsedHash<'a> {
    fn parse(stored: &'a str) -> Option<Self> {
        let mut parts = stored.splitn(3, '$');
        let method = parts.next()?;
        let salt = parts.next()?;
        let digest_hex = parts.next()?;

        let iterations = method
            .strip_prefix(METHOD_PREFIX)?
            .strip_prefix(':')?
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)?;
        let digest = hex::decode(digest_hex).ok()?;
        if digest.len() != DIGEST_LEN {
            return None;
        }
        Some(Self {
            iterations,
            salt,
            digest,
        })
    }
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

/// Compares two byte slices without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps debug-build tests fast.
    const TEST_ITERATIONS: u32 = 10;

    #[test]
    fn test_hash_then_verify_accepts_correct_password() {
        // Arrange
        let stored = hash_password_with("teacher", TEST_ITERATIONS);

        // Act / Assert
        assert!(verify_password(&stored, "teacher"));
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let stored = hash_password_with("teacher", TEST_ITERATIONS);
        assert!(!verify_password(&stored, "Teacher"));
        assert!(!verify_password(&stored, ""));
    }

    #[test]
    fn test_hash_format_has_method_salt_and_digest() {
        // Arrange / Act
        let stored = hash_password_with("admin", TEST_ITERATIONS);
        let parts: Vec<&str> = stored.split('$').collect();

        // Assert
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "pbkdf2:sha256:10");
        assert_eq!(parts[1].len(), SALT_LENGTH);
        assert!(parts[1].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(parts[2].len(), DIGEST_LEN * 2);
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = hash_password_with("kiosk", TEST_ITERATIONS);
        let b = hash_password_with("kiosk", TEST_ITERATIONS);
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_plaintext_stored_value_is_rejected() {
        // A plaintext "hash" must never match its own text.
        assert!(!verify_password("admin", "admin"));
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        let malformed = [
            "",
            "pbkdf2:sha256",
            "pbkdf2:sha256:0$salt$00",
            "pbkdf2:sha256:abc$salt$00",
            "scrypt:32768:8:1$salt$00",
            "pbkdf2:sha256:10$salt$not-hex",
            "pbkdf2:sha256:10$salt$abcd",
        ];
        for stored in malformed {
            assert!(!verify_password(stored, "anything"), "{stored:?} must not verify");
        }
    }

    #[test]
    fn test_verify_known_vector() {
        // PBKDF2-HMAC-SHA256("password", "salt", 1 iteration, 32 bytes).
        let stored = "pbkdf2:sha256:1$salt$\
            120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b";
        assert!(verify_password(stored, "password"));
        assert!(!verify_password(stored, "passwore"));
    }

    #[test]
    fn test_zero_iterations_are_clamped() {
        let stored = hash_password_with("x", 0);
        assert!(stored.starts_with("pbkdf2:sha256:1$"));
        assert!(verify_password(&stored, "x"));
    }

    #[test]
    fn test_constant_time_eq_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"abc", b"abc"));
    }
}
