use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";

/// Derived password bytes: zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedKey([u8; HASH_LENGTH]);

#[cfg(test)]
thread_local! {
    static DERIVATIONS: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
}

/// PBKDF2 derivations run on the current thread so far.
#[cfg(test)]
pub(crate) fn derivations() -> u32 {
    DERIVATIONS.with(|count| count.get())
}

impl DerivedKey {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        #[cfg(test)]
        DERIVATIONS.with(|count| count.set(count.get() + 1));
        let mut out = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
        Self(out)
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hash a password into the self-describing storage format
/// `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let key = DerivedKey::derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(key.0)
    )
}

/// A well-formed stored hash that no password is expected to match.
/// Verifying against it costs the same derivation as a real account.
pub fn decoy_hash(iterations: u32) -> String {
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode([0u8; SALT_LENGTH]),
        STANDARD_NO_PAD.encode([0u8; HASH_LENGTH])
    )
}

/// Check a password against a stored hash. Uses the iteration count recorded
/// in the hash, so changing the configured count does not lock out old users.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };
    if scheme != SCHEME {
        return Err(CryptoError::MalformedHash);
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 {
        return Err(CryptoError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let key = DerivedKey::derive(password, &salt, iterations);
    Ok(key.0[..].ct_eq(&expected[..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("hunter22", FAST);
        assert!(verify_password("hunter22", &stored).unwrap());
        assert!(!verify_password("hunter23", &stored).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("secret", FAST);
        let b = hash_password("secret", FAST);
        assert_ne!(a, b);
    }

    #[test]
    fn stored_format_records_iterations() {
        let stored = hash_password("secret", 1234);
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2-sha256");
        assert_eq!(parts[1], "1234");
    }

    #[test]
    fn malformed_hashes_are_errors() {
        for bad in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$notanumber$c2FsdA$aGFzaA",
            "pbkdf2-sha256$0$c2FsdA$aGFzaA",
            "pbkdf2-sha256$1000$!!!$aGFzaA",
            "pbkdf2-sha256$1000$c2FsdA$aGFzaA",
            "pbkdf2-sha256$1000$c2FsdA$aGFzaA$extra",
        ] {
            assert_eq!(
                verify_password("x", bad),
                Err(CryptoError::MalformedHash),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn decoy_hash_verifies_with_one_derivation() {
        let stored = decoy_hash(FAST);
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        let before = derivations();
        assert!(!verify_password("anything", &stored).unwrap());
        assert_eq!(derivations() - before, 1);
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
