//! Shared utility functions for tablelink-server

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Number of random bytes behind a session token
const TOKEN_BYTES: usize = 32;

/// Generate an opaque session token: 32 CSPRNG bytes, base64url without padding
pub fn generate_token() -> String {
    use rand::RngCore;
    use rand::rngs::OsRng;
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash verified against when the email is unknown, so both login failures cost the same
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("tablelink-dummy-password").unwrap_or_default());

/// Burn one argon2 verification without a real account
pub fn verify_dummy_password(password: &str) {
    let _ = verify_password(password, &DUMMY_HASH);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("p").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("p", &hash));
        assert!(!verify_password("q", &hash));
    }

    #[test]
    fn test_verify_rejects_non_phc_strings() {
        assert!(!verify_password("p", "p"));
        assert!(!verify_password("p", ""));
    }
}
