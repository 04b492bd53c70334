//! Password value object and the secret-hashing capability behind it.
//!
//! The same slow, salted hash protects passwords and refresh-token secrets.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::user::check_password_length;
use crate::errors::{AppError, AppResult};

/// Slow, salted, one-way hashing of secrets.
pub trait SecretHasher: Send + Sync {
    /// Hash a plaintext secret into a self-describing hash string.
    fn hash(&self, plain_text: &str) -> AppResult<String>;

    /// Check a plaintext secret against a stored hash.
    ///
    /// A malformed hash never verifies.
    fn verify(&self, hash: &str, plain_text: &str) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, plain_text: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, hash: &str, plain_text: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Unparseable secret hash: {}", e);
                false
            }
        }
    }
}

/// Hashed password ready for storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

// Don't expose hash in debug output
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext password.
    ///
    /// # Errors
    /// Returns a validation error if the password is shorter than 8 characters.
    pub fn new(plain_text: &str, hasher: &dyn SecretHasher) -> AppResult<Self> {
        check_password_length(plain_text)?;
        Ok(Self {
            hash: hasher.hash(plain_text)?,
        })
    }

    /// Wrap an existing hash (from database).
    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    pub fn verify(&self, plain_text: &str, hasher: &dyn SecretHasher) -> bool {
        hasher.verify(&self.hash, plain_text)
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let plain = "SecurePassword123!";
        let password = Password::new(plain, &Argon2Hasher).unwrap();

        assert!(password.verify(plain, &Argon2Hasher));
        assert!(!password.verify("WrongPassword123", &Argon2Hasher));
    }

    #[test]
    fn test_password_from_hash() {
        let plain = "TestPassword123";
        let hash = Password::new(plain, &Argon2Hasher).unwrap().into_string();

        let restored = Password::from_hash(hash);
        assert!(restored.verify(plain, &Argon2Hasher));
    }

    #[test]
    fn test_same_password_different_salts() {
        let plain = "SamePassword123";
        let pass1 = Password::new(plain, &Argon2Hasher).unwrap();
        let pass2 = Password::new(plain, &Argon2Hasher).unwrap();

        assert_ne!(pass1.as_str(), pass2.as_str());
        assert!(pass1.verify(plain, &Argon2Hasher));
        assert!(pass2.verify(plain, &Argon2Hasher));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(Password::new("short", &Argon2Hasher).is_err());
        assert!(Password::new("12345678", &Argon2Hasher).is_ok());
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!Argon2Hasher.verify("not-a-phc-string", "anything"));
    }
}
