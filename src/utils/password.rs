use bcrypt::{BcryptError, non_truncating_hash, verify};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hashing(String),

    #[error("password does not match")]
    Mismatch,

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password using bcrypt.
///
/// Passwords longer than 71 bytes are rejected instead of being silently
/// truncated: bcrypt's 72-byte input includes the terminating NUL.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    non_truncating_hash(password, cost).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    match verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        Err(e @ (BcryptError::InvalidHash(_)
        | BcryptError::InvalidPrefix(_)
        | BcryptError::InvalidCost(_)
        | BcryptError::InvalidBase64(_))) => Err(PasswordError::MalformedHash(e.to_string())),
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}

/// Runs bcrypt on the blocking pool so request tasks never stall on it.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<(), PasswordError> {
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn verifies_matching_password() {
        let hash = hash_password("secret", TEST_COST).unwrap();
        assert_ne!(hash, "secret");
        assert!(verify_password("secret", &hash).is_ok());
    }

    #[test]
    fn rejects_other_password() {
        let hash = hash_password("secret", TEST_COST).unwrap();
        assert!(matches!(
            verify_password("Secret", &hash),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn salts_every_hash() {
        let first = hash_password("secret", TEST_COST).unwrap();
        let second = hash_password("secret", TEST_COST).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret", &second).is_ok());
    }

    #[test]
    fn rejects_overlong_password() {
        let longest = "a".repeat(71);
        let hash = hash_password(&longest, TEST_COST).unwrap();
        assert!(verify_password(&longest, &hash).is_ok());

        for len in [72, 73] {
            assert!(matches!(
                hash_password(&"a".repeat(len), TEST_COST),
                Err(PasswordError::Hashing(_))
            ));
        }
    }

    #[test]
    fn reports_malformed_hash() {
        assert!(matches!(
            verify_password("secret", "not-a-bcrypt-hash"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[tokio::test]
    async fn hasher_round_trips_off_the_runtime() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hash = hasher.hash("hunter2".to_string()).await.unwrap();
        hasher.verify("hunter2".to_string(), hash.clone()).await.unwrap();
        assert!(matches!(
            hasher.verify("hunter3".to_string(), hash).await,
            Err(PasswordError::Mismatch)
        ));
    }
}
