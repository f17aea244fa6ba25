// Password hashing and verification

use crate::error::{CrmError, CrmResult};
use bcrypt::{hash, verify};

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> CrmResult<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        hash(password, cost).map_err(|e| CrmError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| CrmError::Hashing(format!("Task join error: {}", e)))?
}

/// Check `password` against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch, not an error.
pub async fn verify_password(password: &str, stored_hash: &str) -> CrmResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    let outcome = tokio::task::spawn_blocking(move || verify(password, &stored_hash))
        .await
        .map_err(|e| CrmError::Hashing(format!("Task join error: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            log::warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hashed = hash_password("testpass123", 4).await.unwrap();
        assert_ne!(hashed, "testpass123");
        assert!(verify_password("testpass123", &hashed).await.unwrap());
        assert!(!verify_password("wrongpass", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("12345", "plain-text").await.unwrap());
    }
}
