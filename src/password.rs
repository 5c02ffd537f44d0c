use rand::{rngs::OsRng, RngCore};

use crate::{error::AppError, types::HashedPassword};

const SALT_LEN: usize = 16;

/// Argon2 hashing with the library's default work factor and a fresh random salt per password.
///
/// Both operations run on tokio's blocking pool, so a slow hash only suspends the request that
/// asked for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    pub async fn hash(&self, password: &str) -> Result<HashedPassword, AppError> {
        let password = password.to_owned();

        let encoded = tokio::task::spawn_blocking(move || {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            argon2::hash_encoded(password.as_bytes(), &salt, &Default::default())
        })
        .await
        .map_err(|e| AppError::Hashing(e.to_string()))?
        .map_err(|e| AppError::Hashing(e.to_string()))?;

        Ok(HashedPassword(encoded))
    }

    /// Returns `false` on mismatch, and also when the stored digest cannot be parsed.
    pub async fn compare(&self, password: &str, hash: &HashedPassword) -> Result<bool, AppError> {
        let password = password.to_owned();
        let hash = hash.0.clone();

        let verified = tokio::task::spawn_blocking(move || {
            argon2::verify_encoded(&hash, password.as_bytes())
        })
        .await
        .map_err(|e| AppError::Hashing(e.to_string()))?;

        match verified {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::warn!(error = %e, "stored password digest is malformed");
                Ok(false)
            }
        }
    }
}
