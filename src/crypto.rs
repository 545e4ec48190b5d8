//! Cryptogragic logics.

use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use async_trait::async_trait;
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("hashing task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("no stored password hash to compare against")]
    MissingHash,
    #[error("stored password is not hashed")]
    NotHashed,
}

/// Port for one-way password hashing.
///
/// Hashing is CPU-bound, implementations are expected to run it off the
/// async executor.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a PHC string.
    async fn hash(&self, password: &str) -> Result<String>;
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
#[derive(Debug, Clone)]
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    ///
    /// `iterations` is the work factor and must be at least 1.
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    /// Hash password using Argon2id on the current thread.
    pub fn hash_password(&self, password: impl AsRef<[u8]>) -> Result<String> {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string())
    }
}

#[async_trait]
impl PasswordHasher for PasswordManager {
    async fn hash(&self, password: &str) -> Result<String> {
        let manager = self.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || manager.hash_password(password))
            .await?
    }
}

/// Check that `phc_hash` is a well-formed PHC string.
pub fn check_phc(phc_hash: &str) -> Result<()> {
    PasswordHash::new(phc_hash)
        .map(|_| ())
        .map_err(|e| CryptoError::Argon2(e.to_string()))
}

/// Verify password against a PHC string.
///
/// A wrong password is `Ok(false)`. Only an unparsable hash is an error.
pub fn verify_password(
    password: impl AsRef<[u8]>,
    phc_hash: &str,
) -> Result<bool> {
    let parsed = PasswordHash::new(phc_hash)
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    // Parameters are read back from the PHC string itself.
    match Argon2::default().verify_password(password.as_ref(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(CryptoError::Argon2(err.to_string())),
    }
}
