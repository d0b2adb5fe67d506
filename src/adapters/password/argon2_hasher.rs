//! Argon2id password hashing on the blocking thread pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::task;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PasswordHasher;

/// Hashes with Argon2id default parameters into PHC strings.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, password: &SecretString) -> Result<String, DomainError> {
        let password = password.clone();
        task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(join_error)?
    }

    /// `Ok(false)` on mismatch; `Err` only for a malformed stored hash.
    async fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, DomainError> {
        let password = password.clone();
        let hash = hash.to_string();
        task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(join_error)?
    }
}

fn hash_password(password: &SecretString) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &SecretString, hash: &str) -> Result<bool, DomainError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| internal(format!("invalid password hash: {e}")))?;
    match Argon2::default().verify_password(password.expose_secret().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(internal(format!("password verification failed: {e}"))),
    }
}

fn join_error(e: task::JoinError) -> DomainError {
    internal(format!("password hashing task failed: {e}"))
}

fn internal(message: String) -> DomainError {
    DomainError::new(ErrorCode::InternalError, message)
}
