//! Password hashing port.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::foundation::DomainError;

/// Hashes admin passwords into self-describing PHC strings.
///
/// Hashing is CPU bound, so implementations must not run it on the async
/// executor threads.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &SecretString) -> Result<String, DomainError>;

    async fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, DomainError>;
}
