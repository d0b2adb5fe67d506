//! Fakes shared by billing handler tests.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::RequestOrigin;
use crate::domain::foundation::DomainError;
use crate::ports::{AdminActor, PasswordHasher};

/// Reversible "hash" so tests can assert what was stored.
pub struct FakePasswordHasher;

#[async_trait]
impl PasswordHasher for FakePasswordHasher {
    async fn hash(&self, password: &SecretString) -> Result<String, DomainError> {
        Ok(format!("fake${}", password.expose_secret()))
    }

    async fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, DomainError> {
        Ok(hash == format!("fake${}", password.expose_secret()))
    }
}

pub fn admin_actor() -> AdminActor {
    AdminActor {
        id: "ops@example.com".to_string(),
    }
}

pub fn origin() -> RequestOrigin {
    RequestOrigin {
        ip_address: Some("198.51.100.7".to_string()),
        user_agent: Some("billing-tests".to_string()),
    }
}

pub fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}
