//! LicenseKeyRepository port.

use async_trait::async_trait;

use crate::domain::billing::{LicenseKey, LicenseKeyStatus};
use crate::domain::foundation::{DomainError, LicenseKeyId};

use super::{Page, PageRequest};

#[derive(Debug, Clone, Default)]
pub struct LicenseKeyFilter {
    pub status: Option<LicenseKeyStatus>,
    pub page: PageRequest,
}

#[async_trait]
pub trait LicenseKeyRepository: Send + Sync {
    async fn find_by_id(&self, id: LicenseKeyId) -> Result<Option<LicenseKey>, DomainError>;

    /// Looks a key up by the digest of its normalized material.
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<LicenseKey>, DomainError>;

    /// Newest first. The status filter matches the stored status.
    async fn list(&self, filter: &LicenseKeyFilter) -> Result<Page<LicenseKey>, DomainError>;
}
