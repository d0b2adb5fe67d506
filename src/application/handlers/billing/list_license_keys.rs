//! ListLicenseKeysHandler - admin query over issued keys.

use std::sync::Arc;

use crate::domain::billing::{BillingError, LicenseKey};
use crate::ports::{LicenseKeyFilter, LicenseKeyRepository, Page};

pub struct ListLicenseKeysHandler {
    license_keys: Arc<dyn LicenseKeyRepository>,
}

impl ListLicenseKeysHandler {
    pub fn new(license_keys: Arc<dyn LicenseKeyRepository>) -> Self {
        Self { license_keys }
    }

    pub async fn handle(&self, filter: LicenseKeyFilter) -> Result<Page<LicenseKey>, BillingError> {
        Ok(self.license_keys.list(&filter).await?)
    }
}
