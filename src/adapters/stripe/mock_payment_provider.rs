//! Mock payment provider for testing.
//!
//! Provides a configurable implementation of `PaymentProvider` for unit and
//! integration tests. Supports:
//! - Deterministic session ids and URLs
//! - Error injection
//! - Request tracking

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, PaymentError, PaymentProvider, PortalSession,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.fail_next(PaymentError::Network("timeout".into()));
///
/// let result = mock.create_checkout_session(request).await;
/// assert!(result.is_err());
/// assert_eq!(mock.checkout_requests().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Error to return on the next call (consumed).
    next_error: Option<PaymentError>,

    /// Error returned by every call until cleared.
    persistent_error: Option<PaymentError>,

    checkout_requests: Vec<CreateCheckoutRequest>,

    /// (customer_id, return_url) pairs.
    portal_requests: Vec<(String, String)>,

    issued_checkout_ids: Vec<String>,

    sequence: u64,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Fails the next call with `error`.
    pub fn fail_next(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Fails every call with `error` until `clear_errors`.
    pub fn fail_always(&self, error: PaymentError) {
        self.state().persistent_error = Some(error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.persistent_error = None;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn checkout_requests(&self) -> Vec<CreateCheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    pub fn portal_requests(&self) -> Vec<(String, String)> {
        self.state().portal_requests.clone()
    }

    /// Id of the most recently issued checkout session.
    pub fn last_checkout_session_id(&self) -> Option<String> {
        self.state().issued_checkout_ids.last().cloned()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_error(state: &mut MockState) -> Result<(), PaymentError> {
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        if let Some(error) = &state.persistent_error {
            return Err(error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut state = self.state();
        state.checkout_requests.push(request);
        Self::check_error(&mut state)?;

        state.sequence += 1;
        let id = format!("cs_mock_{:06}", state.sequence);
        state.issued_checkout_ids.push(id.clone());

        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let mut state = self.state();
        state
            .portal_requests
            .push((customer_id.to_string(), return_url.to_string()));
        Self::check_error(&mut state)?;

        state.sequence += 1;
        let id = format!("bps_mock_{:06}", state.sequence);
        Ok(PortalSession {
            url: format!("https://billing.stripe.com/p/session/{}", id),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TenantId;

    fn request() -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            tenant_id: TenantId::new(),
            customer_email: "owner@example.com".to_string(),
            plan_code: "standard".to_string(),
            success_url: "https://app/ok".to_string(),
            cancel_url: "https://app/cancel".to_string(),
        }
    }

    #[tokio::test]
    async fn issues_unique_sessions_and_records_requests() {
        let mock = MockPaymentProvider::new();

        let first = mock.create_checkout_session(request()).await.unwrap();
        let second = mock.create_checkout_session(request()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.url.ends_with(&second.id));
        assert_eq!(mock.checkout_requests().len(), 2);
        assert_eq!(mock.last_checkout_session_id(), Some(second.id));
    }

    #[tokio::test]
    async fn fail_next_is_consumed() {
        let mock = MockPaymentProvider::new();
        mock.fail_next(PaymentError::NotConfigured);

        assert!(mock.create_portal_session("cus_1", "https://app").await.is_err());
        assert!(mock.create_portal_session("cus_1", "https://app").await.is_ok());
        assert_eq!(mock.portal_requests().len(), 2);
    }

    #[tokio::test]
    async fn fail_always_persists_until_cleared() {
        let mock = MockPaymentProvider::new();
        mock.fail_always(PaymentError::Network("down".to_string()));

        assert!(mock.create_checkout_session(request()).await.is_err());
        assert!(mock.create_checkout_session(request()).await.is_err());

        mock.clear_errors();
        assert!(mock.create_checkout_session(request()).await.is_ok());
    }
}
