//! Integration tests for the billing HTTP API.
//!
//! These tests drive the full router with the in-memory store and the mock
//! payment provider:
//! 1. Stripe webhooks are verified, reconciled and deduplicated
//! 2. License keys are generated, claimed exactly once and revoked
//! 3. Tenant routes are gated by status and revocation
//! 4. Public endpoints are rate limited

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use vrcshift_billing::adapters::auth::{SystemAdminVerifier, TenantJwtCodec};
use vrcshift_billing::adapters::http::billing::STRIPE_SIGNATURE_HEADER;
use vrcshift_billing::adapters::http::{
    api_router, protect_tenant_routes, BillingAppState, BillingHttpSettings, BillingServices,
    ClientIpSource, DEFAULT_REQUEST_TIMEOUT,
};
use vrcshift_billing::adapters::memory::InMemoryBillingStore;
use vrcshift_billing::adapters::password::Argon2PasswordHasher;
use vrcshift_billing::adapters::rate_limiter::SlidingWindowRateLimiter;
use vrcshift_billing::adapters::stripe::MockPaymentProvider;
use vrcshift_billing::domain::billing::{
    actions, sign_header, Entitlement, EntitlementSource, Subscription, Tenant, TenantStatus,
};
use vrcshift_billing::domain::foundation::{AdminId, TenantId, Timestamp};
use vrcshift_billing::ports::TenantContext;

const WEBHOOK_SECRET: &str = "whsec_integration_test";
const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    state: BillingAppState,
    router: Router,
    store: InMemoryBillingStore,
    payments: Arc<MockPaymentProvider>,
    tokens: Arc<TenantJwtCodec>,
}

struct AppOptions {
    webhook_secret: Option<&'static str>,
    public_limit: usize,
    client_ip_source: ClientIpSource,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            webhook_secret: Some(WEBHOOK_SECRET),
            public_limit: 100,
            client_ip_source: ClientIpSource::PeerAddress,
        }
    }
}

fn test_app() -> TestApp {
    test_app_with(AppOptions::default())
}

fn test_app_with(options: AppOptions) -> TestApp {
    let store = InMemoryBillingStore::new();
    let payments = Arc::new(MockPaymentProvider::new());
    let tokens = Arc::new(TenantJwtCodec::new(&SecretString::new(JWT_SECRET.to_string())));

    let services = BillingServices {
        payment_provider: payments.clone(),
        password_hasher: Arc::new(Argon2PasswordHasher::new()),
        tenant_sessions: tokens.clone(),
        admin_identity: Arc::new(SystemAdminVerifier::new("system-admin")),
        claim_limiter: Arc::new(SlidingWindowRateLimiter::new(
            options.public_limit,
            Duration::from_secs(60),
        )),
        subscribe_limiter: Arc::new(SlidingWindowRateLimiter::new(
            options.public_limit,
            Duration::from_secs(60),
        )),
    };
    let settings = BillingHttpSettings {
        webhook_secret: options
            .webhook_secret
            .map(|secret| SecretString::new(secret.to_string())),
        failure_delay: Duration::from_millis(5),
        client_ip_source: options.client_ip_source,
        ..Default::default()
    };

    let state = BillingAppState::from_store(store.clone(), services, settings);
    let router = api_router(state.clone(), DEFAULT_REQUEST_TIMEOUT);

    TestApp {
        state,
        router,
        store,
        payments,
        tokens,
    }
}

impl TestApp {
    fn tenant_token(&self, tenant_id: TenantId) -> String {
        self.tokens
            .issue(
                TenantContext {
                    tenant_id,
                    admin_id: AdminId::new(),
                },
                Timestamp::now(),
            )
            .unwrap()
    }

    async fn tenant(&self, id: TenantId) -> Tenant {
        self.store
            .all_tenants()
            .await
            .into_iter()
            .find(|t| t.id() == id)
            .expect("tenant should exist")
    }

    async fn audit_count(&self, action: &str) -> usize {
        self.store
            .all_audit_logs()
            .await
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Public request arriving from the given socket peer.
fn public_request(uri: &str, body: &Value, client_ip: &str) -> Request<Body> {
    let mut request = json_request(Method::POST, uri, body);
    let peer: SocketAddr = format!("{}:40000", client_ip).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn tenant_request(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn webhook_request(payload: &Value, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/stripe/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(STRIPE_SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn signed_webhook(payload: &Value) -> Request<Body> {
    let signature = sign_header(
        payload.to_string().as_bytes(),
        WEBHOOK_SECRET,
        Timestamp::now().as_unix_secs(),
    );
    webhook_request(payload, Some(signature))
}

fn stripe_event(id: &str, event_type: &str, object: Value) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "created": Timestamp::now().as_unix_secs(),
        "livemode": false,
        "data": { "object": object }
    })
}

fn claim_body(license_key: &str, email: &str) -> Value {
    json!({
        "email": email,
        "password": "correct-horse-battery",
        "display_name": "Shift Lead",
        "tenant_name": "Night Owls",
        "license_key": license_key
    })
}

async fn seed_subscribed_tenant(store: &InMemoryBillingStore) -> Tenant {
    let now = Timestamp::now();
    let tenant = Tenant::new_active("Subscribed Crew", now).unwrap();
    store.seed_tenant(tenant.clone()).await;
    store
        .seed_subscription(Subscription::new(tenant.id(), "cus_1", "sub_1", "active", None, now))
        .await;
    store
        .seed_entitlement(
            Entitlement::grant(tenant.id(), "standard", EntitlementSource::Subscription, now)
                .unwrap(),
        )
        .await;
    tenant
}

async fn generate_key(app: &TestApp) -> (String, String) {
    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/v1/admin/license-keys",
            &json!({ "count": 1, "memo": "booth sale" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let issued = &body["keys"][0];
    (
        issued["id"].as_str().unwrap().to_string(),
        issued["license_key"].as_str().unwrap().to_string(),
    )
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Stripe Webhook
// =============================================================================

#[tokio::test]
async fn subscribe_then_checkout_webhook_activates_tenant() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        public_request(
            "/api/v1/public/subscribe",
            &json!({
                "email": "lead@example.com",
                "password": "correct-horse-battery",
                "display_name": "Shift Lead",
                "tenant_name": "Night Owls"
            }),
            "203.0.113.7",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["checkout_url"].as_str().unwrap().starts_with("https://"));
    let tenant_id: TenantId = body["tenant_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.tenant(tenant_id).await.status(), TenantStatus::PendingPayment);

    let session_id = app.payments.last_checkout_session_id().unwrap();
    let event = stripe_event(
        "evt_checkout_1",
        "checkout.session.completed",
        json!({ "id": session_id, "customer": "cus_123", "subscription": "sub_123" }),
    );
    let (status, body) = send(&app.router, signed_webhook(&event)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(app.tenant(tenant_id).await.status(), TenantStatus::Active);
    assert_eq!(app.store.all_webhook_events().await.len(), 1);
    assert_eq!(app.audit_count(actions::WEBHOOK_CHECKOUT_COMPLETED).await, 1);

    let token = app.tenant_token(tenant_id);
    let (status, body) = send(
        &app.router,
        tenant_request(Method::GET, "/api/v1/billing/status", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["entitled"], true);
    assert_eq!(body["subscription_status"], "active");
}

#[tokio::test]
async fn duplicate_payment_failed_delivery_is_applied_once() {
    let app = test_app();
    let tenant = seed_subscribed_tenant(&app.store).await;
    let event = stripe_event(
        "evt_failed_1",
        "invoice.payment_failed",
        json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }),
    );

    let (first, _) = send(&app.router, signed_webhook(&event)).await;
    let after_first = app.tenant(tenant.id()).await;
    let (second, _) = send(&app.router, signed_webhook(&event)).await;
    let after_second = app.tenant(tenant.id()).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(after_first.status(), TenantStatus::Grace);
    assert_eq!(after_second.grace_until(), after_first.grace_until());
    assert_eq!(app.store.all_webhook_events().await.len(), 1);
    assert_eq!(app.audit_count(actions::WEBHOOK_PAYMENT_FAILED).await, 1);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_side_effects() {
    let app = test_app();
    let tenant = seed_subscribed_tenant(&app.store).await;
    let event = stripe_event(
        "evt_forged",
        "invoice.payment_failed",
        json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }),
    );
    let forged = sign_header(
        event.to_string().as_bytes(),
        "whsec_wrong",
        Timestamp::now().as_unix_secs(),
    );

    let (status, body) = send(&app.router, webhook_request(&event, Some(forged))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "ERR_INVALID_SIGNATURE");
    assert!(app.store.all_webhook_events().await.is_empty());
    assert_eq!(app.tenant(tenant.id()).await.status(), TenantStatus::Active);
}

#[tokio::test]
async fn missing_signature_is_bad_request() {
    let app = test_app();
    let event = stripe_event("evt_unsigned", "invoice.paid", json!({ "id": "in_1" }));

    let (status, body) = send(&app.router, webhook_request(&event, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ERR_MISSING_SIGNATURE");
    assert!(app.store.all_webhook_events().await.is_empty());
}

#[tokio::test]
async fn signed_garbage_is_invalid_payload() {
    let app = test_app();
    let payload = json!({ "not": "an event" });

    let (status, body) = send(&app.router, signed_webhook(&payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ERR_INVALID_PAYLOAD");
}

#[tokio::test]
async fn webhook_without_configured_secret_is_ignored() {
    let app = test_app_with(AppOptions {
        webhook_secret: None,
        ..Default::default()
    });
    let event = stripe_event("evt_any", "invoice.paid", json!({ "id": "in_1" }));

    let (status, body) = send(&app.router, webhook_request(&event, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert!(app.store.all_webhook_events().await.is_empty());
}

// =============================================================================
// License Keys
// =============================================================================

#[tokio::test]
async fn claim_provisions_active_tenant() {
    let app = test_app();
    let (_, raw_key) = generate_key(&app).await;

    let (status, body) = send(
        &app.router,
        public_request(
            "/api/v1/public/license/claim",
            &claim_body(&raw_key, "lead@example.com"),
            "198.51.100.1",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["tenant_name"], "Night Owls");
    let tenant_id: TenantId = body["tenant_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.tenant(tenant_id).await.status(), TenantStatus::Active);
    assert_eq!(app.store.all_admins().await.len(), 1);
    assert_eq!(app.audit_count(actions::LICENSE_KEY_CLAIMED).await, 1);
}

#[tokio::test]
async fn concurrent_claims_of_one_key_succeed_exactly_once() {
    let app = test_app();
    let (_, raw_key) = generate_key(&app).await;

    let mut attempts = Vec::new();
    for i in 0..5 {
        let router = app.router.clone();
        let request = public_request(
            "/api/v1/public/license/claim",
            &claim_body(&raw_key, &format!("lead{}@example.com", i)),
            &format!("198.51.100.{}", i + 10),
        );
        attempts.push(tokio::spawn(async move { send(&router, request).await }));
    }

    let mut created = 0;
    for attempt in attempts {
        let (status, body) = attempt.await.unwrap();
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => assert_eq!(body["error"]["code"], "ERR_INVALID_REQUEST"),
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(app.store.all_tenants().await.len(), 1);
    assert_eq!(app.store.all_entitlements().await.len(), 1);
}

#[tokio::test]
async fn claim_errors_are_indistinguishable() {
    let app = test_app();
    let (_, raw_key) = generate_key(&app).await;

    let (unknown_status, unknown_body) = send(
        &app.router,
        public_request(
            "/api/v1/public/license/claim",
            &claim_body("VRCS-AAAA-BBBB-CCCC-DDDD", "a@example.com"),
            "198.51.100.2",
        ),
    )
    .await;
    let (weak_status, weak_body) = send(
        &app.router,
        public_request(
            "/api/v1/public/license/claim",
            &json!({
                "email": "b@example.com",
                "password": "short",
                "display_name": "Lead",
                "tenant_name": "Crew",
                "license_key": raw_key
            }),
            "198.51.100.3",
        ),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
    assert_eq!(weak_status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_body, weak_body);
    assert!(app.store.all_tenants().await.is_empty());
}

#[tokio::test]
async fn revoking_claimed_key_keeps_entitlement_and_audits_once() {
    let app = test_app();
    let (key_id, raw_key) = generate_key(&app).await;
    let (status, _) = send(
        &app.router,
        public_request(
            "/api/v1/public/license/claim",
            &claim_body(&raw_key, "lead@example.com"),
            "198.51.100.4",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/admin/license-keys/{}/revoke", key_id);
    let (status, body) = send(&app.router, json_request(Method::POST, &uri, &json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "revoked");
    assert!(body.get("key_hash").is_none());

    let (again, body) = send(&app.router, json_request(Method::POST, &uri, &json!({}))).await;
    assert_eq!(again, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ERR_LICENSE_KEY_ALREADY_REVOKED");

    let entitlements = app.store.all_entitlements().await;
    assert_eq!(entitlements.len(), 1);
    assert!(entitlements[0].is_active());
    assert_eq!(app.audit_count(actions::LICENSE_KEY_REVOKED).await, 1);
}

#[tokio::test]
async fn revoked_key_cannot_be_claimed() {
    let app = test_app();
    let (key_id, raw_key) = generate_key(&app).await;
    let uri = format!("/api/v1/admin/license-keys/{}/revoke", key_id);
    let (status, _) = send(&app.router, json_request(Method::POST, &uri, &json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        public_request(
            "/api/v1/public/license/claim",
            &claim_body(&raw_key, "lead@example.com"),
            "198.51.100.5",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.all_tenants().await.is_empty());
}

#[tokio::test]
async fn listed_keys_never_expose_material_or_hash() {
    let app = test_app();
    let (_, raw_key) = generate_key(&app).await;

    let request = Request::builder()
        .uri("/api/v1/admin/license-keys")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let listed = body.to_string();
    assert!(!listed.contains(&raw_key));
    assert!(!listed.contains("key_hash"));
}

// =============================================================================
// Admin Tenant Operations
// =============================================================================

#[tokio::test]
async fn admin_cannot_suspend_active_tenant_directly() {
    let app = test_app();
    let tenant = seed_subscribed_tenant(&app.store).await;

    let uri = format!("/api/v1/admin/tenants/{}/status", tenant.id());
    let (status, body) = send(
        &app.router,
        json_request(Method::PUT, &uri, &json!({ "status": "suspended" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ERR_INVALID_STATUS_TRANSITION");
    assert_eq!(app.tenant(tenant.id()).await.status(), TenantStatus::Active);
    assert_eq!(app.audit_count(actions::TENANT_STATUS_CHANGED).await, 0);
}

#[tokio::test]
async fn admin_suspends_then_reinstates_grace_tenant() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Grace).await;
    let uri = format!("/api/v1/admin/tenants/{}/status", tenant.id());

    let (status, body) = send(
        &app.router,
        json_request(Method::PUT, &uri, &json!({ "status": "suspended" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "suspended");

    let (status, body) = send(
        &app.router,
        json_request(Method::PUT, &uri, &json!({ "status": "active" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(app.tenant(tenant.id()).await.status(), TenantStatus::Active);
    assert_eq!(app.audit_count(actions::TENANT_STATUS_CHANGED).await, 2);
}

#[tokio::test]
async fn admin_rejects_unknown_status() {
    let app = test_app();
    let tenant = seed_subscribed_tenant(&app.store).await;

    let uri = format!("/api/v1/admin/tenants/{}/status", tenant.id());
    let (status, _) = send(
        &app.router,
        json_request(Method::PUT, &uri, &json!({ "status": "deleted" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.tenant(tenant.id()).await.status(), TenantStatus::Active);
}

// =============================================================================
// Billing Guard
// =============================================================================

async fn ok() -> StatusCode {
    StatusCode::OK
}

fn guarded_router(app: &TestApp) -> Router {
    let routes = Router::new().route("/widgets", get(ok).post(ok));
    protect_tenant_routes(routes, app.state.clone()).with_state(app.state.clone())
}

async fn seed_with_status(store: &InMemoryBillingStore, status: TenantStatus) -> Tenant {
    let now = Timestamp::now();
    let mut tenant = Tenant::new_active("Gated Crew", now).unwrap();
    match status {
        TenantStatus::Active => {}
        TenantStatus::Grace => tenant.enter_grace(now.add_days(3), now).unwrap(),
        TenantStatus::Suspended => {
            tenant.enter_grace(now.add_days(3), now).unwrap();
            tenant.suspend(now).unwrap();
        }
        TenantStatus::PendingPayment => {
            tenant = Tenant::new_pending_payment("Gated Crew", now).unwrap();
        }
    }
    store.seed_tenant(tenant.clone()).await;
    tenant
}

#[tokio::test]
async fn grace_tenant_reads_but_cannot_write() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Grace).await;
    let token = app.tenant_token(tenant.id());
    let router = guarded_router(&app);

    let (read, _) = send(&router, tenant_request(Method::GET, "/widgets", &token)).await;
    let (write, body) = send(&router, tenant_request(Method::POST, "/widgets", &token)).await;

    assert_eq!(read, StatusCode::OK);
    assert_eq!(write, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ERR_GRACE_PERIOD_READ_ONLY");
}

#[tokio::test]
async fn suspended_tenant_is_blocked_even_for_reads() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Suspended).await;
    let token = app.tenant_token(tenant.id());
    let router = guarded_router(&app);

    let (status, body) = send(&router, tenant_request(Method::GET, "/widgets", &token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ERR_TENANT_SUSPENDED");
}

#[tokio::test]
async fn pending_payment_tenant_is_read_only() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::PendingPayment).await;
    let token = app.tenant_token(tenant.id());
    let router = guarded_router(&app);

    let (read, _) = send(&router, tenant_request(Method::GET, "/widgets", &token)).await;
    let (write, body) = send(&router, tenant_request(Method::POST, "/widgets", &token)).await;

    assert_eq!(read, StatusCode::OK);
    assert_eq!(write, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ERR_PAYMENT_PENDING_READ_ONLY");
}

#[tokio::test]
async fn revoked_entitlement_blocks_active_tenant() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Active).await;
    let now = Timestamp::now();
    let mut entitlement =
        Entitlement::grant(tenant.id(), "standard", EntitlementSource::AdminGrant, now).unwrap();
    entitlement.revoke(now).unwrap();
    app.store.seed_entitlement(entitlement).await;
    let token = app.tenant_token(tenant.id());

    let (status, body) = send(
        &guarded_router(&app),
        tenant_request(Method::GET, "/widgets", &token),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "ERR_ACCESS_REVOKED");
}

#[tokio::test]
async fn tenant_access_reports_read_only_during_grace() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Grace).await;
    let token = app.tenant_token(tenant.id());

    let (status, body) = send(
        &app.router,
        tenant_request(Method::GET, "/api/v1/tenant/access", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "grace");
    assert_eq!(body["read_only"], true);
}

#[tokio::test]
async fn tenant_routes_require_a_token() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/v1/tenant/access")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "ERR_UNAUTHENTICATED");
}

#[tokio::test]
async fn suspended_tenant_can_still_open_billing_status() {
    let app = test_app();
    let tenant = seed_with_status(&app.store, TenantStatus::Suspended).await;
    let token = app.tenant_token(tenant.id());

    let (status, body) = send(
        &app.router,
        tenant_request(Method::GET, "/api/v1/billing/status", &token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "suspended");
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn public_claims_are_rate_limited_per_client() {
    let app = test_app_with(AppOptions {
        public_limit: 2,
        ..Default::default()
    });
    let body = claim_body("VRCS-AAAA-BBBB-CCCC-DDDD", "lead@example.com");

    for _ in 0..2 {
        let (status, _) = send(
            &app.router,
            public_request("/api/v1/public/license/claim", &body, "192.0.2.50"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (limited, limited_body) = send(
        &app.router,
        public_request("/api/v1/public/license/claim", &body, "192.0.2.50"),
    )
    .await;
    let (other_client, _) = send(
        &app.router,
        public_request("/api/v1/public/license/claim", &body, "192.0.2.51"),
    )
    .await;

    assert_eq!(limited, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited_body["error"]["code"], "ERR_RATE_LIMITED");
    assert_eq!(other_client, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_forwarding_headers_share_the_peer_bucket() {
    let app = test_app_with(AppOptions {
        public_limit: 3,
        ..Default::default()
    });
    let body = claim_body("VRCS-AAAA-BBBB-CCCC-DDDD", "lead@example.com");

    let mut statuses = Vec::new();
    for i in 0..8 {
        let mut request = public_request("/api/v1/public/license/claim", &body, "203.0.113.9");
        let forged = format!("10.0.0.{}", i).parse().unwrap();
        request.headers_mut().insert("X-Forwarded-For", forged);
        let (status, _) = send(&app.router, request).await;
        statuses.push(status);
    }

    let admitted = statuses
        .iter()
        .filter(|status| **status != StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(admitted, 3, "{:?}", statuses);
}

#[tokio::test]
async fn trusted_proxy_header_identifies_clients_behind_one_peer() {
    let app = test_app_with(AppOptions {
        public_limit: 1,
        client_ip_source: ClientIpSource::from_header(Some("CF-Connecting-IP")).unwrap(),
        ..Default::default()
    });
    let body = claim_body("VRCS-AAAA-BBBB-CCCC-DDDD", "lead@example.com");
    let via_proxy = |client: &'static str| {
        let mut request = public_request("/api/v1/public/license/claim", &body, "10.1.1.1");
        request
            .headers_mut()
            .insert("CF-Connecting-IP", header::HeaderValue::from_static(client));
        request
    };

    let (first, _) = send(&app.router, via_proxy("198.51.100.4")).await;
    let (repeat, _) = send(&app.router, via_proxy("198.51.100.4")).await;
    let (other, _) = send(&app.router, via_proxy("198.51.100.5")).await;

    assert_eq!(first, StatusCode::BAD_REQUEST);
    assert_eq!(repeat, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other, StatusCode::BAD_REQUEST);
}
