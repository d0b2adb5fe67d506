//! Stripe webhook signature verification.
//!
//! HMAC-SHA256 over `"<t>.<raw payload bytes>"`, compared in constant time
//! against every `v1` entry of the `Stripe-Signature` header. All rejection
//! reasons collapse into `false`; callers log the outcome.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Maximum accepted event age.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `t=...,v1=...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    v1_signatures: Vec<String>,
}

impl SignatureHeader {
    /// Strict parse: any malformed pair rejects the whole header.
    fn parse(header: &str) -> Option<Self> {
        if header.trim().is_empty() {
            return None;
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            if key.is_empty() || value.is_empty() {
                return None;
            }
            match key {
                "t" => timestamp = Some(value.parse().ok()?),
                "v1" => v1_signatures.push(value.to_string()),
                // v0 and future schemes are ignored.
                _ => {}
            }
        }

        if v1_signatures.is_empty() {
            return None;
        }
        Some(Self {
            timestamp: timestamp?,
            v1_signatures,
        })
    }
}

/// Verifies `Stripe-Signature` headers.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
    tolerance_secs: i64,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self {
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(tolerance_secs: i64) -> Self {
        Self { tolerance_secs }
    }

    /// Verifies against the current wall clock.
    pub fn verify(&self, payload: &[u8], header: &str, secret: &str) -> bool {
        self.verify_at(payload, header, secret, chrono::Utc::now().timestamp())
    }

    /// Verifies as if the current time were `now` (unix seconds).
    ///
    /// Events exactly `tolerance` seconds old pass. Future timestamps are
    /// accepted since they are still covered by the MAC.
    pub fn verify_at(&self, payload: &[u8], header: &str, secret: &str, now: i64) -> bool {
        let Some(header) = SignatureHeader::parse(header) else {
            return false;
        };

        if now.saturating_sub(header.timestamp) > self.tolerance_secs {
            return false;
        }

        let Some(expected) = compute_signature(secret, header.timestamp, payload) else {
            return false;
        };

        // Evaluate every candidate so timing does not depend on which one matched.
        header
            .v1_signatures
            .iter()
            .filter_map(|candidate| hex::decode(candidate).ok())
            .fold(false, |matched, candidate| {
                constant_time_compare(&expected, &candidate) | matched
            })
    }
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Produces a `Stripe-Signature` header value for `payload`.
///
/// Used by test harnesses and local tooling that replay events.
pub fn sign_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = compute_signature(secret, timestamp, payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}
