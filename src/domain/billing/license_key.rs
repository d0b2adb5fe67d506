//! License keys: one-time-claimable credentials that bootstrap a tenant.
//!
//! Raw key material has the form `VRCS-XXXXX-XXXXX-XXXXX-XXXXX` and is shown
//! exactly once, at generation. Only a SHA-256 digest of the normalized key
//! and a short hint are persisted.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::{
    LicenseKeyId, StateMachine, TenantId, Timestamp, ValidationError,
};

use super::errors::BillingError;

/// Prefix of every generated key.
pub const KEY_PREFIX: &str = "VRCS";

/// Characters used for key material. No 0/O or 1/I.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const KEY_GROUPS: usize = 4;
const KEY_GROUP_LEN: usize = 5;
const HINT_LEN: usize = 4;

/// Largest batch a single generate call may create.
pub const MAX_GENERATE_BATCH: usize = 100;

/// Longest memo accepted on a key.
pub const MAX_MEMO_LEN: usize = 500;

/// Lifecycle status of a license key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseKeyStatus {
    Unclaimed,
    Claimed,
    Revoked,
    Expired,
}

impl LicenseKeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseKeyStatus::Unclaimed => "unclaimed",
            LicenseKeyStatus::Claimed => "claimed",
            LicenseKeyStatus::Revoked => "revoked",
            LicenseKeyStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for LicenseKeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseKeyStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclaimed" => Ok(LicenseKeyStatus::Unclaimed),
            "claimed" => Ok(LicenseKeyStatus::Claimed),
            "revoked" => Ok(LicenseKeyStatus::Revoked),
            "expired" => Ok(LicenseKeyStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown license key status '{}'", other),
            )),
        }
    }
}

impl StateMachine for LicenseKeyStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use LicenseKeyStatus::*;
        match self {
            Unclaimed => vec![Claimed, Revoked, Expired],
            Claimed => vec![Revoked],
            Expired => vec![Revoked],
            Revoked => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    pub id: LicenseKeyId,
    /// Hex SHA-256 of the normalized key material.
    pub key_hash: String,
    /// Last characters of the key, for operator display.
    pub key_hint: String,
    pub status: LicenseKeyStatus,
    pub expires_at: Option<Timestamp>,
    pub memo: String,
    pub claimed_at: Option<Timestamp>,
    pub claimed_by: Option<TenantId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A freshly generated key together with its raw material.
pub struct IssuedLicenseKey {
    pub key: LicenseKey,
    pub raw_key: SecretString,
}

impl LicenseKey {
    /// Generates a new unclaimed key with random material.
    pub fn issue(
        expires_at: Option<Timestamp>,
        memo: &str,
        now: Timestamp,
    ) -> Result<IssuedLicenseKey, BillingError> {
        let raw = generate_key_material();
        let key = Self::from_material(&raw, expires_at, memo, now)?;
        Ok(IssuedLicenseKey {
            key,
            raw_key: SecretString::new(raw),
        })
    }

    /// Builds an unclaimed key record for known material.
    pub fn from_material(
        raw_key: &str,
        expires_at: Option<Timestamp>,
        memo: &str,
        now: Timestamp,
    ) -> Result<Self, BillingError> {
        let memo = memo.trim();
        if memo.chars().count() > MAX_MEMO_LEN {
            return Err(BillingError::validation(
                "memo",
                format!("must be at most {} characters", MAX_MEMO_LEN),
            ));
        }
        if let Some(expires_at) = expires_at {
            if !expires_at.is_after(&now) {
                return Err(BillingError::validation(
                    "expires_at",
                    "must be in the future",
                ));
            }
        }
        let normalized = normalize_key(raw_key);
        Ok(Self {
            id: LicenseKeyId::new(),
            key_hash: digest_normalized(&normalized),
            key_hint: hint_of(&normalized),
            status: LicenseKeyStatus::Unclaimed,
            expires_at,
            memo: memo.to_string(),
            claimed_at: None,
            claimed_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(false, |at| !at.is_after(&now))
    }

    /// Status as observed at `now`: unclaimed keys past their expiry read as expired.
    pub fn effective_status(&self, now: Timestamp) -> LicenseKeyStatus {
        if self.status == LicenseKeyStatus::Unclaimed && self.is_expired_at(now) {
            LicenseKeyStatus::Expired
        } else {
            self.status
        }
    }

    /// Fails unless the key is unclaimed and unexpired at `now`.
    pub fn ensure_claimable(&self, now: Timestamp) -> Result<(), BillingError> {
        match self.status {
            LicenseKeyStatus::Unclaimed if self.is_expired_at(now) => {
                Err(BillingError::LicenseKeyExpired)
            }
            LicenseKeyStatus::Unclaimed => Ok(()),
            LicenseKeyStatus::Claimed => Err(BillingError::LicenseKeyAlreadyClaimed),
            LicenseKeyStatus::Expired => Err(BillingError::LicenseKeyExpired),
            LicenseKeyStatus::Revoked => Err(BillingError::LicenseKeyNotClaimable {
                status: self.status.as_str().to_string(),
            }),
        }
    }

    /// Marks the key claimed by `tenant_id`.
    pub fn claim(&mut self, tenant_id: TenantId, now: Timestamp) -> Result<(), BillingError> {
        self.ensure_claimable(now)?;
        self.status = self
            .status
            .transition_to(LicenseKeyStatus::Claimed)
            .map_err(|_| BillingError::LicenseKeyAlreadyClaimed)?;
        self.claimed_at = Some(now);
        self.claimed_by = Some(tenant_id);
        self.updated_at = now;
        Ok(())
    }

    /// Revokes the key from any state except `revoked`.
    ///
    /// Claim metadata is kept; the entitlement a claim granted is unaffected.
    pub fn revoke(&mut self, now: Timestamp) -> Result<(), BillingError> {
        self.status = self
            .status
            .transition_to(LicenseKeyStatus::Revoked)
            .map_err(|_| BillingError::LicenseKeyAlreadyRevoked)?;
        self.updated_at = now;
        Ok(())
    }
}

/// Clamps a requested batch size: non-positive means one key.
pub fn normalize_batch_size(count: i64) -> usize {
    if count <= 0 {
        1
    } else {
        (count as usize).min(MAX_GENERATE_BATCH)
    }
}

/// Generates raw key material from the thread-local CSPRNG.
pub fn generate_key_material() -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(KEY_PREFIX.len() + KEY_GROUPS * (KEY_GROUP_LEN + 1));
    out.push_str(KEY_PREFIX);
    for _ in 0..KEY_GROUPS {
        out.push('-');
        for _ in 0..KEY_GROUP_LEN {
            let idx = rng.random_range(0..KEY_ALPHABET.len());
            out.push(KEY_ALPHABET[idx] as char);
        }
    }
    out
}

/// Uppercases and strips separators so `vrcs-abcde…` and `VRCSABCDE…` match.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// True if `raw` has the shape of a generated key.
pub fn is_well_formed(raw: &str) -> bool {
    let normalized = normalize_key(raw);
    let Some(body) = normalized.strip_prefix(KEY_PREFIX) else {
        return false;
    };
    body.len() == KEY_GROUPS * KEY_GROUP_LEN && body.bytes().all(|b| KEY_ALPHABET.contains(&b))
}

/// Digest used to look keys up without storing the material.
pub fn key_digest(raw: &SecretString) -> String {
    digest_normalized(&normalize_key(raw.expose_secret()))
}

fn digest_normalized(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn hint_of(normalized: &str) -> String {
    let chars: Vec<char> = normalized.chars().collect();
    let start = chars.len().saturating_sub(HINT_LEN);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ══════════════════════════════════════════════════════════════
    // Key material
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn generated_material_has_expected_shape() {
        let raw = generate_key_material();
        assert_eq!(raw.len(), 4 + 4 * 6);
        assert!(raw.starts_with("VRCS-"));
        assert_eq!(raw.split('-').count(), 5);
        assert!(is_well_formed(&raw));
    }

    #[test]
    fn generated_material_is_not_repeated() {
        let a = generate_key_material();
        let b = generate_key_material();
        assert_ne!(a, b);
    }

    #[test]
    fn normalization_ignores_case_spaces_and_dashes() {
        assert_eq!(
            normalize_key(" vrcs-abcde-fghjk "),
            normalize_key("VRCSABCDEFGHJK")
        );
    }

    #[test]
    fn digest_matches_across_spellings() {
        let key =
            LicenseKey::from_material("VRCS-AAAAA-BBBBB-CCCCC-DDDDD", None, "", Timestamp::now())
                .unwrap();
        let typed = SecretString::new("vrcs aaaaa bbbbb ccccc ddddd".to_string());
        assert_eq!(key_digest(&typed), key.key_hash);
        assert_eq!(key.key_hint, "DDDD");
    }

    #[test]
    fn malformed_material_is_rejected() {
        assert!(!is_well_formed("VRCS-AAAA"));
        assert!(!is_well_formed("ABCD-AAAAA-BBBBB-CCCCC-DDDDD"));
        assert!(!is_well_formed("VRCS-AAAAA-BBBBB-CCCCC-DDDD0"));
    }

    #[test]
    fn batch_size_defaults_and_caps() {
        assert_eq!(normalize_batch_size(0), 1);
        assert_eq!(normalize_batch_size(-3), 1);
        assert_eq!(normalize_batch_size(7), 7);
        assert_eq!(normalize_batch_size(10_000), MAX_GENERATE_BATCH);
    }

    // ══════════════════════════════════════════════════════════════
    // Lifecycle
    // ══════════════════════════════════════════════════════════════

    fn unclaimed(expires_at: Option<Timestamp>, now: Timestamp) -> LicenseKey {
        LicenseKey::issue(expires_at, "booth sale", now).unwrap().key
    }

    #[test]
    fn claim_sets_claim_metadata_once() {
        let now = Timestamp::now();
        let tenant = TenantId::new();
        let mut key = unclaimed(None, now);

        key.claim(tenant, now).unwrap();
        assert_eq!(key.status, LicenseKeyStatus::Claimed);
        assert_eq!(key.claimed_by, Some(tenant));
        assert_eq!(key.claimed_at, Some(now));

        assert_eq!(
            key.claim(TenantId::new(), now),
            Err(BillingError::LicenseKeyAlreadyClaimed)
        );
        assert_eq!(key.claimed_by, Some(tenant));
    }

    #[test]
    fn expired_key_cannot_be_claimed() {
        let now = Timestamp::now();
        let mut key = unclaimed(Some(now.add_days(1)), now);
        let later = now.add_days(2);
        assert_eq!(key.effective_status(later), LicenseKeyStatus::Expired);
        assert_eq!(key.claim(TenantId::new(), later), Err(BillingError::LicenseKeyExpired));
    }

    #[test]
    fn expiry_must_be_in_the_future() {
        let now = Timestamp::now();
        assert!(LicenseKey::issue(Some(now), "", now).is_err());
    }

    #[test]
    fn claimed_key_can_be_revoked_keeping_claim_data() {
        let now = Timestamp::now();
        let tenant = TenantId::new();
        let mut key = unclaimed(None, now);
        key.claim(tenant, now).unwrap();

        key.revoke(now).unwrap();
        assert_eq!(key.status, LicenseKeyStatus::Revoked);
        assert_eq!(key.claimed_by, Some(tenant));
    }

    #[test]
    fn double_revoke_is_conflict() {
        let now = Timestamp::now();
        let mut key = unclaimed(None, now);
        key.revoke(now).unwrap();
        assert_eq!(key.revoke(now), Err(BillingError::LicenseKeyAlreadyRevoked));
    }

    #[test]
    fn revoked_key_is_not_claimable() {
        let now = Timestamp::now();
        let mut key = unclaimed(None, now);
        key.revoke(now).unwrap();
        assert!(matches!(
            key.ensure_claimable(now),
            Err(BillingError::LicenseKeyNotClaimable { .. })
        ));
    }

    #[test]
    fn overlong_memo_is_rejected() {
        let memo = "m".repeat(MAX_MEMO_LEN + 1);
        assert!(LicenseKey::issue(None, &memo, Timestamp::now()).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Property tests
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[a-zA-Z0-9 \\-]{0,40}") {
            let once = normalize_key(&raw);
            prop_assert_eq!(normalize_key(&once), once);
        }

        #[test]
        fn formatting_does_not_change_the_digest(seed in 0u8..32) {
            let raw = generate_key_material();
            let separator = " ".repeat(seed as usize % 3);
            let messy = format!(" {} ", raw.to_ascii_lowercase().replace('-', &separator));
            prop_assert_eq!(
                key_digest(&SecretString::new(raw)),
                key_digest(&SecretString::new(messy))
            );
        }
    }
}
