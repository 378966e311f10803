//! Short-lived, single-use credentials for the password reset flow.
//!
//! A credential is keyed by (identity, purpose). While one is live, issuing
//! again returns the same secret with its original expiry. Redeeming it deletes
//! it atomically, so of two racing redemptions at most one succeeds.

use std::{fmt, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

use super::kv::ExpiringKv;

const DIGITS: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Issue attempts before giving up when the stored secret keeps vanishing
/// between a lost add and the read-back.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// What a credential is for. Decides its key namespace, secret shape and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Emailed to the user to prove they own the address.
    ResetCode,
    /// Handed out after a reset code was redeemed; authorizes the password change.
    SessionToken,
}

impl Purpose {
    fn namespace(self) -> &'static str {
        match self {
            Purpose::ResetCode => "code",
            Purpose::SessionToken => "token",
        }
    }

    fn alphabet(self) -> &'static [u8] {
        match self {
            Purpose::ResetCode => DIGITS,
            Purpose::SessionToken => ALPHANUMERIC,
        }
    }

    /// Number of characters in a secret.
    pub fn length(self) -> usize {
        match self {
            Purpose::ResetCode => 4,
            Purpose::SessionToken => 32,
        }
    }

    /// How long a secret stays redeemable after issuance.
    pub fn ttl(self) -> Duration {
        match self {
            Purpose::ResetCode => Duration::from_secs(2 * 60),
            Purpose::SessionToken => Duration::from_secs(10 * 60),
        }
    }

    fn key(self, identity: &str) -> String {
        format!("credential:{}:{}", self.namespace(), identity)
    }

    /// Draw a fresh secret: independent uniform picks from the alphabet.
    pub fn generate(self) -> String {
        let alphabet = self.alphabet();
        let mut rng = rand::rng();
        (0..self.length())
            .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
            .collect()
    }

    /// Whether `candidate` has the exact length and charset of a secret.
    /// Callers check this before redeeming, and report a failure as malformed
    /// input rather than as a wrong secret.
    pub fn is_well_formed(self, candidate: &str) -> bool {
        let alphabet = self.alphabet();
        candidate.len() == self.length() && candidate.bytes().all(|b| alphabet.contains(&b))
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::ResetCode => f.write_str("reset code"),
            Purpose::SessionToken => f.write_str("session token"),
        }
    }
}

/// Store for issuing and redeeming credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the live secret for (identity, purpose), issuing one if none exists.
    async fn get_or_create(&self, identity: &str, purpose: Purpose) -> Result<String>;

    /// Consume the live secret if it equals `candidate` exactly.
    /// A mismatch leaves the live secret in place.
    async fn try_redeem(
        &self,
        identity: &str,
        purpose: Purpose,
        candidate: &str,
    ) -> Result<bool>;
}

/// CredentialStore backed by an expiring key/value store.
#[derive(Clone)]
pub struct KvCredentialStore {
    kv: Arc<dyn ExpiringKv>,
}

impl KvCredentialStore {
    pub fn new(kv: Arc<dyn ExpiringKv>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl CredentialStore for KvCredentialStore {
    async fn get_or_create(&self, identity: &str, purpose: Purpose) -> Result<String> {
        let key = purpose.key(identity);

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            if let Some(secret) = self.kv.get(&key).await? {
                return Ok(secret);
            }

            let secret = purpose.generate();
            if self.kv.add(&key, &secret, purpose.ttl()).await? {
                tracing::debug!(purpose = %purpose, "issued credential");
                return Ok(secret);
            }
            // Lost the race to a concurrent issuer; read back its secret
        }

        anyhow::bail!("could not issue {} after {} attempts", purpose, MAX_ISSUE_ATTEMPTS)
    }

    async fn try_redeem(
        &self,
        identity: &str,
        purpose: Purpose,
        candidate: &str,
    ) -> Result<bool> {
        let key = purpose.key(identity);
        self.kv.delete_if_equals(&key, candidate).await
    }
}
