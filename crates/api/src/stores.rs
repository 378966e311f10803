//! Ephemeral stores.
//!
//! Everything here has automatic TTL-based expiration. All stores share one
//! [`ExpiringKv`] backend: Redis in deployments, an in-process map for local
//! development and tests.
//!
//! ## Stores
//!
//! - **kv** - The expiring key/value backend (get, add-if-absent, compare-and-delete, counters)
//! - **credentials** - Password reset codes (2 min TTL) and session tokens (10 min TTL)
//! - **rate_limit** - Fixed-window counters per email
//!
//! ## Key Patterns
//!
//! ```text
//! credential:code:{email}        → 4-digit reset code (auto-expires)
//! credential:token:{email}       → 32-char reset session token (auto-expires)
//! ratelimit:reset-code:{email}   → Reset code request limit
//! ratelimit:reset-verify:{email} → Reset code redemption limit
//! ratelimit:reset-token:{email}  → Session token redemption limit
//! ```
//!
//! ## Usage in Handlers
//!
//! Stores are accessed via `state.stores`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let code = state.stores.credentials.get_or_create(&email, Purpose::ResetCode).await?;
//! }
//! ```

mod credentials;
mod kv;
mod rate_limit;

pub use credentials::{CredentialStore, KvCredentialStore, Purpose};
pub use kv::{ExpiringKv, MemoryKv, RedisKv};
pub use rate_limit::{KvRateLimiter, RateLimitResult, RateLimiter};

#[cfg(test)]
pub use credentials::MockCredentialStore;
#[cfg(test)]
pub use kv::MockExpiringKv;
#[cfg(test)]
pub use rate_limit::MockRateLimiter;

use std::sync::Arc;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub kv: Arc<dyn ExpiringKv>,
    pub credentials: Arc<dyn CredentialStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl Stores {
    /// Build every store on top of one backend.
    pub fn new(kv: Arc<dyn ExpiringKv>) -> Self {
        Self {
            credentials: Arc::new(KvCredentialStore::new(kv.clone())),
            rate_limiter: Arc::new(KvRateLimiter::new(kv.clone())),
            kv,
        }
    }
}
