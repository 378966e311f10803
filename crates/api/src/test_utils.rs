//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for constructing
//! `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_user};
//!
//! let mut user_repo = MockUserRepo::new();
//! user_repo.expect_find_by_email().returning(|email| Ok(Some(mock_user(email))));
//!
//! let state = TestStateBuilder::new()
//!     .with_user_repo(user_repo)
//!     .build();
//! ```

use std::sync::Arc;

use chrono::Utc;

use crate::config::{Config, KvBackend};
use crate::models::User;
use crate::repos::{MockStatusRepo, MockUserRepo, Repos};
use crate::services::{JwtTokenService, MockEmailSender, MockTokenService, TokenService};
use crate::state::AppState;
use crate::stores::{
    ExpiringKv, MemoryKv, MockCredentialStore, MockExpiringKv, MockRateLimiter,
    RateLimitResult, Stores,
};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: None,
        kv_backend: KvBackend::Memory,
        smtp_url: None,
        resend_api_key: None,
        sender_email: "tunes <noreply@tunes.test>".to_string(),
        jwt_secret: "test-secret".to_string(),
        strict_email_delivery: false,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Creates a mock user with the given email. The password hash matches no password.
pub fn mock_user(email: &str) -> User {
    User {
        id: 1,
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        is_active: true,
        date_joined: Utc::now(),
    }
}

/// Token service signing with the test config's secret.
pub fn test_token_service() -> JwtTokenService {
    JwtTokenService::new(&test_config().jwt_secret).unwrap()
}

/// Rate limiter that lets everything through.
fn allow_all_rate_limiter() -> MockRateLimiter {
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_check()
        .returning(|_, _, _| Ok(RateLimitResult::Allowed(1)));
    limiter
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store/service not explicitly set,
/// except the rate limiter, which allows every request, and the token
/// service, which signs real tokens.
pub struct TestStateBuilder {
    config: Config,
    user_repo: Option<MockUserRepo>,
    status_repo: Option<MockStatusRepo>,
    kv: Option<MockExpiringKv>,
    credential_store: Option<MockCredentialStore>,
    rate_limiter: Option<MockRateLimiter>,
    email_sender: Option<MockEmailSender>,
    token_service: Option<MockTokenService>,
    memory_stores: bool,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            user_repo: None,
            status_repo: None,
            kv: None,
            credential_store: None,
            rate_limiter: None,
            email_sender: None,
            token_service: None,
            memory_stores: false,
        }
    }

    pub fn with_user_repo(mut self, repo: MockUserRepo) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn with_status_repo(mut self, repo: MockStatusRepo) -> Self {
        self.status_repo = Some(repo);
        self
    }

    pub fn with_kv(mut self, kv: MockExpiringKv) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn with_credential_store(mut self, store: MockCredentialStore) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MockRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_email_sender(mut self, sender: MockEmailSender) -> Self {
        self.email_sender = Some(sender);
        self
    }

    /// Replace the default token service, which signs real tokens with
    /// `test_config().jwt_secret`.
    pub fn with_token_service(mut self, tokens: MockTokenService) -> Self {
        self.token_service = Some(tokens);
        self
    }

    pub fn with_strict_email_delivery(mut self) -> Self {
        self.config.strict_email_delivery = true;
        self
    }

    /// Back every store with one fresh in-memory backend instead of mocks.
    /// Mocks set with `with_credential_store`/`with_rate_limiter` are ignored.
    pub fn with_memory_stores(mut self) -> Self {
        self.memory_stores = true;
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            users: Arc::new(self.user_repo.unwrap_or_else(MockUserRepo::new)),
            status: Arc::new(self.status_repo.unwrap_or_else(MockStatusRepo::new)),
        };

        let stores = if self.memory_stores {
            Stores::new(Arc::new(MemoryKv::new()))
        } else {
            let kv = Arc::new(self.kv.unwrap_or_else(MockExpiringKv::new)) as Arc<dyn ExpiringKv>;
            Stores {
                kv,
                credentials: Arc::new(
                    self.credential_store
                        .unwrap_or_else(MockCredentialStore::new),
                ),
                rate_limiter: Arc::new(
                    self.rate_limiter
                        .unwrap_or_else(allow_all_rate_limiter),
                ),
            }
        };

        let email = Arc::new(self.email_sender.unwrap_or_else(MockEmailSender::new))
            as Arc<dyn crate::services::EmailSender>;

        let tokens: Arc<dyn TokenService> = match self.token_service {
            Some(mock) => Arc::new(mock),
            None => Arc::new(test_token_service()),
        };

        AppState {
            config: self.config,
            repos,
            stores,
            email,
            tokens,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
