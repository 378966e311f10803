use std::sync::Arc;

use crate::{
    config::Config,
    repos::Repos,
    services::{EmailSender, TokenService},
    stores::Stores,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral stores (Redis or in-memory).
    pub stores: Stores,
    /// Email sender.
    pub email: Arc<dyn EmailSender>,
    /// Access/refresh token signer.
    pub tokens: Arc<dyn TokenService>,
}
