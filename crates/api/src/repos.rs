//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **users** - The user directory: lookup, signup, password and profile changes, deletion
//! - **status** - Database health checks
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let user = state.repos.users.find_by_email(&email).await?;
//! }
//! ```

mod status;
mod users;

pub use status::{PgStatusRepo, StatusRepo};
pub use users::{PgUserRepo, UserRepo};

#[cfg(test)]
pub use status::MockStatusRepo;
#[cfg(test)]
pub use users::MockUserRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub status: Arc<dyn StatusRepo>,
}
