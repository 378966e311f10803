//! External service abstractions.
//!
//! Each service is abstracted behind a trait to enable mocking in tests.
//!
//! ## Services
//!
//! - **email** - Transactional email via Resend (prod) or SMTP (dev)
//! - **tokens** - Signed access/refresh tokens for signed-in users
//!
//! ## Usage in Handlers
//!
//! Services are accessed via `AppState`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     state.email.send_reset_code(&email, &code).await?;
//! }
//! ```

mod email;
mod tokens;

pub use email::{EmailSender, EmailSenderImpl};
pub use tokens::{JwtTokenService, TokenKind, TokenService};

#[cfg(test)]
pub use email::MockEmailSender;
#[cfg(test)]
pub use tokens::MockTokenService;
