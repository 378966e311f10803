//! HTTP route handlers, one router per top-level path.

pub mod auth;
pub mod health;
pub mod users;
