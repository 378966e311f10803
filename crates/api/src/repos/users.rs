//! User repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use shared::api::UpdateSettingsPayload;
use sqlx::{Pool, Postgres};

use crate::models::User;

/// Repository for user operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Find a user by (normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create a new user with the given email and password hash.
    /// Returns None if the email is already taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<Option<User>>;

    /// Replace a user's password hash.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Apply the present fields of `changes` and return the updated user.
    async fn update_profile(&self, id: i64, changes: &UpdateSettingsPayload) -> Result<User>;

    /// Delete the user.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// PostgreSQL implementation of UserRepo.
#[derive(Clone)]
pub struct PgUserRepo {
    pool: Pool<Postgres>,
}

impl PgUserRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        // A concurrent signup for the same email loses on the unique index
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash) VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: i64, changes: &UpdateSettingsPayload) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
