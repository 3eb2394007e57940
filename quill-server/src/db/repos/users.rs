//! User repository
//!
//! Email uniqueness is left to the UNIQUE constraint; a violation surfaces
//! as `DbError::Conflict`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{is_unique_violation, DbError};
use crate::models::{DisplayName, Email};

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. `password_hash` must already be a PHC string.
    pub async fn create(
        &self,
        name: &DisplayName,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, DbError> {
        sqlx::query_as(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict { resource: "user" }
            } else {
                DbError::Sqlx(e)
            }
        })
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, DbError> {
        sqlx::query_as("SELECT id, name, email, password_hash, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound {
                resource: "user",
                id: id.to_string(),
            })
    }

    pub async fn exists(&self, id: i64) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(exists)
    }
}
