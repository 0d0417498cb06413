//! User repository for database operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{CreateUserRequest, User};

/// Resolves a claimed username to its numeric user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up the id for `username`. Unknown users are an error.
    async fn resolve_user_id(&self, username: &str) -> Result<i64>;
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        debug!("Creating user: {}", request.username);

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (username, email)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert user")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")
    }

    /// Get a user by username.
    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by username")
    }

    /// List all users, oldest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT id, username, email, created_at FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")
    }

    /// Get just the id for a username.
    #[instrument(skip(self))]
    pub async fn find_id_by_username(&self, username: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user id by username")
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn resolve_user_id(&self, username: &str) -> Result<i64> {
        self.find_id_by_username(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", username))
    }
}
