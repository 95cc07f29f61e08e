//! SQLite persistence for panel records.

pub mod migrations;
pub mod models;

use std::{path::Path, str::FromStr};

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use tracing::*;

use crate::auth::{AuthError, Authenticator};
use models::User;

pub const DATABASE_FILE_NAME: &str = "panel.db";

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Clone, Debug)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open, creating it if needed, the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Database opened at {}", path.display());

        Ok(Self { pool })
    }

    /// A private database that lives as long as the returned handle.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        // Each connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<usize, sqlx::Error> {
        migrations::run(&self.pool).await
    }

    /// Create the default administrator when there is no user at all.
    ///
    /// Returns whether the account was created.
    pub async fn seed_default_admin(
        &self,
        authenticator: &Authenticator,
    ) -> Result<bool, StorageError> {
        if self.count_users().await? > 0 {
            return Ok(false);
        }

        let password_hash = authenticator.hash_password(DEFAULT_ADMIN_PASSWORD)?;
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, email, role, active, created_at, updated_at)
            VALUES (?, ?, ?, 'admin', 1, ?, ?)
            "#,
        )
        .bind(DEFAULT_ADMIN_USERNAME)
        .bind(password_hash)
        .bind(DEFAULT_ADMIN_EMAIL)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        warn!(
            "Created default user {DEFAULT_ADMIN_USERNAME:?} with the default password, change it as soon as possible"
        );

        Ok(true)
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, role, active, created_at, updated_at
            FROM users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now().timestamp())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!("Updated password of user #{user_id}");
        Ok(())
    }
}
