use crate::env::Env;
use crate::error::ServerError;
use crate::passwords::{hash_password, verify_password};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;

static CREATE_USERS: &str = include_str!("../migrations/0001_create_users.sql");

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserSummary {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            created_at: record.created_at,
        }
    }
}

/// Password table the HTTP layer reads and writes.
#[async_trait]
pub trait UserStore: Send + Sync {
    fn hasher(&self) -> &Argon2<'static>;

    async fn find_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, ServerError>;

    async fn list_users(&self) -> Result<Vec<UserSummary>, ServerError>;

    async fn create_user(&self, username: &str, password: &str) -> Result<UserSummary, ServerError>;

    /// Returns false when no user has `id`.
    async fn update_user(&self, id: i64, username: &str, password: &str) -> Result<bool, ServerError>;

    async fn delete_user(&self, id: i64) -> Result<bool, ServerError>;

    async fn verify_credentials(
        &self,
        username: &str,
        candidate: &str,
    ) -> Result<Option<UserSummary>, ServerError> {
        let Some(record) = self.find_user_by_name(username).await? else {
            return Ok(None);
        };

        if verify_password(self.hasher(), candidate, &record.password_hash) {
            Ok(Some(record.into()))
        } else {
            Ok(None)
        }
    }
}

pub struct Database {
    pool: PgPool,
    hasher: Argon2<'static>,
}

impl Database {
    pub async fn create(config: &Env) -> anyhow::Result<Self> {
        let opts = PgConnectOptions::from_str(&config.database_url)?.statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(opts)
            .await?;

        let database = Self::with_pool(pool);
        database.ensure_schema().await?;
        info!("connected to postgres");

        Ok(database)
    }

    /// Wraps an existing pool. Does not touch the schema.
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            hasher: Argon2::default(),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), ServerError> {
        sqlx::query(CREATE_USERS)
            .persistent(false)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for Database {
    fn hasher(&self) -> &Argon2<'static> {
        &self.hasher
    }

    async fn find_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, ServerError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .persistent(false)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, ServerError> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<UserSummary, ServerError> {
        validate_credentials(username, password)?;
        let hash = hash_password(&self.hasher, password)?;

        let user = sqlx::query_as::<_, UserSummary>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, created_at
            "#,
        )
        .persistent(false)
        .bind(username)
        .bind(hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(&self, id: i64, username: &str, password: &str) -> Result<bool, ServerError> {
        validate_credentials(username, password)?;
        let hash = hash_password(&self.hasher, password)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $1, password_hash = $2
            WHERE id = $3
            "#,
        )
        .persistent(false)
        .bind(username)
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, ServerError> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .persistent(false)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), ServerError> {
    if username.trim().is_empty() {
        return Err(ServerError::Validation("username is required".into()));
    }

    if password.is_empty() {
        return Err(ServerError::Validation("password is required".into()));
    }

    Ok(())
}
