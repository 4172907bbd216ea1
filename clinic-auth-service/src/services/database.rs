use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::error::AppError;
use crate::models::{Account, Role, SecurityEvent, Session, SessionContext};

/// Database access layer over the PostgreSQL pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password, password_salt, role_id,
                   failed_attempts, locked_until, created_at, updated_at, deleted_at
            FROM accounts
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find account by email: {}", e))
        })
    }

    pub async fn find_account_by_id(&self, account_id: i64) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password, password_salt, role_id,
                   failed_attempts, locked_until, created_at, updated_at, deleted_at
            FROM accounts
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find account by id: {}", e))
        })
    }

    #[instrument(skip(self, password_hash, password_salt))]
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        password_salt: &str,
        role_id: i64,
    ) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, email, password, password_salt, role_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password, password_salt, role_id,
                      failed_attempts, locked_until, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(password_salt)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create account: {}", e)),
        })
    }

    /// Overwrites stored credential material. Lockout columns are managed
    /// separately through [`Database::update_lockout_state`].
    pub async fn update_password(
        &self,
        account_id: i64,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password = $2, password_salt = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .bind(password_hash)
        .bind(password_salt)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update password: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Account not found")));
        }
        Ok(())
    }

    /// Plain last-writer-wins update of the lockout columns.
    pub async fn update_lockout_state(
        &self,
        account_id: i64,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = $2, locked_until = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .bind(failed_attempts)
        .bind(locked_until)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update lockout state: {}", e))
        })?;
        Ok(())
    }

    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to find role by name: {}", e))
            })
    }

    pub async fn find_role_name(&self, role_id: i64) -> Result<Option<String>, AppError> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to find role name: {}", e))
            })?;
        Ok(name)
    }

    pub async fn create_session(
        &self,
        user_id: i64,
        session_token: &str,
        expires_at: DateTime<Utc>,
        client_ip: &str,
        browser: &str,
    ) -> Result<Session, AppError> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, session_token, expires_at, client_ip, browser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, session_token, expires_at, client_ip, browser,
                      created_at, deleted_at
            "#,
        )
        .bind(user_id)
        .bind(session_token)
        .bind(expires_at)
        .bind(client_ip)
        .bind(browser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create session: {}", e))
        })
    }

    /// Joins the session to its live account and role. Expiry is left to
    /// the caller so clock handling stays in one place.
    pub async fn find_session_context(
        &self,
        session_token: &str,
    ) -> Result<Option<SessionContext>, AppError> {
        sqlx::query_as::<_, SessionContext>(
            r#"
            SELECT s.user_id AS account_id, r.name AS role, s.expires_at
            FROM sessions s
            JOIN accounts a ON a.id = s.user_id
            JOIN roles r ON r.id = a.role_id
            WHERE s.session_token = $1
              AND s.deleted_at IS NULL
              AND a.deleted_at IS NULL
            "#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to look up session: {}", e))
        })
    }

    /// Tombstones one session. Returns the owning account id, or None when
    /// no live row matched the token.
    pub async fn revoke_session(&self, session_token: &str) -> Result<Option<i64>, AppError> {
        let user_id: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE sessions
            SET deleted_at = NOW()
            WHERE session_token = $1 AND deleted_at IS NULL
            RETURNING user_id
            "#,
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to revoke session: {}", e))
        })?;
        Ok(user_id)
    }

    #[instrument(skip(self))]
    pub async fn revoke_sessions_for_account(&self, account_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET deleted_at = NOW()
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to revoke sessions for account: {}",
                e
            ))
        })?;
        Ok(result.rows_affected())
    }

    pub async fn insert_security_event(&self, event: &SecurityEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO security_events (event_type, account_id, email, client_ip, user_agent, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(event.account_id)
        .bind(event.email.as_deref())
        .bind(&event.client_ip)
        .bind(&event.user_agent)
        .bind(&event.message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert security event: {}", e))
        })?;
        Ok(())
    }
}
