use chrono::Utc;

use crate::dtos::auth::{LoginRequest, SessionGrant, SignupRequest};
use crate::error::AppError;
use crate::models::{Account, SecurityEvent};
use crate::services::metrics;
use crate::services::{Database, LockoutTracker, SecurityAuditLogger, SessionManager};
use crate::utils::password;

/// Orchestrates credential checks, lockout, session issuance, and audit
/// logging for the authentication endpoints.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    sessions: SessionManager,
    lockout: LockoutTracker,
    audit: SecurityAuditLogger,
    default_role: String,
}

impl AuthService {
    pub fn new(
        db: Database,
        sessions: SessionManager,
        lockout: LockoutTracker,
        audit: SecurityAuditLogger,
        default_role: String,
    ) -> Self {
        Self {
            db,
            sessions,
            lockout,
            audit,
            default_role,
        }
    }

    /// Full login flow. The same "Invalid email or password" answer covers
    /// unknown accounts and wrong passwords so responses do not reveal
    /// which half was wrong.
    pub async fn login(
        &self,
        req: LoginRequest,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<SessionGrant, AppError> {
        let Some(account) = self.db.find_account_by_email(&req.email).await? else {
            metrics::record_login_attempt("unknown_account");
            self.audit.record(SecurityEvent::login_failure(
                &req.email,
                client_ip,
                user_agent,
                "Unknown account",
            ));
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Invalid email or password"
            )));
        };

        if let Some(until) = account.active_lock(Utc::now()) {
            metrics::record_login_attempt("locked");
            self.audit.record(SecurityEvent::login_failure(
                &req.email,
                client_ip,
                user_agent,
                "Account is locked",
            ));
            return Err(AppError::AccountLocked { until });
        }

        let verified =
            match password::verify_password(&req.password, &account.password, &account.password_salt)
            {
                Ok(verified) => verified,
                Err(e) => {
                    self.audit.record(SecurityEvent::suspicious_activity(
                        Some(account.id),
                        Some(&account.email),
                        client_ip,
                        user_agent,
                        "Stored credential material is malformed",
                    ));
                    return Err(AppError::InternalError(anyhow::anyhow!(
                        "Stored credential for account {} is unreadable: {}",
                        account.id,
                        e
                    )));
                }
            };

        if !verified {
            metrics::record_login_attempt("bad_password");
            let locked_until = self
                .lockout
                .record_failure(&account, client_ip, user_agent)
                .await?;
            self.audit.record(SecurityEvent::login_failure(
                &req.email,
                client_ip,
                user_agent,
                "Wrong password",
            ));
            return match locked_until {
                Some(until) => Err(AppError::AccountLocked { until }),
                None => Err(AppError::AuthError(anyhow::anyhow!(
                    "Invalid email or password"
                ))),
            };
        }

        if password::is_legacy(&account.password) {
            self.upgrade_legacy_credential(&account, &req.password, client_ip, user_agent)
                .await;
        }
        self.lockout.record_success(&account).await?;

        let role = self
            .db
            .find_role_name(account.role_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Account {} references missing role {}",
                    account.id,
                    account.role_id
                ))
            })?;
        let session = self
            .sessions
            .issue(account.id, &role, client_ip, user_agent)
            .await?;

        metrics::record_login_attempt("success");
        self.audit.record(SecurityEvent::login_success(
            account.id,
            &account.email,
            client_ip,
            user_agent,
        ));
        Ok(SessionGrant {
            token: session.session_token,
            role,
            user_id: account.id,
        })
    }

    /// Rewrites a legacy credential under the current scheme. Best-effort:
    /// the login already succeeded, so a failed upgrade is recorded and
    /// the row stays on the legacy format until the next login.
    async fn upgrade_legacy_credential(
        &self,
        account: &Account,
        plain: &str,
        client_ip: &str,
        user_agent: &str,
    ) {
        let result = match password::hash_password(plain) {
            Ok((hash, salt)) => self.db.update_password(account.id, &hash, &salt).await,
            Err(e) => Err(AppError::InternalError(e)),
        };
        match result {
            Ok(()) => {
                tracing::info!(account_id = account.id, "Upgraded legacy credential");
            }
            Err(e) => {
                tracing::warn!(
                    account_id = account.id,
                    error = %e,
                    "Failed to upgrade legacy credential"
                );
                self.audit.record(SecurityEvent::suspicious_activity(
                    Some(account.id),
                    Some(&account.email),
                    client_ip,
                    user_agent,
                    "Legacy credential upgrade failed",
                ));
            }
        }
    }

    /// Creates an account under the configured default role and signs the
    /// new user in.
    pub async fn signup(
        &self,
        req: SignupRequest,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<SessionGrant, AppError> {
        let role = self
            .db
            .find_role_by_name(&self.default_role)
            .await?
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Default role '{}' is not provisioned",
                    self.default_role
                ))
            })?;

        let (hash, salt) = password::hash_password(&req.password)?;
        let account = self
            .db
            .create_account(&req.name, &req.email, &hash, &salt, role.id)
            .await?;
        let session = self
            .sessions
            .issue(account.id, &role.name, client_ip, user_agent)
            .await?;

        self.audit.record(SecurityEvent::signup_success(
            account.id,
            &account.email,
            client_ip,
            user_agent,
        ));
        Ok(SessionGrant {
            token: session.session_token,
            role: role.name,
            user_id: account.id,
        })
    }

    /// Revokes the presented session.
    pub async fn logout(
        &self,
        token: &str,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<(), AppError> {
        let account_id = self.sessions.revoke(token).await?;
        self.audit
            .record(SecurityEvent::logout(account_id, client_ip, user_agent));
        Ok(())
    }

    /// Re-checks the password of an already-authenticated account. Does
    /// not touch lockout counters; the caller holds a valid session.
    pub async fn verify_password(&self, account_id: i64, plain: &str) -> Result<(), AppError> {
        let account = self
            .db
            .find_account_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Account not found")))?;

        if !password::verify_password(plain, &account.password, &account.password_salt)? {
            return Err(AppError::AuthError(anyhow::anyhow!("Invalid password")));
        }
        Ok(())
    }

    /// Changes the password and revokes every session of the account.
    /// Returns how many sessions were revoked.
    pub async fn change_password(
        &self,
        account_id: i64,
        current: &str,
        new: &str,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<u64, AppError> {
        let account = self
            .db
            .find_account_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Account not found")))?;

        if !password::verify_password(current, &account.password, &account.password_salt)? {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let (hash, salt) = password::hash_password(new)?;
        self.db.update_password(account_id, &hash, &salt).await?;
        let revoked = self.sessions.invalidate_all_for_account(account_id).await?;

        self.audit.record(SecurityEvent::password_changed(
            account_id, client_ip, user_agent,
        ));
        Ok(revoked)
    }
}
