use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;
use crate::error::AppError;
use crate::models::{Account, SecurityEvent};
use crate::services::metrics;
use crate::services::{Database, SecurityAuditLogger};

/// Lockout columns as they should be written after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Next state after a failed attempt. Reaching the threshold sets the
/// unlock time; the counter keeps climbing past it, so an account whose
/// lock lapsed re-locks on the next failure until a success resets it.
pub fn state_after_failure(
    policy: &LockoutConfig,
    failed_attempts: i32,
    now: DateTime<Utc>,
) -> LockoutState {
    let attempts = failed_attempts.saturating_add(1);
    let locked_until = (attempts >= policy.max_failed_attempts)
        .then(|| now + Duration::seconds(policy.duration_seconds));
    LockoutState {
        failed_attempts: attempts,
        locked_until,
    }
}

pub fn cleared_state() -> LockoutState {
    LockoutState {
        failed_attempts: 0,
        locked_until: None,
    }
}

/// Applies the lockout policy to accounts. State transitions are computed
/// above; this type only persists them and records lock events.
#[derive(Clone)]
pub struct LockoutTracker {
    db: Database,
    audit: SecurityAuditLogger,
    policy: LockoutConfig,
}

impl LockoutTracker {
    pub fn new(db: Database, audit: SecurityAuditLogger, policy: &LockoutConfig) -> Self {
        Self {
            db,
            audit,
            policy: policy.clone(),
        }
    }

    /// Records a failed credential check. Returns the unlock time when
    /// this failure tripped the lock.
    pub async fn record_failure(
        &self,
        account: &Account,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let next = state_after_failure(&self.policy, account.failed_attempts, Utc::now());
        self.db
            .update_lockout_state(account.id, next.failed_attempts, next.locked_until)
            .await?;

        if let Some(until) = next.locked_until {
            tracing::warn!(
                account_id = account.id,
                failed_attempts = next.failed_attempts,
                locked_until = %until,
                "Account locked after repeated failures"
            );
            metrics::record_account_lockout();
            self.audit.record(SecurityEvent::account_locked(
                account.id,
                &account.email,
                until,
                client_ip,
                user_agent,
            ));
        }
        Ok(next.locked_until)
    }

    /// Clears lockout state after a successful credential check. Skips the
    /// write when there is nothing to clear.
    pub async fn record_success(&self, account: &Account) -> Result<(), AppError> {
        if account.failed_attempts == 0 && account.locked_until.is_none() {
            return Ok(());
        }
        let cleared = cleared_state();
        self.db
            .update_lockout_state(account.id, cleared.failed_attempts, cleared.locked_until)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutConfig {
        LockoutConfig {
            max_failed_attempts: 5,
            duration_seconds: 900,
        }
    }

    #[test]
    fn early_failures_only_count() {
        let now = Utc::now();
        for attempts in 0..3 {
            let next = state_after_failure(&policy(), attempts, now);
            assert_eq!(next.failed_attempts, attempts + 1);
            assert_eq!(next.locked_until, None);
        }
    }

    #[test]
    fn fifth_failure_locks_for_the_configured_window() {
        let now = Utc::now();
        let next = state_after_failure(&policy(), 4, now);
        assert_eq!(next.failed_attempts, 5);
        assert_eq!(next.locked_until, Some(now + Duration::seconds(900)));
    }

    #[test]
    fn failure_after_lapsed_lock_relocks_immediately() {
        // The counter survives a lapsed lock, so one more failure is enough.
        let now = Utc::now();
        let next = state_after_failure(&policy(), 5, now);
        assert_eq!(next.failed_attempts, 6);
        assert_eq!(next.locked_until, Some(now + Duration::seconds(900)));
    }

    #[test]
    fn counter_saturates_instead_of_wrapping() {
        let next = state_after_failure(&policy(), i32::MAX, Utc::now());
        assert_eq!(next.failed_attempts, i32::MAX);
        assert!(next.locked_until.is_some());
    }

    #[test]
    fn success_clears_everything() {
        let cleared = cleared_state();
        assert_eq!(cleared.failed_attempts, 0);
        assert_eq!(cleared.locked_until, None);
    }

    #[test]
    fn threshold_of_one_locks_on_first_failure() {
        let strict = LockoutConfig {
            max_failed_attempts: 1,
            duration_seconds: 60,
        };
        let next = state_after_failure(&strict, 0, Utc::now());
        assert_eq!(next.failed_attempts, 1);
        assert!(next.locked_until.is_some());
    }
}
