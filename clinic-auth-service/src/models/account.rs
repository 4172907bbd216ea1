use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_salt: String,
    pub role_id: i64,
    pub failed_attempts: i32,
    /// A lapsed value stays on the row until the next failure or success
    /// write; only comparison against the current time decides lock state.
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns the unlock time if the account is currently locked.
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locked_until.filter(|until| *until > now)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account_with_lock(locked_until: Option<DateTime<Utc>>) -> Account {
        Account {
            id: 1,
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            password: String::new(),
            password_salt: String::new(),
            role_id: 3,
            failed_attempts: 0,
            locked_until,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn future_lock_is_active() {
        let now = Utc::now();
        let until = now + Duration::minutes(15);
        let account = account_with_lock(Some(until));
        assert_eq!(account.active_lock(now), Some(until));
    }

    #[test]
    fn lapsed_lock_is_not_active() {
        let now = Utc::now();
        let account = account_with_lock(Some(now - Duration::seconds(1)));
        assert_eq!(account.active_lock(now), None);
    }

    #[test]
    fn missing_lock_is_not_active() {
        let account = account_with_lock(None);
        assert_eq!(account.active_lock(Utc::now()), None);
    }

    #[test]
    fn lock_expiring_exactly_now_is_not_active() {
        let now = Utc::now();
        let account = account_with_lock(Some(now));
        assert_eq!(account.active_lock(now), None);
    }
}
