use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub client_ip: String,
    pub browser: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_revoked(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

/// Projection of the session/account/role join used to answer validation.
#[derive(Debug, Clone, FromRow)]
pub struct SessionContext {
    pub account_id: i64,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>, deleted_at: Option<DateTime<Utc>>) -> Session {
        Session {
            id: 1,
            user_id: 7,
            session_token: "abc".to_string(),
            expires_at,
            client_ip: "127.0.0.1".to_string(),
            browser: "test".to_string(),
            created_at: Utc::now(),
            deleted_at,
        }
    }

    #[test]
    fn live_session_is_valid() {
        let now = Utc::now();
        assert!(session(now + Duration::hours(1), None).is_valid(now));
    }

    #[test]
    fn expired_session_is_invalid() {
        let now = Utc::now();
        let s = session(now - Duration::seconds(1), None);
        assert!(s.is_expired(now));
        assert!(!s.is_valid(now));
    }

    #[test]
    fn session_expiring_exactly_now_is_expired() {
        let now = Utc::now();
        assert!(session(now, None).is_expired(now));
    }

    #[test]
    fn revoked_session_is_invalid_even_before_expiry() {
        let now = Utc::now();
        let s = session(now + Duration::hours(1), Some(now));
        assert!(s.is_revoked());
        assert!(!s.is_valid(now));
    }
}
