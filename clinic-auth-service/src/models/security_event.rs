use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    LoginSuccess,
    LoginFailure,
    Logout,
    AccountLocked,
    PasswordChanged,
    UnauthorizedAccess,
    RateLimitExceeded,
    SuspiciousActivity,
    SignupSuccess,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::LoginSuccess => "LOGIN_SUCCESS",
            SecurityEventKind::LoginFailure => "LOGIN_FAILURE",
            SecurityEventKind::Logout => "LOGOUT",
            SecurityEventKind::AccountLocked => "ACCOUNT_LOCKED",
            SecurityEventKind::PasswordChanged => "PASSWORD_CHANGED",
            SecurityEventKind::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            SecurityEventKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            SecurityEventKind::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
            SecurityEventKind::SignupSuccess => "SIGNUP_SUCCESS",
        }
    }
}

/// One append-only row destined for the security_events table.
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub account_id: Option<i64>,
    pub email: Option<String>,
    pub client_ip: String,
    pub user_agent: String,
    pub message: String,
}

impl SecurityEvent {
    fn new(kind: SecurityEventKind, client_ip: &str, user_agent: &str) -> Self {
        Self {
            kind,
            account_id: None,
            email: None,
            client_ip: client_ip.to_string(),
            user_agent: user_agent.to_string(),
            message: String::new(),
        }
    }

    pub fn login_success(account_id: i64, email: &str, client_ip: &str, user_agent: &str) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.to_string()),
            message: "Login succeeded".to_string(),
            ..Self::new(SecurityEventKind::LoginSuccess, client_ip, user_agent)
        }
    }

    pub fn login_failure(email: &str, client_ip: &str, user_agent: &str, message: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            message: message.to_string(),
            ..Self::new(SecurityEventKind::LoginFailure, client_ip, user_agent)
        }
    }

    pub fn logout(account_id: i64, client_ip: &str, user_agent: &str) -> Self {
        Self {
            account_id: Some(account_id),
            message: "Session revoked by logout".to_string(),
            ..Self::new(SecurityEventKind::Logout, client_ip, user_agent)
        }
    }

    pub fn account_locked(
        account_id: i64,
        email: &str,
        until: DateTime<Utc>,
        client_ip: &str,
        user_agent: &str,
    ) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.to_string()),
            message: format!("Account locked until {}", until.to_rfc3339()),
            ..Self::new(SecurityEventKind::AccountLocked, client_ip, user_agent)
        }
    }

    pub fn password_changed(account_id: i64, client_ip: &str, user_agent: &str) -> Self {
        Self {
            account_id: Some(account_id),
            message: "Password changed, all sessions revoked".to_string(),
            ..Self::new(SecurityEventKind::PasswordChanged, client_ip, user_agent)
        }
    }

    pub fn unauthorized_access(client_ip: &str, user_agent: &str, message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Self::new(SecurityEventKind::UnauthorizedAccess, client_ip, user_agent)
        }
    }

    pub fn rate_limit_exceeded(endpoint: &str, client_ip: &str, user_agent: &str) -> Self {
        Self {
            message: format!("Rate limit exceeded on {}", endpoint),
            ..Self::new(SecurityEventKind::RateLimitExceeded, client_ip, user_agent)
        }
    }

    pub fn suspicious_activity(
        account_id: Option<i64>,
        email: Option<&str>,
        client_ip: &str,
        user_agent: &str,
        message: &str,
    ) -> Self {
        Self {
            account_id,
            email: email.map(|e| e.to_string()),
            message: message.to_string(),
            ..Self::new(SecurityEventKind::SuspiciousActivity, client_ip, user_agent)
        }
    }

    pub fn signup_success(account_id: i64, email: &str, client_ip: &str, user_agent: &str) -> Self {
        Self {
            account_id: Some(account_id),
            email: Some(email.to_string()),
            message: "Account created".to_string(),
            ..Self::new(SecurityEventKind::SignupSuccess, client_ip, user_agent)
        }
    }
}
