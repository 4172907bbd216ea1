use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPasswordRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

/// Payload returned by login and signup.
#[derive(Debug, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub role: String,
    pub user_id: i64,
}

/// Payload returned by token validation.
#[derive(Debug, Serialize)]
pub struct TokenValidation {
    pub user_id: i64,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_rejects_bad_email() {
        let req = LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn signup_request_enforces_password_length() {
        let req = SignupRequest {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(req.validate().is_err());

        let req = SignupRequest {
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            password: "long enough password".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn change_password_requires_both_fields() {
        let req = ChangePasswordRequest {
            current_password: String::new(),
            new_password: "long enough password".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
