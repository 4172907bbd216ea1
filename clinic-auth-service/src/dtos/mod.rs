pub mod auth;

use serde::Serialize;

/// Response envelope shared by every endpoint. Failures populate `error`,
/// successes populate `msg`; the other field stays empty.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub error: String,
    pub msg: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(msg: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            error: String::new(),
            msg: msg.into(),
            data,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            msg: String::new(),
            data: serde_json::json!({}),
        }
    }
}
