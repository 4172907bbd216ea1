pub mod auth;
pub mod client_info;
pub mod metrics;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthSession, SessionIdentity, SESSION_TOKEN_HEADER};
pub use client_info::ClientInfo;
pub use metrics::metrics_middleware;
pub use rate_limit::{rate_limit_middleware, RateLimitState};
