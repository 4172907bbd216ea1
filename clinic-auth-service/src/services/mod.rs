mod auth;
mod database;
mod lockout;
pub mod metrics;
mod rate_limit;
pub mod redis;
mod security_audit;
mod sessions;

pub use auth::AuthService;
pub use database::Database;
pub use lockout::{cleared_state, state_after_failure, LockoutState, LockoutTracker};
pub use rate_limit::RateLimitService;
pub use redis::{AuthCache, DisabledCache, FailingCache, MockCache, RedisCache};
pub use security_audit::SecurityAuditLogger;
pub use sessions::SessionManager;
