pub mod account;
pub mod role;
pub mod security_event;
pub mod session;

pub use account::Account;
pub use role::Role;
pub use security_event::{SecurityEvent, SecurityEventKind};
pub use session::{Session, SessionContext};
