pub mod password;
pub mod validation;

pub use password::{hash_password, is_legacy, legacy_hash, verify_password};
pub use validation::ValidatedJson;
