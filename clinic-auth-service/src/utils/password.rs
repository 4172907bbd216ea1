//! Credential hashing with transparent legacy migration.
//!
//! Two storage formats coexist. Rows written by this service carry
//! `argon2id$<salt-b64>$<hash-b64>` plus the salt in its own column.
//! Rows inherited from the old backend carry a bare hex HMAC-SHA256
//! digest keyed with a fixed compiled-in key and an empty salt column.
//! Verification accepts both; callers upgrade legacy rows after a
//! successful login.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const MODERN_SCHEME: &str = "argon2id";
const SALT_LEN: usize = 16;
const ARGON2_MEMORY_KIB: u32 = 65536;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

// Key the old backend shipped with. Verification of un-migrated rows
// depends on it, so it cannot rotate.
const LEGACY_HMAC_KEY: &[u8] = b"clinic-backend-legacy-credential-key";

fn argon2_instance() -> Result<Argon2<'static>, anyhow::Error> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt. Returns the tagged hash
/// string and the base64 salt for the dedicated column.
pub fn hash_password(plain: &str) -> Result<(String, String), anyhow::Error> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut output = [0u8; ARGON2_OUTPUT_LEN];
    argon2_instance()?
        .hash_password_into(plain.as_bytes(), &salt, &mut output)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    let salt_b64 = STANDARD.encode(salt);
    let tagged = format!("{}${}${}", MODERN_SCHEME, salt_b64, STANDARD.encode(output));
    Ok((tagged, salt_b64))
}

/// Whether the stored hash predates the tagged scheme.
pub fn is_legacy(stored_hash: &str) -> bool {
    !stored_hash.starts_with(MODERN_SCHEME)
        || !stored_hash[MODERN_SCHEME.len()..].starts_with('$')
}

/// Verifies a password against stored material in either format.
///
/// A mismatch is `Ok(false)`; malformed stored material is an error so
/// corruption never reads as a wrong password.
pub fn verify_password(
    plain: &str,
    stored_hash: &str,
    stored_salt: &str,
) -> Result<bool, anyhow::Error> {
    if is_legacy(stored_hash) {
        return verify_legacy(plain, stored_hash);
    }

    let mut parts = stored_hash.splitn(3, '$');
    let (scheme, _salt_field, hash_field) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(salt), Some(hash)) => (scheme, salt, hash),
        _ => return Err(anyhow::anyhow!("Stored hash is missing fields")),
    };
    if scheme != MODERN_SCHEME {
        return Err(anyhow::anyhow!("Unknown hash scheme '{}'", scheme));
    }

    let salt = STANDARD
        .decode(stored_salt)
        .map_err(|e| anyhow::anyhow!("Stored salt is not valid base64: {}", e))?;
    if salt.is_empty() {
        return Err(anyhow::anyhow!("Stored salt is empty for a tagged hash"));
    }
    let expected = STANDARD
        .decode(hash_field)
        .map_err(|e| anyhow::anyhow!("Stored hash is not valid base64: {}", e))?;
    if expected.len() != ARGON2_OUTPUT_LEN {
        return Err(anyhow::anyhow!(
            "Stored hash has unexpected length {}",
            expected.len()
        ));
    }

    let mut computed = [0u8; ARGON2_OUTPUT_LEN];
    argon2_instance()?
        .hash_password_into(plain.as_bytes(), &salt, &mut computed)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(bool::from(computed.ct_eq(&expected)))
}

/// Computes the legacy digest for a password. Only migration paths and
/// verification of un-migrated rows need this.
pub fn legacy_hash(plain: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(LEGACY_HMAC_KEY)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(plain.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_legacy(plain: &str, stored_hex: &str) -> Result<bool, anyhow::Error> {
    let expected = hex::decode(stored_hex)
        .map_err(|e| anyhow::anyhow!("Stored legacy hash is not valid hex: {}", e))?;

    let mut mac = HmacSha256::new_from_slice(LEGACY_HMAC_KEY)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(plain.as_bytes());
    let computed = mac.finalize().into_bytes();

    if computed.len() != expected.len() {
        return Ok(false);
    }
    Ok(bool::from(computed.as_slice().ct_eq(&expected)))
}
