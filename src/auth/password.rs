use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    // Verified against when the login is unknown, so both rejection paths do the same work.
    static ref DECOY_HASH: Option<String> = hash_password("decoy-password-never-matches").ok();
}

/// Salted argon2id hash in PHC string form.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow!("hash password: {e}")
        })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow!("parse password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Burn one verification for a login that does not exist.
pub fn verify_decoy(plain: &str) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}

// argon2 is CPU-bound; these keep it off the async workers.

pub async fn spawn_hash(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("password hash task")?
}

pub async fn spawn_verify(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
        .await
        .context("password verify task")?
}

pub async fn spawn_decoy(plain: String) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || verify_decoy(&plain))
        .await
        .context("password decoy task")
}
