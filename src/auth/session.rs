//! Tamper-evident session tokens.
//!
//! A token is `base64url(issued_at ‖ nonce ‖ ciphertext ‖ tag)`:
//!
//! * `issued_at`: big-endian unix seconds (8 bytes), checked against the
//!   configured max age;
//! * `nonce` / `ciphertext`: AES-256-GCM over the JSON-encoded [`Identity`],
//!   keyed by the block key;
//! * `tag`: HMAC-SHA256 keyed by the hash key over the cookie name and every
//!   byte before it.
//!
//! The tag is verified before anything else is looked at. Every failure on the
//! decode path collapses into `None`: callers cannot tell a forged cookie from
//! no cookie at all.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::debug;

use crate::users::repo_types::Role;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

const TS_LEN: usize = 8;
const NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const MAC_LEN: usize = 32;
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Who is making the request, as carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
    pub role: Role,
}

/// Process-wide key pair: one key for integrity, one for confidentiality.
#[derive(Clone)]
pub struct SessionKeys {
    hash_key: [u8; 64],
    block_key: [u8; 32],
}

impl SessionKeys {
    /// Fresh random keys; tokens minted with them die with the process.
    pub fn generate() -> Self {
        let mut hash_key = [0u8; 64];
        let mut block_key = [0u8; 32];
        OsRng.fill_bytes(&mut hash_key);
        OsRng.fill_bytes(&mut block_key);
        Self {
            hash_key,
            block_key,
        }
    }

    pub fn from_bytes(hash_key: [u8; 64], block_key: [u8; 32]) -> Self {
        Self {
            hash_key,
            block_key,
        }
    }
}

pub struct SessionCodec {
    hash_key: [u8; 64],
    cipher: Aes256Gcm,
    max_age_secs: i64,
}

impl SessionCodec {
    /// `max_age_secs == 0` accepts tokens of any age.
    pub fn new(keys: &SessionKeys, max_age_secs: i64) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&keys.block_key));
        Self {
            hash_key: keys.hash_key,
            cipher,
            max_age_secs,
        }
    }

    fn mac(&self) -> anyhow::Result<HmacSha256> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
        mac.update(SESSION_COOKIE.as_bytes());
        mac.update(b"|");
        Ok(mac)
    }

    pub fn encode(&self, identity: &Identity) -> anyhow::Result<String> {
        self.encode_at(identity, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn encode_at(&self, identity: &Identity, issued_at: i64) -> anyhow::Result<String> {
        let plaintext = serde_json::to_vec(identity)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|e| anyhow::anyhow!("session encrypt: {e}"))?;

        let mut raw = Vec::with_capacity(TS_LEN + NONCE_LEN + ciphertext.len() + MAC_LEN);
        raw.extend_from_slice(&issued_at.to_be_bytes());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        let mut mac = self.mac()?;
        mac.update(&raw);
        raw.extend_from_slice(&mac.finalize().into_bytes());

        debug!(login = %identity.login, "session token issued");
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    pub fn decode(&self, token: &str) -> Option<Identity> {
        self.decode_at(token, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn decode_at(&self, token: &str, now: i64) -> Option<Identity> {
        let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
        if raw.len() < TS_LEN + NONCE_LEN + GCM_TAG_LEN + MAC_LEN {
            debug!("session token truncated");
            return None;
        }
        let (signed, tag) = raw.split_at(raw.len() - MAC_LEN);

        let mut mac = self.mac().ok()?;
        mac.update(signed);
        if mac.verify_slice(tag).is_err() {
            debug!("session token failed verification");
            return None;
        }

        let (ts, rest) = signed.split_at(TS_LEN);
        let issued_at = i64::from_be_bytes(ts.try_into().ok()?);
        if issued_at > now + MAX_CLOCK_SKEW_SECS {
            return None;
        }
        if self.max_age_secs > 0 && now - issued_at > self.max_age_secs {
            debug!(issued_at, "session token expired");
            return None;
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;
        serde_json::from_slice(&plaintext).ok()
    }
}
