//! Field-level encryption for sensitive columns (spec.md §3 "sensitive fields").
//!
//! Ported from the original service's Fernet-over-PBKDF2HMAC scheme: a
//! passphrase is stretched into a 256-bit key with PBKDF2-HMAC-SHA256 over a
//! fixed salt, then each field is sealed independently with AES-256-GCM using
//! a fresh random nonce. Values written before encryption was enabled (or by
//! an older build) are not wrapped in the `enc1:` marker, so `decrypt_field`
//! treats unmarked input as plaintext instead of failing closed.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{PailflowError, Result};

const PBKDF2_ITERATIONS: u32 = 100_000;
/// Fixed per-deployment salt, matching the original's non-rotating salt constant.
const FIXED_SALT: &[u8] = b"pailflow-field-encryption-salt-v1";
const NONCE_LEN: usize = 12;
const CIPHERTEXT_MARKER: &str = "enc1:";

/// A derived AES-256-GCM key, kept opaque so callers cannot accidentally log it.
#[derive(Clone)]
pub struct FieldKey([u8; 32]);

impl FieldKey {
    pub fn derive(secret: &str) -> Self {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), FIXED_SALT, PBKDF2_ITERATIONS, &mut key);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// Encrypts `plaintext`, returning a base64url token tagged with [`CIPHERTEXT_MARKER`].
pub fn encrypt_field(key: &FieldKey, plaintext: &str) -> Result<String> {
    let cipher = key.cipher();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| PailflowError::Internal(format!("field encryption failed: {e}")))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);

    Ok(format!(
        "{CIPHERTEXT_MARKER}{}",
        URL_SAFE_NO_PAD.encode(payload)
    ))
}

/// Decrypts a value produced by [`encrypt_field`].
///
/// Values that don't carry the ciphertext marker are returned unchanged —
/// this lets rows written before encryption was turned on keep working.
pub fn decrypt_field(key: &FieldKey, value: &str) -> Result<String> {
    let Some(encoded) = value.strip_prefix(CIPHERTEXT_MARKER) else {
        return Ok(value.to_string());
    };

    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| PailflowError::Internal(format!("field decryption failed: {e}")))?;
    if payload.len() < NONCE_LEN {
        return Err(PailflowError::Internal(
            "field decryption failed: truncated payload".to_string(),
        ));
    }
    let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = key
        .cipher()
        .decrypt(nonce, ciphertext)
        .map_err(|e| PailflowError::Internal(format!("field decryption failed: {e}")))?;

    String::from_utf8(plaintext)
        .map_err(|e| PailflowError::Internal(format!("field decryption failed: {e}")))
}
