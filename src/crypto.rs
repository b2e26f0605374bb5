use aes_gcm::aead::{Aead, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use pbkdf2::pbkdf2_hmac;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

/// PBKDF2 iteration count for key derivation and the vault verifier.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Prefix every encrypted field value carries on disk.
const TOKEN_PREFIX: &str = "enc:v1:";

/// Substituted for a field that fails to decrypt, so one corrupted field
/// never fails the whole record.
pub const DECRYPT_PLACEHOLDER: &str = "[unreadable]";

/// Which string fields are encrypted at rest, keyed by record type.
const PROTECTED_FIELDS: &[(&str, &[&str])] = &[("task", &["title", "notes"])];

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptFailed(String),

    #[error("Ciphertext is malformed")]
    Malformed,

    #[error("Decryption failed (wrong passphrase or corrupted data)")]
    DecryptFailed,
}

/// A derived encryption key, created once per invocation and passed to every
/// encrypt/decrypt call. Dropped with the process; never persisted.
pub struct CryptoSession {
    key: [u8; 32],
}

impl CryptoSession {
    /// Derives a session key from a passphrase with PBKDF2-HMAC-SHA256.
    pub fn derive(passphrase: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key);
        Self { key }
    }

    /// Encrypts a string value into an `enc:v1:<iv>:<tag>:<data>` token
    /// (base64 parts, AES-256-GCM, fresh random nonce per call).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut iv = [0u8; 12];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&iv);
        let encrypted = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;

        if encrypted.len() < 16 {
            return Err(CryptoError::EncryptFailed(
                "encryption output too short".to_string(),
            ));
        }
        // The GCM tag is the trailing 16 bytes of the AEAD output
        let split_at = encrypted.len() - 16;
        let (data, tag) = encrypted.split_at(split_at);

        Ok(format!(
            "{}{}:{}:{}",
            TOKEN_PREFIX,
            B64.encode(iv),
            B64.encode(tag),
            B64.encode(data)
        ))
    }

    /// Reverses `encrypt`. `Malformed` for a token that does not parse,
    /// `DecryptFailed` for a wrong key or corrupted ciphertext.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let body = token.strip_prefix(TOKEN_PREFIX).ok_or(CryptoError::Malformed)?;
        let mut parts = body.split(':');
        let iv = decode_part(parts.next())?;
        let tag = decode_part(parts.next())?;
        let data = decode_part(parts.next())?;
        if parts.next().is_some() || iv.len() != 12 || tag.is_empty() || data.is_empty() {
            return Err(CryptoError::Malformed);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&iv);
        let mut combined = Vec::with_capacity(data.len() + tag.len());
        combined.extend_from_slice(&data);
        combined.extend_from_slice(&tag);

        let decrypted = cipher
            .decrypt(nonce, combined.as_slice())
            .map_err(|_| CryptoError::DecryptFailed)?;

        String::from_utf8(decrypted).map_err(|_| CryptoError::DecryptFailed)
    }
}

fn decode_part(part: Option<&str>) -> Result<Vec<u8>, CryptoError> {
    let part = part.ok_or(CryptoError::Malformed)?;
    B64.decode(part).map_err(|_| CryptoError::Malformed)
}

/// Whether a stored string is an encrypted field token.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(TOKEN_PREFIX)
}

/// The protected field names for a record type (empty for unknown types).
pub fn protected_fields(record_type: &str) -> &'static [&'static str] {
    PROTECTED_FIELDS
        .iter()
        .find(|(record, _)| *record == record_type)
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

/// Encrypts the protected string fields of a JSON record in place. Fields
/// that are absent, null, empty, or already encrypted are left alone.
pub fn encrypt_record(
    session: &CryptoSession,
    record_type: &str,
    record: &mut Value,
) -> Result<(), CryptoError> {
    let Some(object) = record.as_object_mut() else {
        return Ok(());
    };
    for field in protected_fields(record_type) {
        let Some(Value::String(text)) = object.get(*field) else {
            continue;
        };
        if text.is_empty() || is_encrypted(text) {
            continue;
        }
        let token = session.encrypt(text)?;
        object.insert((*field).to_string(), Value::String(token));
    }
    Ok(())
}

/// Decrypts the protected string fields of a JSON record in place. A field
/// that fails to decrypt becomes `DECRYPT_PLACEHOLDER` instead of an error.
pub fn decrypt_record(session: &CryptoSession, record_type: &str, record: &mut Value) {
    let Some(object) = record.as_object_mut() else {
        return;
    };
    for field in protected_fields(record_type) {
        let Some(Value::String(text)) = object.get(*field) else {
            continue;
        };
        if !is_encrypted(text) {
            continue;
        }
        let replacement = match session.decrypt(text) {
            Ok(plaintext) => plaintext,
            Err(_) => DECRYPT_PLACEHOLDER.to_string(),
        };
        object.insert((*field).to_string(), Value::String(replacement));
    }
}

/// Fresh random salt for key derivation.
pub fn generate_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// One-way digest of a passphrase, base64. Non-authoritative: used only as
/// the vault verifier to reject a wrong passphrase before decryption.
pub fn hash_password(password: &str, salt: &[u8], iterations: u32) -> String {
    let mut digest = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut digest);
    B64.encode(digest)
}

pub fn verify_password(password: &str, salt: &[u8], iterations: u32, expected: &str) -> bool {
    hash_password(password, salt, iterations) == expected
}
