use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed: ciphertext is malformed or the key/salt do not match")]
    Decrypt,
    #[error("ciphertext is not valid base64")]
    Encoding,
}

/// Derives a per-tenant AES-256 key from `tenant` and `salt`. Deterministic
/// by design: the same `(tenant, salt)` pair must always produce the same
/// key so `decrypt` can reverse `encrypt` without a separate key store.
fn derive_key(tenant: &str, salt: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}

/// `encrypt(value, tenant, salt)` per the `NamedConfig` contract (design
/// §3). Output is `base64(nonce || ciphertext)`.
pub fn encrypt_value(value: &str, tenant: &str, salt: &str) -> Result<String, SecretError> {
    let key = derive_key(tenant, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::Encrypt)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher.encrypt(nonce, value.as_bytes()).map_err(|_| SecretError::Encrypt)?;
    let mut out = nonce_bytes.to_vec();
    out.extend_from_slice(&ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(out))
}

/// Reverses [`encrypt_value`].
pub fn decrypt_value(encoded: &str, tenant: &str, salt: &str) -> Result<String, SecretError> {
    let raw = base64::engine::general_purpose::STANDARD.decode(encoded).map_err(|_| SecretError::Encoding)?;
    if raw.len() < NONCE_LEN {
        return Err(SecretError::Decrypt);
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let key = derive_key(tenant, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::Decrypt)?;
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| SecretError::Decrypt)?;
    String::from_utf8(plaintext).map_err(|_| SecretError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let encrypted = encrypt_value("s3cret", "acme", "pepper").unwrap();
        assert_eq!(decrypt_value(&encrypted, "acme", "pepper").unwrap(), "s3cret");
    }

    #[test]
    fn wrong_tenant_fails_to_decrypt() {
        let encrypted = encrypt_value("s3cret", "acme", "pepper").unwrap();
        assert!(decrypt_value(&encrypted, "other", "pepper").is_err());
    }
}
