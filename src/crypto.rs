//! Opaque field encryption capability.
//!
//! The pipeline itself never encrypts anything; the job store consumes
//! this capability when persisting extracted personal data. Both
//! operations are total: malformed input comes back unchanged instead
//! of raising, so a store read never fails on a ciphertext it cannot
//! interpret.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
/// Marks a string as produced by `AesFieldCipher::encrypt`.
const CIPHERTEXT_PREFIX: &str = "msgcm:";

/// Encrypt/decrypt capability for persisted record fields.
pub trait FieldCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> String;
    fn decrypt(&self, ciphertext: &str) -> String;
}

/// Identity cipher — used when encryption at rest is not configured.
pub struct PassthroughCipher;

impl FieldCipher for PassthroughCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        plaintext.to_string()
    }

    fn decrypt(&self, ciphertext: &str) -> String {
        ciphertext.to_string()
    }
}

/// AES-256-GCM cipher. Ciphertext format: prefix + base64(nonce || ct),
/// where the ciphertext includes the GCM auth tag.
pub struct AesFieldCipher {
    key: [u8; KEY_LENGTH],
}

impl AesFieldCipher {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }
}

impl FieldCipher for AesFieldCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        match cipher.encrypt(nonce, plaintext.as_bytes()) {
            Ok(ciphertext) => {
                let mut bytes = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
                bytes.extend_from_slice(&nonce_bytes);
                bytes.extend_from_slice(&ciphertext);
                format!("{CIPHERTEXT_PREFIX}{}", BASE64.encode(bytes))
            }
            Err(_) => plaintext.to_string(),
        }
    }

    fn decrypt(&self, ciphertext: &str) -> String {
        let Some(encoded) = ciphertext.strip_prefix(CIPHERTEXT_PREFIX) else {
            return ciphertext.to_string();
        };
        let Ok(bytes) = BASE64.decode(encoded) else {
            return ciphertext.to_string();
        };
        // GCM auth tag is 16 bytes minimum
        if bytes.len() < NONCE_LENGTH + 16 {
            return ciphertext.to_string();
        }

        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&bytes[..NONCE_LENGTH]);

        match cipher.decrypt(nonce, &bytes[NONCE_LENGTH..]) {
            Ok(plaintext) => String::from_utf8(plaintext)
                .unwrap_or_else(|_| ciphertext.to_string()),
            Err(_) => ciphertext.to_string(),
        }
    }
}
