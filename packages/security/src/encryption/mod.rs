// ABOUTME: Field-level encryption using ChaCha20-Poly1305 AEAD
// ABOUTME: Keys derive from arbitrary-length secrets; tokens are base64(nonce || ciphertext || tag)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::{
    aead::{self, Nonce, UnboundKey},
    rand::{SecureRandom, SystemRandom},
};
use sha2::{Digest, Sha256};

/// Nonce size for ChaCha20-Poly1305
const NONCE_SIZE: usize = 12;

/// Minimum length of operator-supplied secret material.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("secret material must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort,

    #[error("failed to generate random data: {0}")]
    RandomGeneration(String),

    #[error("failed to encrypt data: {0}")]
    Encryption(String),

    #[error("encrypted token is not valid base64")]
    InvalidEncoding,

    #[error("encrypted token is shorter than the minimum envelope")]
    TruncatedEnvelope,

    #[error("authentication failed: data was tampered with or the key is wrong")]
    Authentication,

    #[error("decrypted data is not valid UTF-8")]
    InvalidPlaintext,
}

/// Transform applied to encrypted fields at the storage boundary.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;
    fn decrypt(&self, token: &str) -> Result<String, EncryptionError>;
}

/// ChaCha20-Poly1305 field encryption.
///
/// The cipher key is SHA-256 of the operator-supplied secret, so any secret
/// at or above [`MIN_SECRET_LEN`] works without pre-sizing it to the key
/// length.
pub struct AeadEncryptor {
    rng: SystemRandom,
    key: [u8; 32],
}

impl AeadEncryptor {
    pub fn new(secret: &[u8]) -> Result<Self, EncryptionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(EncryptionError::SecretTooShort);
        }
        let digest = Sha256::digest(secret);
        let mut key = [0u8; 32];
        key.copy_from_slice(digest.as_slice());
        Ok(Self {
            rng: SystemRandom::new(),
            key,
        })
    }

    fn sealing_key(&self) -> Result<aead::LessSafeKey, EncryptionError> {
        let unbound = UnboundKey::new(&aead::CHACHA20_POLY1305, &self.key)
            .map_err(|_| EncryptionError::Encryption("invalid cipher key".to_string()))?;
        Ok(aead::LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for AeadEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadEncryptor")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Encryptor for AeadEncryptor {
    /// Returns base64(nonce || ciphertext || tag). A fresh random nonce per
    /// call makes identical plaintexts produce different tokens. Empty
    /// input bypasses the cipher so unset optional fields never pay for an
    /// AEAD call.
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            EncryptionError::RandomGeneration("failed to generate nonce".to_string())
        })?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.sealing_key()?
            .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
            .map_err(|_| EncryptionError::Encryption("seal operation failed".to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + in_out.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&in_out);

        Ok(BASE64.encode(&envelope))
    }

    /// Expects base64(nonce || ciphertext || tag). The three failure modes
    /// are reported distinctly: bad encoding, truncated envelope, failed
    /// authentication.
    fn decrypt(&self, token: &str) -> Result<String, EncryptionError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let envelope = BASE64
            .decode(token)
            .map_err(|_| EncryptionError::InvalidEncoding)?;

        if envelope.len() < NONCE_SIZE + aead::CHACHA20_POLY1305.tag_len() {
            return Err(EncryptionError::TruncatedEnvelope);
        }

        let (nonce_bytes, ciphertext_and_tag) = envelope.split_at(NONCE_SIZE);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| EncryptionError::TruncatedEnvelope)?;

        let mut in_out = ciphertext_and_tag.to_vec();
        let plaintext = self
            .sealing_key()?
            .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
            .map_err(|_| EncryptionError::Authentication)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| EncryptionError::InvalidPlaintext)
    }
}
