// ABOUTME: Security primitives for prefstore
// ABOUTME: Field-level AEAD encryption applied at the storage boundary

pub mod encryption;

pub use encryption::{AeadEncryptor, EncryptionError, Encryptor, MIN_SECRET_LEN};
