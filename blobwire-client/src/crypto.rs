//! Crypto adapter: session-key sealing of file content.
//!
//! The encryption primitive is consumed here, not designed: content is
//! sealed with XChaCha20-Poly1305 under keys expanded from the 128-bit
//! per-file session key via HKDF-SHA256. Two modes exist:
//!
//! - derived-nonce (in-memory buffers): the nonce is expanded from the
//!   session key. A session key seals exactly one payload, so the
//!   derived nonce is never reused, and the ciphertext stays a pure
//!   function of (key, plaintext).
//! - random-nonce (file-backed payloads): a fresh nonce is generated and
//!   prepended to the ciphertext. This is the mode native bridges apply
//!   on disk.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use blobwire_types::TransferError;

/// Size of a per-file session key in bytes (128 bits).
pub const SESSION_KEY_SIZE: usize = 16;

/// Size of an XChaCha20-Poly1305 nonce in bytes (192 bits).
pub const NONCE_SIZE: usize = 24;

/// Size of the expanded cipher key in bytes (256 bits).
const CIPHER_KEY_SIZE: usize = 32;

/// Per-file symmetric session key.
///
/// Resolved by the (external) key management layer; each key seals the
/// content of exactly one file.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Create a random session key.
    pub fn random() -> Self {
        let mut bytes = [0u8; SESSION_KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Create a session key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == SESSION_KEY_SIZE {
            let mut arr = [0u8; SESSION_KEY_SIZE];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

// Don't leak key material in debug output
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([redacted])")
    }
}

fn expand(key: &SessionKey, info: &[u8], out: &mut [u8]) {
    let hkdf = Hkdf::<Sha256>::new(Some(b"blobwire-session-v1"), key.as_bytes());
    hkdf.expand(info, out)
        .expect("HKDF expand should not fail with valid lengths");
}

fn cipher_for(key: &SessionKey) -> Result<XChaCha20Poly1305, TransferError> {
    let mut cipher_key = [0u8; CIPHER_KEY_SIZE];
    expand(key, b"content-encryption", &mut cipher_key);
    let cipher = XChaCha20Poly1305::new_from_slice(&cipher_key)
        .map_err(|e| TransferError::Crypto(e.to_string()))?;
    cipher_key.zeroize();
    Ok(cipher)
}

fn derived_nonce(key: &SessionKey) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    expand(key, b"buffer-nonce", &mut nonce);
    nonce
}

/// Encrypt an in-memory buffer (derived-nonce mode).
pub fn encrypt_bytes(key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>, TransferError> {
    let nonce = derived_nonce(key);
    cipher_for(key)?
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| TransferError::Crypto(e.to_string()))
}

/// Decrypt a buffer sealed by [`encrypt_bytes`].
pub fn decrypt_bytes(key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>, TransferError> {
    let nonce = derived_nonce(key);
    cipher_for(key)?
        .decrypt(XNonce::from_slice(&nonce), ciphertext)
        .map_err(|_| TransferError::Crypto("decryption failed".into()))
}

/// Encrypt with a fresh random nonce prepended to the ciphertext
/// (file-backed mode).
pub fn encrypt_with_random_nonce(
    key: &SessionKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, TransferError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce).map_err(|e| TransferError::Crypto(e.to_string()))?;
    let ciphertext = cipher_for(key)?
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| TransferError::Crypto(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a payload sealed by [`encrypt_with_random_nonce`].
pub fn decrypt_with_leading_nonce(
    key: &SessionKey,
    sealed: &[u8],
) -> Result<Vec<u8>, TransferError> {
    if sealed.len() < NONCE_SIZE {
        return Err(TransferError::Crypto("truncated sealed payload".into()));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    cipher_for(key)?
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| TransferError::Crypto("decryption failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_roundtrip() {
        let key = SessionKey::random();
        let plaintext = b"attachment content";

        let ciphertext = encrypt_bytes(&key, plaintext).unwrap();
        let decrypted = decrypt_bytes(&key, &ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn buffer_mode_is_deterministic() {
        let key = SessionKey::random();
        let a = encrypt_bytes(&key, b"same payload").unwrap();
        let b = encrypt_bytes(&key, b"same payload").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn random_nonce_mode_differs_per_call() {
        let key = SessionKey::random();
        let a = encrypt_with_random_nonce(&key, b"same payload").unwrap();
        let b = encrypt_with_random_nonce(&key, b"same payload").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn random_nonce_roundtrip() {
        let key = SessionKey::random();
        let plaintext = b"file on disk";

        let sealed = encrypt_with_random_nonce(&key, plaintext).unwrap();
        let decrypted = decrypt_with_leading_nonce(&key, &sealed).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails() {
        let key = SessionKey::random();
        let other = SessionKey::random();

        let ciphertext = encrypt_bytes(&key, b"secret").unwrap();
        assert!(matches!(
            decrypt_bytes(&other, &ciphertext),
            Err(TransferError::Crypto(_))
        ));
    }

    #[test]
    fn truncated_sealed_payload_fails() {
        let key = SessionKey::random();
        let result = decrypt_with_leading_nonce(&key, &[0u8; 5]);
        assert!(matches!(result, Err(TransferError::Crypto(_))));
    }

    #[test]
    fn empty_payload_roundtrip() {
        let key = SessionKey::random();
        let ciphertext = encrypt_bytes(&key, b"").unwrap();
        // the AEAD tag makes even an empty payload's ciphertext non-empty
        assert_eq!(ciphertext.len(), 16);
        assert!(decrypt_bytes(&key, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn session_key_debug_redacts_material() {
        let key = SessionKey::from_bytes(&[0xAB; 16]).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("171"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn session_key_from_invalid_length_fails() {
        assert!(SessionKey::from_bytes(&[0u8; 15]).is_none());
        assert!(SessionKey::from_bytes(&[0u8; 32]).is_none());
    }
}
