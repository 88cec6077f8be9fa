use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::constants::{KDF_CONTEXT_MESSAGE_KEY, NONCE_SIZE, TOKEN_SEPARATOR};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; 32];

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// BLAKE3 KDF with domain separation
pub fn derive_message_key(secret: &str) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_MESSAGE_KEY);
    hasher.update(secret.as_bytes());
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}

/// Symmetric cipher for message text at rest.
///
/// Tokens have the form `hex(nonce):hex(ciphertext)`.  Every call to
/// [`MessageCipher::encrypt`] draws a fresh random nonce, so two
/// encryptions of the same plaintext produce different tokens.
#[derive(Clone)]
pub struct MessageCipher {
    key: SymmetricKey,
}

impl MessageCipher {
    /// Build a cipher whose key is derived from the configured secret.
    pub fn new(secret: &str) -> Self {
        Self {
            key: derive_message_key(secret),
        }
    }

    /// Build a cipher from a raw 32-byte key (tests, key rotation tooling).
    pub fn from_key(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Encrypt plaintext into a `nonce:ciphertext` token.
    ///
    /// The empty string short-circuits to the empty string so that absent
    /// text never enters the cipher.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = XChaCha20Poly1305::new(&self.key.into());
        let nonce_bytes = generate_nonce();
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(format!(
            "{}{}{}",
            hex::encode(nonce_bytes),
            TOKEN_SEPARATOR,
            hex::encode(ciphertext)
        ))
    }

    /// Decrypt a `nonce:ciphertext` token back into plaintext.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let (nonce_hex, ciphertext_hex) = token
            .split_once(TOKEN_SEPARATOR)
            .ok_or(CryptoError::MalformedToken)?;

        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::MalformedToken)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CryptoError::MalformedToken);
        }
        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CryptoError::MalformedToken)?;

        let cipher = XChaCha20Poly1305::new(&self.key.into());
        let nonce = XNonce::from_slice(&nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Decrypt a stored value, falling back to the value itself when it is
    /// not a valid token.  Records written before encryption was introduced
    /// are plain text; a read must recover them rather than fail.
    pub fn decrypt_or_plaintext(&self, stored: &str) -> String {
        match self.decrypt(stored) {
            Ok(plaintext) => plaintext,
            Err(_) => stored.to_string(),
        }
    }
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> MessageCipher {
        MessageCipher::new("test-secret")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let c = cipher();
        let plaintext = "Bonjour, ça va?";

        let token = c.encrypt(plaintext).unwrap();
        let decrypted = c.decrypt(&token).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_is_non_deterministic() {
        let c = cipher();
        let a = c.encrypt("same message").unwrap();
        let b = c.encrypt("same message").unwrap();

        assert_ne!(a, b);
        assert_eq!(c.decrypt(&a).unwrap(), c.decrypt(&b).unwrap());
    }

    #[test]
    fn test_token_shape() {
        let c = cipher();
        let token = c.encrypt("hello").unwrap();

        let (nonce_hex, ciphertext_hex) = token.split_once(':').unwrap();
        assert_eq!(nonce_hex.len(), NONCE_SIZE * 2);
        // ciphertext = plaintext (5) + poly1305 tag (16)
        assert_eq!(ciphertext_hex.len(), (5 + 16) * 2);
    }

    #[test]
    fn test_empty_string_short_circuits() {
        let c = cipher();
        assert_eq!(c.encrypt("").unwrap(), "");
        assert_eq!(c.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = MessageCipher::new("secret-a").encrypt("hidden").unwrap();
        assert!(matches!(
            MessageCipher::new("secret-b").decrypt(&token),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        assert!(matches!(
            cipher().decrypt("deadbeef"),
            Err(CryptoError::MalformedToken)
        ));
    }

    #[test]
    fn test_non_hex_halves_are_malformed() {
        assert!(matches!(
            cipher().decrypt("not-hex:zzzz"),
            Err(CryptoError::MalformedToken)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let c = cipher();
        let token = c.encrypt("important").unwrap();
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert!(c.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_plaintext_fallback() {
        let c = cipher();
        // A legacy record stored before encryption was introduced.
        assert_eq!(c.decrypt_or_plaintext("hello there"), "hello there");
        // A real token still decrypts.
        let token = c.encrypt("chiffré").unwrap();
        assert_eq!(c.decrypt_or_plaintext(&token), "chiffré");
    }

    #[test]
    fn test_key_derivation_deterministic() {
        assert_eq!(derive_message_key("s"), derive_message_key("s"));
        assert_ne!(derive_message_key("s"), derive_message_key("t"));
    }
}
