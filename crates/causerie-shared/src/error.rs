use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Malformed ciphertext token")]
    MalformedToken,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,
}
