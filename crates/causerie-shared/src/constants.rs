/// Application name
pub const APP_NAME: &str = "Causerie";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Separator between the hex-encoded nonce and ciphertext halves of a token
pub const TOKEN_SEPARATOR: char = ':';

/// Maximum length (in chars) of the plaintext preview carried by a
/// private new-message notification
pub const NOTIFICATION_PREVIEW_CHARS: usize = 50;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Avatar used when a participant has no profile picture
pub const DEFAULT_AVATAR_URL: &str = "https://cdn-icons-png.flaticon.com/512/149/149071.png";

/// Key derivation context (BLAKE3)
pub const KDF_CONTEXT_MESSAGE_KEY: &str = "causerie-message-key-v1";
