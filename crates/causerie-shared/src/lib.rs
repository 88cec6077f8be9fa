//! # causerie-shared
//!
//! Types shared by every Causerie crate: the message cipher, identity
//! snapshots, media descriptors, and the real-time event surface.

pub mod cipher;
pub mod constants;
pub mod events;
pub mod types;

mod error;

pub use cipher::MessageCipher;
pub use error::CryptoError;
