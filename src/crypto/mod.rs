//! Crypto protocols for the tunnel
//!
//! Every connection owns two independent stream cipher states, one per
//! direction, both derived from the configured method and password.

pub use self::{
    cipher::{CipherCategory, CipherResult, CipherType},
    stream::{new_stream, StreamCipher, StreamCipherVariant},
};

pub mod cipher;
pub mod dummy;
#[cfg(feature = "rc4")]
pub mod openssl;
pub mod stream;
pub mod table;

/// Crypto mode, encrypt or decrypt
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CryptoMode {
    Encrypt,
    Decrypt,
}
