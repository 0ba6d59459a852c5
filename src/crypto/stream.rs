//! Stream ciphers

use bytes::BytesMut;

use crate::crypto::{
    cipher::{CipherCategory, CipherResult, CipherType},
    dummy::DummyCipher,
    table::TableCipher,
    CryptoMode,
};

#[cfg(feature = "rc4")]
use crate::crypto::openssl::OpenSSLCipher;

/// Basic operation of Cipher, which is a Symmetric Cipher.
///
/// The `update` method could be called multiple times, and the `finalize` method will
/// encrypt the last block
pub trait StreamCipher {
    fn update(&mut self, data: &[u8], out: &mut BytesMut) -> CipherResult<()>;
    fn finalize(&mut self, out: &mut BytesMut) -> CipherResult<()>;
    /// Output buffer capacity `update` may need for `data`
    fn buffer_size(&self, data: &[u8]) -> usize;
}

macro_rules! define_stream_ciphers {
    ($($(#[$attr:meta])* $name:ident => $cipher:ty,)+) => {
        /// Variant cipher which contains all possible ciphers
        pub enum StreamCipherVariant {
            $(
                $(#[$attr])*
                $name($cipher),
            )+
        }

        impl StreamCipherVariant {
            /// Creates from an actual cipher
            pub fn new<C>(cipher: C) -> StreamCipherVariant
                where StreamCipherVariant: From<C>
            {
                From::from(cipher)
            }
        }

        impl StreamCipher for StreamCipherVariant {
            fn update(&mut self, data: &[u8], out: &mut BytesMut) -> CipherResult<()> {
                match *self {
                    $(
                        $(#[$attr])*
                        StreamCipherVariant::$name(ref mut cipher) => cipher.update(data, out),
                    )+
                }
            }

            fn finalize(&mut self, out: &mut BytesMut) -> CipherResult<()> {
                match *self {
                    $(
                        $(#[$attr])*
                        StreamCipherVariant::$name(ref mut cipher) => cipher.finalize(out),
                    )+
                }
            }

            fn buffer_size(&self, data: &[u8]) -> usize {
                match *self {
                    $(
                        $(#[$attr])*
                        StreamCipherVariant::$name(ref cipher) => cipher.buffer_size(data),
                    )+
                }
            }
        }

        $(
            $(#[$attr])*
            impl From<$cipher> for StreamCipherVariant {
                fn from(cipher: $cipher) -> StreamCipherVariant {
                    StreamCipherVariant::$name(cipher)
                }
            }
        )+
    }
}

define_stream_ciphers! {
    TableCipher => TableCipher,
    DummyCipher => DummyCipher,
    #[cfg(feature = "rc4")]
    OpenSSLCipher => OpenSSLCipher,
}

/// Generate a specific Cipher with key
pub fn new_stream(t: CipherType, key: &[u8], mode: CryptoMode) -> StreamCipherVariant {
    assert!(
        t.category() == CipherCategory::Stream,
        "only allow initializing with stream cipher"
    );

    match t {
        CipherType::Table => StreamCipherVariant::new(TableCipher::new(key, mode)),
        CipherType::Dummy => StreamCipherVariant::new(DummyCipher),

        #[cfg(feature = "rc4")]
        CipherType::Rc4 => StreamCipherVariant::new(OpenSSLCipher::new(t, key, mode)),
    }
}
