//! Ciphers

use std::{
    fmt::{self, Debug, Display},
    io,
    str::FromStr,
};

use bytes::{BufMut, Bytes, BytesMut};
use digest::Digest;
use md5::Md5;

/// Cipher result
pub type CipherResult<T> = Result<T, Error>;

/// Cipher error
pub enum Error {
    UnknownCipherType,
    #[cfg(feature = "rc4")]
    OpenSSLError(::openssl::error::ErrorStack),
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnknownCipherType => write!(f, "UnknownCipherType"),
            #[cfg(feature = "rc4")]
            Error::OpenSSLError(ref err) => write!(f, "{:?}", err),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnknownCipherType => write!(f, "unknown cipher type"),
            #[cfg(feature = "rc4")]
            Error::OpenSSLError(ref err) => write!(f, "{}", err),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("{}", err))
    }
}

#[cfg(feature = "rc4")]
impl From<::openssl::error::ErrorStack> for Error {
    fn from(err: ::openssl::error::ErrorStack) -> Error {
        Error::OpenSSLError(err)
    }
}

const CIPHER_DUMMY: &str = "none";
const CIPHER_TABLE: &str = "table";
#[cfg(feature = "rc4")]
const CIPHER_RC4: &str = "rc4";

/// Category of a cipher; the tunnel only carries synchronous stream
/// transforms
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherCategory {
    Stream,
}

/// Supported cipher methods
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherType {
    /// Identity transform
    Dummy,
    /// Password-derived byte substitution
    Table,
    /// RC4 keyed with the MD5-derived key
    #[cfg(feature = "rc4")]
    Rc4,
}

impl CipherType {
    /// Category of the cipher
    pub fn category(self) -> CipherCategory {
        CipherCategory::Stream
    }

    /// Symmetric crypto key size
    pub fn key_size(self) -> usize {
        match self {
            CipherType::Dummy => 0,
            CipherType::Table => 16,
            #[cfg(feature = "rc4")]
            CipherType::Rc4 => 16,
        }
    }

    /// Extends the password into a key of the required length,
    /// `EVP_BytesToKey(3)` with MD5 and no salt
    pub fn bytes_to_key(self, password: &[u8]) -> Bytes {
        let key_size = self.key_size();
        if key_size == 0 {
            return Bytes::new();
        }

        let mut key = BytesMut::with_capacity(((key_size + 15) / 16) * 16);
        let mut last_digest: Option<[u8; 16]> = None;

        while key.len() < key_size {
            let mut digest = Md5::new();
            if let Some(ref d) = last_digest {
                digest.input(d);
            }
            digest.input(password);

            let round = digest.result();
            key.put_slice(&round);

            let mut d = [0u8; 16];
            d.copy_from_slice(&round);
            last_digest = Some(d);
        }

        key.truncate(key_size);
        key.freeze()
    }
}

impl FromStr for CipherType {
    type Err = Error;

    fn from_str(s: &str) -> Result<CipherType, Error> {
        match s {
            CIPHER_DUMMY | "plain" | "dummy" => Ok(CipherType::Dummy),
            CIPHER_TABLE | "default" => Ok(CipherType::Table),
            #[cfg(feature = "rc4")]
            CIPHER_RC4 => Ok(CipherType::Rc4),
            _ => Err(Error::UnknownCipherType),
        }
    }
}

impl Display for CipherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CipherType::Dummy => write!(f, "{}", CIPHER_DUMMY),
            CipherType::Table => write!(f, "{}", CIPHER_TABLE),
            #[cfg(feature = "rc4")]
            CipherType::Rc4 => write!(f, "{}", CIPHER_RC4),
        }
    }
}
