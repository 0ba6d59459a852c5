//! Ciphers backed by OpenSSL's libcrypto

use bytes::{BufMut, BytesMut};
use openssl::symm;

use crate::crypto::{
    cipher::{CipherResult, CipherType},
    stream::StreamCipher,
    CryptoMode,
};

pub struct OpenSSLCipher {
    cipher: symm::Crypter,
    block_size: usize,
}

impl OpenSSLCipher {
    /// Creates a crypter for one direction.
    ///
    /// Key length mismatches are programming errors, the key is always
    /// derived to the method's size by `CipherType::bytes_to_key`.
    pub fn new(t: CipherType, key: &[u8], mode: CryptoMode) -> OpenSSLCipher {
        let cipher = match t {
            #[cfg(feature = "rc4")]
            CipherType::Rc4 => symm::Cipher::rc4(),
            _ => panic!("cipher {} is not supported by OpenSSL", t),
        };

        let mode = match mode {
            CryptoMode::Encrypt => symm::Mode::Encrypt,
            CryptoMode::Decrypt => symm::Mode::Decrypt,
        };

        let crypter = symm::Crypter::new(cipher, mode, key, None).expect("failed to initialize OpenSSL crypter");

        OpenSSLCipher {
            cipher: crypter,
            block_size: cipher.block_size(),
        }
    }
}

impl StreamCipher for OpenSSLCipher {
    fn update(&mut self, data: &[u8], out: &mut BytesMut) -> CipherResult<()> {
        let mut buf = vec![0u8; self.buffer_size(data)];
        let n = self.cipher.update(data, &mut buf)?;
        out.put_slice(&buf[..n]);
        Ok(())
    }

    fn finalize(&mut self, out: &mut BytesMut) -> CipherResult<()> {
        let mut buf = vec![0u8; self.block_size];
        let n = self.cipher.finalize(&mut buf)?;
        out.put_slice(&buf[..n]);
        Ok(())
    }

    fn buffer_size(&self, data: &[u8]) -> usize {
        data.len() + self.block_size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rc4_round_trip_with_independent_states() {
        let key = CipherType::Rc4.bytes_to_key(b"password");

        let mut enc = OpenSSLCipher::new(CipherType::Rc4, &key, CryptoMode::Encrypt);
        let mut dec = OpenSSLCipher::new(CipherType::Rc4, &key, CryptoMode::Decrypt);

        let message = b"hello rc4 stream";

        let mut encrypted_msg = BytesMut::new();
        enc.update(message, &mut encrypted_msg).unwrap();
        assert_ne!(&message[..], &encrypted_msg[..]);

        let mut decrypted_msg = BytesMut::new();
        dec.update(&encrypted_msg, &mut decrypted_msg).unwrap();
        assert_eq!(&message[..], &decrypted_msg[..]);
    }

    #[test]
    fn chunked_update_matches_whole_buffer() {
        let key = CipherType::Rc4.bytes_to_key(b"password");
        let message = b"residual bytes after a short write go out verbatim";

        let mut whole = OpenSSLCipher::new(CipherType::Rc4, &key, CryptoMode::Encrypt);
        let mut expected = BytesMut::new();
        whole.update(message, &mut expected).unwrap();

        let mut chunked = OpenSSLCipher::new(CipherType::Rc4, &key, CryptoMode::Encrypt);
        let mut out = BytesMut::new();
        let (head, tail) = message.split_at(7);
        chunked.update(head, &mut out).unwrap();
        chunked.update(tail, &mut out).unwrap();

        assert_eq!(out, expected);
    }
}
