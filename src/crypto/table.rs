//! The classic `table` cipher, a password-derived byte substitution
//!
//! Kept as the default method for compatibility with peers that predate the
//! real stream ciphers. It is an obfuscation, not encryption.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, BytesMut};
use digest::Digest;
use md5::Md5;

use crate::crypto::{cipher::CipherResult, stream::StreamCipher, CryptoMode};

const TABLE_SIZE: usize = 256;

pub struct TableCipher {
    table: [u8; TABLE_SIZE],
}

impl TableCipher {
    pub fn new(key: &[u8], mode: CryptoMode) -> TableCipher {
        let mut md5_digest = Md5::new();
        md5_digest.input(key);
        let key_digest = md5_digest.result();

        let a = LittleEndian::read_u64(&key_digest[..8]);
        let mut table = [0u64; TABLE_SIZE];
        for (i, element) in table.iter_mut().enumerate() {
            *element = i as u64;
        }

        for i in 1..1024u64 {
            table.sort_by_key(|x| a % (x + i));
        }

        let mut tbl = [0u8; TABLE_SIZE];
        match mode {
            CryptoMode::Encrypt => {
                for (i, &item) in table.iter().enumerate() {
                    tbl[i] = item as u8;
                }
            }
            CryptoMode::Decrypt => {
                for (i, &item) in table.iter().enumerate() {
                    tbl[item as usize] = i as u8;
                }
            }
        }

        TableCipher { table: tbl }
    }
}

impl StreamCipher for TableCipher {
    fn update(&mut self, data: &[u8], out: &mut BytesMut) -> CipherResult<()> {
        out.reserve(data.len());
        for &b in data {
            out.put_u8(self.table[b as usize]);
        }
        Ok(())
    }

    fn finalize(&mut self, _out: &mut BytesMut) -> CipherResult<()> {
        Ok(())
    }

    fn buffer_size(&self, data: &[u8]) -> usize {
        data.len()
    }
}
