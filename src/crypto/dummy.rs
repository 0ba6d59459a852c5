//! Cipher that does nothing, the `none` method

use bytes::BytesMut;

use crate::crypto::{cipher::CipherResult, stream::StreamCipher};

pub struct DummyCipher;

impl StreamCipher for DummyCipher {
    fn update(&mut self, data: &[u8], out: &mut BytesMut) -> CipherResult<()> {
        out.extend_from_slice(data);
        Ok(())
    }

    fn finalize(&mut self, _out: &mut BytesMut) -> CipherResult<()> {
        Ok(())
    }

    fn buffer_size(&self, data: &[u8]) -> usize {
        data.len()
    }
}
