//! IO facilities for the encrypted tunnel

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::BytesMut;
use futures::ready;
use log::trace;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    config::ServerConfig,
    crypto::{self, CryptoMode, StreamCipher, StreamCipherVariant},
};

/// Ciphertext chunk size read from the wire in one go
const BUFFER_SIZE: usize = 4096;

/// Reads from the wire and decrypts
pub struct DecryptedReader {
    cipher: StreamCipherVariant,
    // plaintext already produced but not yet handed to the caller
    buffer: BytesMut,
}

impl DecryptedReader {
    fn new(cipher: StreamCipherVariant) -> DecryptedReader {
        DecryptedReader {
            cipher,
            buffer: BytesMut::new(),
        }
    }

    pub fn poll_read_decrypted<S>(
        &mut self,
        ctx: &mut Context<'_>,
        stream: &mut S,
        dst: &mut [u8],
    ) -> Poll<io::Result<usize>>
    where
        S: AsyncRead + Unpin,
    {
        while self.buffer.is_empty() {
            let mut incoming = [0u8; BUFFER_SIZE];
            let n = ready!(Pin::new(&mut *stream).poll_read(ctx, &mut incoming[..]))?;
            if n == 0 {
                return Poll::Ready(Ok(0));
            }

            trace!("received {} bytes of ciphertext", n);
            self.cipher.update(&incoming[..n], &mut self.buffer)?;
        }

        let len = usize::min(dst.len(), self.buffer.len());
        dst[..len].copy_from_slice(&self.buffer[..len]);
        let _ = self.buffer.split_to(len);

        Poll::Ready(Ok(len))
    }
}

enum EncryptWriteStep {
    Nothing,
    Writing(BytesMut, usize),
}

/// Encrypts and writes to the wire
pub struct EncryptedWriter {
    cipher: StreamCipherVariant,
    steps: EncryptWriteStep,
}

impl EncryptedWriter {
    fn new(cipher: StreamCipherVariant) -> EncryptedWriter {
        EncryptedWriter {
            cipher,
            steps: EncryptWriteStep::Nothing,
        }
    }

    pub fn poll_write_encrypted<S>(
        &mut self,
        ctx: &mut Context<'_>,
        stream: &mut S,
        data: &[u8],
    ) -> Poll<io::Result<usize>>
    where
        S: AsyncWrite + Unpin,
    {
        loop {
            match self.steps {
                EncryptWriteStep::Nothing => {
                    // Plaintext goes through the cipher exactly once; whatever
                    // survives a short write is already ciphertext and is
                    // transmitted verbatim on the next poll.
                    let mut buf = BytesMut::with_capacity(self.cipher.buffer_size(data));
                    self.cipher.update(data, &mut buf)?;
                    self.steps = EncryptWriteStep::Writing(buf, 0);
                }
                EncryptWriteStep::Writing(ref buf, ref mut pos) => {
                    while *pos < buf.len() {
                        let n = ready!(Pin::new(&mut *stream).poll_write(ctx, &buf[*pos..]))?;
                        if n == 0 {
                            return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                        }
                        *pos += n;
                    }

                    self.steps = EncryptWriteStep::Nothing;
                    return Poll::Ready(Ok(data.len()));
                }
            }
        }
    }
}

/// Stream wrapper that encrypts every write and decrypts every read.
///
/// Each direction owns an independent cipher state derived from the
/// configured method and key.
pub struct CryptoStream<S> {
    stream: S,
    dec: DecryptedReader,
    enc: EncryptedWriter,
}

impl<S> CryptoStream<S> {
    /// Wraps the stream, creating both direction states
    pub fn new(stream: S, svr_cfg: &ServerConfig) -> CryptoStream<S> {
        let method = svr_cfg.method();
        let enc = crypto::new_stream(method, svr_cfg.key(), CryptoMode::Encrypt);
        let dec = crypto::new_stream(method, svr_cfg.key(), CryptoMode::Decrypt);

        CryptoStream {
            stream,
            dec: DecryptedReader::new(dec),
            enc: EncryptedWriter::new(enc),
        }
    }

    /// Consumes the wrapper, returning the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> AsyncRead for CryptoStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(self: Pin<&mut Self>, ctx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.dec.poll_read_decrypted(ctx, &mut this.stream, buf)
    }
}

impl<S> AsyncWrite for CryptoStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(self: Pin<&mut Self>, ctx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.enc.poll_write_encrypted(ctx, &mut this.stream, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(ctx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(ctx)
    }
}
