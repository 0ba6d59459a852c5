//! Relay for TCP server that running on local environment

use std::{io, sync::Arc};

use byte_string::ByteStr;
use bytes::BytesMut;
use futures::{
    future::{self, Either},
    pin_mut,
};
use log::{debug, trace};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    config::{ServerAddr, ServerConfig},
    relay::{
        dns_resolver::resolve,
        socks5::{Address, Reply, SOCKS5_ADDR_TYPE_IPV4, SOCKS5_VERSION},
        utils::try_timeout,
    },
};

pub mod crypto_io;
pub mod local;

pub use self::crypto_io::CryptoStream;

/// Establishes the TCP connection to the configured remote relay.
///
/// The whole attempt, including name resolution, is bounded by the
/// configured timeout.
pub async fn connect_proxy_server(svr_cfg: &ServerConfig) -> io::Result<TcpStream> {
    let timeout = Some(svr_cfg.timeout());

    let svr_addr = svr_cfg.addr();
    trace!("connecting remote {} with timeout {:?}", svr_addr, timeout);

    let stream = match *svr_addr {
        ServerAddr::SocketAddr(ref addr) => try_timeout(TcpStream::connect(*addr), timeout).await?,
        ServerAddr::DomainName(ref domain, port) => {
            let addrs = try_timeout(resolve(&domain[..], port), timeout).await?;

            let mut last_err: Option<io::Error> = None;
            let mut connected = None;
            for addr in &addrs {
                match try_timeout(TcpStream::connect(*addr), timeout).await {
                    Ok(s) => {
                        connected = Some(s);
                        break;
                    }
                    Err(err) => last_err = Some(err),
                }
            }

            match connected {
                Some(s) => s,
                None => {
                    return Err(last_err.unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, format!("unable to connect {}", svr_addr))
                    }));
                }
            }
        }
    };

    debug!("connected remote {}", svr_addr);
    Ok(stream)
}

/// Wraps the freshly connected remote stream with the cipher pair and sends
/// the encrypted destination header.
///
/// The header is only ever emitted after the TCP handshake with the relay
/// has completed.
pub async fn proxy_server_handshake(
    remote_stream: TcpStream,
    svr_cfg: Arc<ServerConfig>,
    relay_addr: &Address,
) -> io::Result<CryptoStream<TcpStream>> {
    let mut stream = CryptoStream::new(remote_stream, &*svr_cfg);

    let mut addr_buf = BytesMut::with_capacity(relay_addr.serialized_len());
    relay_addr.write_to_buf(&mut addr_buf);
    trace!("sending destination header {:?}", ByteStr::new(&addr_buf));

    try_timeout(stream.write_all(&addr_buf), Some(svr_cfg.timeout())).await?;

    Ok(stream)
}

/// Replies a truncated SOCKS5 error header (VER REP RSV ATYP) and gives up
/// on the client.
///
/// The 4-byte form is what peers of this protocol family expect.
pub async fn send_error_reply<W>(stream: &mut W, reply: Reply) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = [SOCKS5_VERSION, reply.as_u8(), 0x00, SOCKS5_ADDR_TYPE_IPV4];
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Runs both relay directions until either side finishes.
///
/// Completion of one direction means its source reached EOF (pending bytes
/// were flushed first) or failed; dropping both halves afterwards closes
/// the pair together.
pub async fn tunnel<CF, SF>(addr: Address, c2s: CF, s2c: SF) -> io::Result<()>
where
    CF: std::future::Future<Output = io::Result<u64>>,
    SF: std::future::Future<Output = io::Result<u64>>,
{
    pin_mut!(c2s);
    pin_mut!(s2c);

    match future::select(c2s, s2c).await {
        Either::Left((res, _)) => match res {
            Ok(amt) => trace!("relay {} client -> remote closed, transferred {} bytes", addr, amt),
            Err(err) => debug!("relay {} client -> remote closed with error {}", addr, err),
        },
        Either::Right((res, _)) => match res {
            Ok(amt) => trace!("relay {} remote -> client closed, transferred {} bytes", addr, amt),
            Err(err) => debug!("relay {} remote -> client closed with error {}", addr, err),
        },
    }

    Ok(())
}
