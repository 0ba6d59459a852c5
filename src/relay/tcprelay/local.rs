//! TcpRelay server that running on local environment

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use log::{debug, error, info, trace, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::{
    config::ServerConfig,
    context::SharedContext,
    relay::{
        loadbalancing::server::{LoadBalancer, UniformRandom},
        socks5::{
            self, Address, Command, HandshakeRequest, HandshakeResponse, Reply, TcpRequestHeader, TcpResponseHeader,
        },
        tcprelay::{connect_proxy_server, proxy_server_handshake, send_error_reply, tunnel},
    },
};

fn unspecified_bind_addr() -> Address {
    Address::SocketAddress(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0))
}

/// Serves one accepted SOCKS5 client until either side of the tunnel closes
async fn handle_socks5_client(svr_cfg: Arc<ServerConfig>, mut stream: TcpStream, peer_addr: SocketAddr) -> io::Result<()> {
    // Method selection. Offered methods are not validated, no
    // authentication is unilaterally chosen.
    let handshake_req = HandshakeRequest::read_from(&mut stream).await?;
    trace!("socks5 {:?} from {}", handshake_req, peer_addr);

    let handshake_resp = HandshakeResponse::new(socks5::SOCKS5_AUTH_METHOD_NONE);
    handshake_resp.write_to(&mut stream).await?;

    // Request message
    let header = match TcpRequestHeader::read_from(&mut stream).await {
        Ok(h) => h,
        Err(err) => {
            warn!("socks5 request from {} rejected: {}", peer_addr, err);
            if err.reply == Reply::CommandNotSupported {
                send_error_reply(&mut stream, Reply::CommandNotSupported).await?;
            }
            // other violations, unknown address types included, are dropped
            // without a reply
            return Err(From::from(err));
        }
    };

    trace!("socks5 {:?} from {}", header, peer_addr);

    let addr = match header.command {
        Command::TcpConnect => header.address,
        Command::TcpBind | Command::UdpAssociate => {
            warn!("socks5 {:?} from {} is not supported", header.command, peer_addr);
            send_error_reply(&mut stream, Reply::CommandNotSupported).await?;
            return Ok(());
        }
    };

    info!("CONNECT {} -> {} via {}", peer_addr, addr, svr_cfg.addr());

    let remote_stream = match connect_proxy_server(&svr_cfg).await {
        Ok(s) => s,
        Err(err) => {
            error!("failed to connect remote {}: {}", svr_cfg.addr(), err);

            let reply = match err.kind() {
                io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionAborted => Reply::HostUnreachable,
                _ => Reply::NetworkUnreachable,
            };
            let header = TcpResponseHeader::new(reply, unspecified_bind_addr());
            let _ = header.write_to(&mut stream).await;

            return Err(err);
        }
    };

    // The destination header goes out first, encrypted, with no framing
    let svr_stream = proxy_server_handshake(remote_stream, svr_cfg, &addr).await?;

    // Tell the client the tunnel is up. BND fields carry no meaning here.
    let header = TcpResponseHeader::new(Reply::Succeeded, unspecified_bind_addr());
    header.write_to(&mut stream).await?;

    let (mut plain_reader, mut plain_writer) = stream.split();
    let (mut shadow_reader, mut shadow_writer) = tokio::io::split(svr_stream);

    let c2s = tokio::io::copy(&mut plain_reader, &mut shadow_writer);
    let s2c = tokio::io::copy(&mut shadow_reader, &mut plain_writer);

    tunnel(addr, c2s, s2c).await
}

/// Starts the local SOCKS5 endpoint and serves until the listener fails
pub async fn run(context: SharedContext) -> io::Result<()> {
    let local_addr = match context.config().local {
        Some(addr) => addr,
        None => {
            let err = io::Error::new(io::ErrorKind::Other, "local address must be configured");
            return Err(err);
        }
    };

    if context.config().server.is_empty() {
        let err = io::Error::new(io::ErrorKind::Other, "missing remote server configuration");
        return Err(err);
    }

    let mut listener = TcpListener::bind(local_addr).await?;
    let actual_local_addr = listener.local_addr()?;
    info!("veilsocks TCP listening on {}", actual_local_addr);

    let mut balancer = UniformRandom::new(context.config().server.clone());
    debug!("{} remote server(s) configured", balancer.total());

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(s) => s,
            Err(err) => {
                // fd exhaustion and friends must not take down tunnels that
                // are already established
                error!("accept failed: {}", err);
                continue;
            }
        };

        trace!("got connection from {}", peer_addr);

        let svr_cfg = balancer.pick_server();
        tokio::spawn(async move {
            if let Err(err) = handle_socks5_client(svr_cfg, stream, peer_addr).await {
                debug!("socks5 client {} exited with error: {}", peer_addr, err);
            }
        });
    }
}
