//! End to end tests for the local SOCKS5 endpoint, run against a
//! cooperating remote that shares the cipher implementation

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time,
};

use veilsocks::{
    config::{Config, ServerAddr, ServerConfig},
    crypto::cipher::CipherType,
    relay::{socks5::Address, tcprelay::CryptoStream},
    run_local,
};

const PASSWORD: &str = "test-password";

fn local_config(local_port: u16, svr_cfg: &ServerConfig) -> Config {
    let mut config = Config::new();
    config.local = Some(SocketAddr::from(([127, 0, 0, 1], local_port)));
    config.server = vec![svr_cfg.clone()];
    config
}

fn server_config(remote_port: u16, method: CipherType) -> ServerConfig {
    ServerConfig::new(
        ServerAddr::SocketAddr(SocketAddr::from(([127, 0, 0, 1], remote_port))),
        PASSWORD.to_owned(),
        method,
        None,
    )
}

/// Accepts a single tunnel, decrypts the destination header and echoes every
/// payload byte back through the tunnel. Returns the destination the local
/// endpoint announced.
async fn spawn_echo_remote(mut listener: TcpListener, svr_cfg: Arc<ServerConfig>) -> Address {
    let (stream, _) = listener.accept().await.expect("remote accept");
    let mut stream = CryptoStream::new(stream, &svr_cfg);

    let addr = Address::read_from(&mut stream).await.expect("destination header");

    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await.expect("remote read");
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await.expect("remote write");
    }

    addr
}

async fn socks5_handshake(stream: &mut TcpStream) {
    stream.write_all(&[0x05, 0x01, 0x00]).await.unwrap();

    let mut method_sel = [0u8; 2];
    stream.read_exact(&mut method_sel).await.unwrap();
    assert_eq!(method_sel, [0x05, 0x00]);
}

#[tokio::test]
async fn connect_domain_and_echo() {
    let _ = env_logger::try_init();

    const LOCAL_PORT: u16 = 8110;
    const REMOTE_PORT: u16 = 8111;

    let svr_cfg = server_config(REMOTE_PORT, CipherType::Table);

    let listener = TcpListener::bind(("127.0.0.1", REMOTE_PORT)).await.unwrap();
    let remote_cfg = Arc::new(svr_cfg.clone());
    let remote = tokio::spawn(spawn_echo_remote(listener, remote_cfg));

    tokio::spawn(run_local(local_config(LOCAL_PORT, &svr_cfg)));
    time::delay_for(Duration::from_millis(150)).await;

    let mut c = TcpStream::connect(("127.0.0.1", LOCAL_PORT)).await.unwrap();
    socks5_handshake(&mut c).await;

    // CONNECT example.com:80
    let mut req = vec![0x05, 0x01, 0x00, 0x03, 0x0b];
    req.extend_from_slice(b"example.com");
    req.extend_from_slice(&[0x00, 0x50]);
    c.write_all(&req).await.unwrap();

    let mut reply = [0u8; 10];
    c.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let payload = b"GET / HTTP/1.0\r\n\r\n";
    c.write_all(payload).await.unwrap();

    let mut echoed = vec![0u8; payload.len()];
    c.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed[..], &payload[..]);

    // half close our side so the remote loop ends and reports the address
    drop(c);
    let announced = remote.await.unwrap();
    assert_eq!(announced, Address::DomainNameAddress("example.com".to_owned(), 80));
}

#[cfg(feature = "rc4")]
#[tokio::test]
async fn connect_ipv4_with_rc4_and_remote_eof_flush() {
    let _ = env_logger::try_init();

    const LOCAL_PORT: u16 = 8120;
    const REMOTE_PORT: u16 = 8121;

    let svr_cfg = server_config(REMOTE_PORT, CipherType::Rc4);

    let mut listener = TcpListener::bind(("127.0.0.1", REMOTE_PORT)).await.unwrap();
    let remote_cfg = Arc::new(svr_cfg.clone());
    let remote = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("remote accept");
        let mut stream = CryptoStream::new(stream, &remote_cfg);

        let addr = Address::read_from(&mut stream).await.expect("destination header");
        assert_eq!(addr, Address::SocketAddress("127.0.0.1:80".parse().unwrap()));

        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).await.expect("remote read");
        stream.write_all(&buf[..n]).await.expect("remote echo");
        stream.write_all(b"remote goodbye").await.expect("remote push");
        // dropping the stream closes the remote side of the tunnel
    });

    tokio::spawn(run_local(local_config(LOCAL_PORT, &svr_cfg)));
    time::delay_for(Duration::from_millis(150)).await;

    let mut c = TcpStream::connect(("127.0.0.1", LOCAL_PORT)).await.unwrap();
    socks5_handshake(&mut c).await;

    c.write_all(&[0x05, 0x01, 0x00, 0x01, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x50])
        .await
        .unwrap();

    let mut reply = [0u8; 10];
    c.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    c.write_all(b"ping").await.unwrap();

    // pending bytes are flushed to the client before its socket is closed
    let mut received = Vec::new();
    c.read_to_end(&mut received).await.unwrap();
    assert_eq!(&received[..], &b"pingremote goodbye"[..]);

    remote.await.unwrap();
}

#[tokio::test]
async fn unsupported_command_gets_truncated_reply() {
    let _ = env_logger::try_init();

    const LOCAL_PORT: u16 = 8130;
    const REMOTE_PORT: u16 = 8131;

    // nothing listens on the remote port; the request is rejected before any
    // remote connection is attempted
    let svr_cfg = server_config(REMOTE_PORT, CipherType::Table);
    tokio::spawn(run_local(local_config(LOCAL_PORT, &svr_cfg)));
    time::delay_for(Duration::from_millis(150)).await;

    let mut c = TcpStream::connect(("127.0.0.1", LOCAL_PORT)).await.unwrap();
    socks5_handshake(&mut c).await;

    // BIND 127.0.0.1:80
    c.write_all(&[0x05, 0x02, 0x00, 0x01, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x50])
        .await
        .unwrap();

    let mut reply = [0u8; 4];
    c.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0x05, 0x07, 0x00, 0x01]);

    // nothing follows the truncated reply
    let mut rest = Vec::new();
    c.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn unsupported_address_type_closes_without_reply() {
    let _ = env_logger::try_init();

    const LOCAL_PORT: u16 = 8140;
    const REMOTE_PORT: u16 = 8141;

    let svr_cfg = server_config(REMOTE_PORT, CipherType::Table);
    tokio::spawn(run_local(local_config(LOCAL_PORT, &svr_cfg)));
    time::delay_for(Duration::from_millis(150)).await;

    let mut c = TcpStream::connect(("127.0.0.1", LOCAL_PORT)).await.unwrap();
    socks5_handshake(&mut c).await;

    c.write_all(&[0x05, 0x01, 0x00, 0x09, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x50])
        .await
        .unwrap();

    let mut rest = Vec::new();
    c.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn remote_connect_failure_reports_error_reply() {
    let _ = env_logger::try_init();

    const LOCAL_PORT: u16 = 8150;
    const REMOTE_PORT: u16 = 8151;

    // closed port, the remote connect is refused immediately
    let svr_cfg = server_config(REMOTE_PORT, CipherType::Table);
    tokio::spawn(run_local(local_config(LOCAL_PORT, &svr_cfg)));
    time::delay_for(Duration::from_millis(150)).await;

    let mut c = TcpStream::connect(("127.0.0.1", LOCAL_PORT)).await.unwrap();
    socks5_handshake(&mut c).await;

    c.write_all(&[0x05, 0x01, 0x00, 0x01, 0x7f, 0x00, 0x00, 0x01, 0x00, 0x50])
        .await
        .unwrap();

    let mut reply = [0u8; 10];
    c.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 0x05);
    // host unreachable, the mapping for a refused remote
    assert_eq!(reply[1], 0x04);

    let mut rest = Vec::new();
    c.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}
