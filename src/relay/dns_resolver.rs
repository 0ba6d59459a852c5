//! Asynchronous DNS resolver

use std::{io, net::SocketAddr};

use log::trace;
use tokio::task;

/// Resolves a hostname to a list of socket addresses.
///
/// Name resolution is a blocking call, so it is pushed off the reactor
/// threads.
pub async fn resolve(addr: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    use std::net::ToSocketAddrs;

    let owned_addr = addr.to_owned();
    let result = task::spawn_blocking(move || -> io::Result<Vec<SocketAddr>> {
        let v = (owned_addr.as_str(), port).to_socket_addrs()?.collect::<Vec<SocketAddr>>();
        Ok(v)
    })
    .await;

    match result {
        Ok(Ok(addrs)) => {
            if addrs.is_empty() {
                let err = io::Error::new(
                    io::ErrorKind::Other,
                    format!("resolved {}:{} to empty address list", addr, port),
                );
                return Err(err);
            }

            trace!("resolved {}:{} => {:?}", addr, port, addrs);
            Ok(addrs)
        }
        Ok(Err(err)) => Err(err),
        Err(join_err) => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("dns resolver task failed: {}", join_err),
        )),
    }
}
