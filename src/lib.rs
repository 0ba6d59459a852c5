//! veilsocks is a lightweight encrypted SOCKS5 tunnel proxy.
//!
//! This crate implements the local endpoint: it accepts SOCKS5 clients on a
//! local port, performs the SOCKS5 negotiation, and relays the destination
//! plus all subsequent traffic to one of the configured remote relays,
//! encrypted on the wire with a per-connection stream cipher.

pub use self::{
    config::{Config, ServerAddr, ServerConfig},
    relay::local::run as run_local,
};

pub mod config;
pub mod context;
pub mod crypto;
pub mod relay;

/// veilsocks version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
