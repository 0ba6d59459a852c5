//! Configuration parsing
//!
//! The configuration file keeps the classic JSON shape, parsed with json5 so
//! comments and trailing commas are tolerated:
//!
//! ```ignore
//! {
//!     "server": ["relay1.example.org", "relay2.example.org"],
//!     "server_port": 8388,
//!     "local_address": "127.0.0.1",
//!     "local_port": 1080,
//!     "password": "barfoo!",
//!     "method": "rc4",
//!     "timeout": 10
//! }
//! ```
//!
//! `server` also accepts a single string. `local_address` defaults to
//! `0.0.0.0`, `method` to `table` and `timeout` to 10 seconds.

use std::{
    fmt::{self, Debug, Display, Formatter},
    fs::OpenOptions,
    io::Read,
    net::{IpAddr, SocketAddr},
    str::FromStr,
    time::Duration,
};

use bytes::Bytes;
use serde::Deserialize;

use crate::crypto::cipher::CipherType;

/// Connection timeout applied when the configuration does not set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Address of a remote relay, kept unresolved when given as a domain name
#[derive(Clone, Debug)]
pub enum ServerAddr {
    /// IP address
    SocketAddr(SocketAddr),
    /// Domain name address, resolved at connect time
    DomainName(String, u16),
}

/// Error while parsing a `ServerAddr` from string
#[derive(Debug)]
pub struct ServerAddrError;

impl FromStr for ServerAddr {
    type Err = ServerAddrError;

    fn from_str(s: &str) -> Result<ServerAddr, ServerAddrError> {
        match s.parse::<SocketAddr>() {
            Ok(addr) => Ok(ServerAddr::SocketAddr(addr)),
            Err(..) => {
                let mut sp = s.split(':');
                match (sp.next(), sp.next()) {
                    (Some(dn), Some(port)) => match port.parse::<u16>() {
                        Ok(port) => Ok(ServerAddr::DomainName(dn.to_owned(), port)),
                        Err(..) => Err(ServerAddrError),
                    },
                    _ => Err(ServerAddrError),
                }
            }
        }
    }
}

impl Display for ServerAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ServerAddr::SocketAddr(ref a) => write!(f, "{}", a),
            ServerAddr::DomainName(ref d, p) => write!(f, "{}:{}", d, p),
        }
    }
}

/// Configuration of one remote relay
#[derive(Clone, Debug)]
pub struct ServerConfig {
    addr: ServerAddr,
    password: String,
    method: CipherType,
    timeout: Duration,
    /// Cipher key derived from the password, computed once
    enc_key: Bytes,
}

impl ServerConfig {
    /// Creates a new configuration, deriving the cipher key from the password
    pub fn new(addr: ServerAddr, password: String, method: CipherType, timeout: Option<Duration>) -> ServerConfig {
        let enc_key = method.bytes_to_key(password.as_bytes());
        ServerConfig {
            addr,
            password,
            method,
            timeout: timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            enc_key,
        }
    }

    /// Relay address
    pub fn addr(&self) -> &ServerAddr {
        &self.addr
    }

    /// Encryption method
    pub fn method(&self) -> CipherType {
        self.method
    }

    /// Derived cipher key
    pub fn key(&self) -> &[u8] {
        &self.enc_key
    }

    /// Connection establishment timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Overrides the timeout, used when command line arguments win over the
    /// configuration file
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Whole-process configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Remote relays, one of which is picked for every client connection
    pub server: Vec<ServerConfig>,
    /// Local address the SOCKS5 listener binds to
    pub local: Option<SocketAddr>,
    /// Connection establishment timeout
    pub timeout: Option<Duration>,
}

/// Configuration error kinds
#[derive(Copy, Clone, Debug)]
pub enum ErrorKind {
    /// A required field is missing
    MissingField,
    /// A field has a malformed value
    Malformed,
    /// A field has a well-formed but unusable value
    Invalid,
    /// The file is not valid JSON
    JsonParsingError,
    /// Reading the file failed
    IoError,
}

/// Configuration error
pub struct Error {
    pub kind: ErrorKind,
    pub desc: &'static str,
    pub detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, desc: &'static str, detail: Option<String>) -> Error {
        Error { kind, desc, detail }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.detail {
            None => write!(f, "{:?} {}", self.kind, self.desc),
            Some(ref det) => write!(f, "{:?} {}, {}", self.kind, self.desc, det),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.detail {
            None => write!(f, "{}", self.desc),
            Some(ref det) => write!(f, "{}, {}", self.desc, det),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SSServerValue {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Deserialize, Debug, Default)]
struct SSConfig {
    server: Option<SSServerValue>,
    server_port: Option<u16>,
    local_address: Option<String>,
    local_port: Option<u16>,
    password: Option<String>,
    method: Option<String>,
    timeout: Option<u64>,
}

impl Config {
    /// Creates an empty configuration
    pub fn new() -> Config {
        Config {
            server: Vec::new(),
            local: None,
            timeout: None,
        }
    }

    fn load_from_ssconfig(config: SSConfig) -> Result<Config, Error> {
        let mut nconfig = Config::new();

        if let Some(port) = config.local_port {
            let addr = config.local_address.unwrap_or_else(|| "0.0.0.0".to_owned());
            match addr.parse::<IpAddr>() {
                Ok(ip) => nconfig.local = Some(SocketAddr::new(ip, port)),
                Err(..) => {
                    return Err(Error::new(
                        ErrorKind::Malformed,
                        "`local_address` must be an IP address",
                        None,
                    ));
                }
            }
        }

        nconfig.timeout = config.timeout.map(Duration::from_secs);

        if let Some(server) = config.server {
            let port = match config.server_port {
                Some(p) => p,
                None => {
                    return Err(Error::new(
                        ErrorKind::MissingField,
                        "`server_port` must be provided together with `server`",
                        None,
                    ));
                }
            };

            let password = match config.password {
                Some(p) => p,
                None => {
                    return Err(Error::new(
                        ErrorKind::MissingField,
                        "`password` must be provided together with `server`",
                        None,
                    ));
                }
            };

            let method = match config.method {
                Some(ref m) => match m.parse::<CipherType>() {
                    Ok(m) => m,
                    Err(..) => {
                        return Err(Error::new(
                            ErrorKind::Invalid,
                            "unsupported method",
                            Some(format!("`{}` is not a supported method", m)),
                        ));
                    }
                },
                None => CipherType::Table,
            };

            let hosts = match server {
                SSServerValue::Single(s) => vec![s],
                SSServerValue::Multiple(v) => v,
            };

            if hosts.is_empty() {
                return Err(Error::new(ErrorKind::Invalid, "`server` must not be empty", None));
            }

            for host in hosts {
                let addr = match host.parse::<IpAddr>() {
                    Ok(ip) => ServerAddr::SocketAddr(SocketAddr::new(ip, port)),
                    Err(..) => ServerAddr::DomainName(host, port),
                };
                nconfig
                    .server
                    .push(ServerConfig::new(addr, password.clone(), method, nconfig.timeout));
            }
        }

        Ok(nconfig)
    }

    /// Loads configuration from a JSON string
    pub fn load_from_str(s: &str) -> Result<Config, Error> {
        let ss_config = json5::from_str::<SSConfig>(s)
            .map_err(|err| Error::new(ErrorKind::JsonParsingError, "json parse error", Some(format!("{}", err))))?;
        Config::load_from_ssconfig(ss_config)
    }

    /// Loads configuration from a file
    pub fn load_from_file(filename: &str) -> Result<Config, Error> {
        let mut reader = OpenOptions::new()
            .read(true)
            .open(filename)
            .map_err(|err| Error::new(ErrorKind::IoError, "cannot open config file", Some(format!("{}", err))))?;

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|err| Error::new(ErrorKind::IoError, "cannot read config file", Some(format!("{}", err))))?;

        Config::load_from_str(&content)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_server_list() {
        let config = Config::load_from_str(
            r#"{
                "server": ["relay1.example.org", "192.168.100.1"],
                "server_port": 8388,
                "local_address": "127.0.0.1",
                "local_port": 1080,
                "password": "barfoo!",
                "method": "table",
                "timeout": 20
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.len(), 2);
        match config.server[0].addr() {
            ServerAddr::DomainName(dname, port) => {
                assert_eq!(dname, "relay1.example.org");
                assert_eq!(*port, 8388);
            }
            addr => panic!("unexpected address {:?}", addr),
        }
        match config.server[1].addr() {
            ServerAddr::SocketAddr(addr) => assert_eq!(*addr, "192.168.100.1:8388".parse().unwrap()),
            addr => panic!("unexpected address {:?}", addr),
        }
        assert_eq!(config.local, Some("127.0.0.1:1080".parse().unwrap()));
        assert_eq!(config.server[0].timeout(), Duration::from_secs(20));
    }

    #[test]
    fn parse_single_server_with_defaults() {
        let config = Config::load_from_str(
            r#"{
                "server": "relay.example.org",
                "server_port": 8388,
                "local_port": 1080,
                "password": "barfoo!"
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.len(), 1);
        assert_eq!(config.server[0].method(), CipherType::Table);
        assert_eq!(config.server[0].timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        // listener falls back to the wildcard address
        assert_eq!(config.local, Some("0.0.0.0:1080".parse().unwrap()));
    }

    #[test]
    fn parse_server_addr() {
        match "relay.example.org:8388".parse::<ServerAddr>().unwrap() {
            ServerAddr::DomainName(dname, port) => {
                assert_eq!(dname, "relay.example.org");
                assert_eq!(port, 8388);
            }
            addr => panic!("unexpected address {:?}", addr),
        }

        match "127.0.0.1:8388".parse::<ServerAddr>().unwrap() {
            ServerAddr::SocketAddr(addr) => assert_eq!(addr, "127.0.0.1:8388".parse().unwrap()),
            addr => panic!("unexpected address {:?}", addr),
        }

        assert!("relay.example.org".parse::<ServerAddr>().is_err());
    }

    #[test]
    fn reject_server_without_password() {
        let err = Config::load_from_str(
            r#"{
                "server": "relay.example.org",
                "server_port": 8388,
                "local_port": 1080
            }"#,
        )
        .unwrap_err();

        match err.kind {
            ErrorKind::MissingField => {}
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }
}
