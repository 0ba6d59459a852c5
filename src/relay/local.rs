//! Relay server running on local environment

use std::io;

use crate::{
    config::Config,
    context::{Context, SharedContext},
    relay::tcprelay::local::run as run_tcp,
};

/// Relay server running under local environment.
///
/// ```no_run
/// use veilsocks::{run_local, Config};
///
/// let config = Config::load_from_str(
///     r#"{
///         "server": "relay.example.org",
///         "server_port": 8388,
///         "local_port": 1080,
///         "password": "server-password",
///         "method": "table"
///     }"#,
/// )
/// .unwrap();
///
/// let mut rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async move {
///     run_local(config).await.expect("relay exited unexpectedly");
/// });
/// ```
pub async fn run(config: Config) -> io::Result<()> {
    let context = SharedContext::new(Context::new(config));
    run_tcp(context).await
}
