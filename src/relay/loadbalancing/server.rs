//! Picks a remote relay for every new client connection

use std::sync::Arc;

use rand::Rng;

use crate::config::ServerConfig;

pub trait LoadBalancer {
    /// Picks a server for a new connection
    fn pick_server(&mut self) -> Arc<ServerConfig>;
    /// Number of candidate servers
    fn total(&self) -> usize;
}

/// Uniform random pick over the configured servers
pub struct UniformRandom {
    servers: Vec<Arc<ServerConfig>>,
}

impl UniformRandom {
    pub fn new(servers: Vec<ServerConfig>) -> UniformRandom {
        UniformRandom {
            servers: servers.into_iter().map(Arc::new).collect(),
        }
    }
}

impl LoadBalancer for UniformRandom {
    fn pick_server(&mut self) -> Arc<ServerConfig> {
        if self.servers.len() == 1 {
            return self.servers[0].clone();
        }

        let idx = rand::thread_rng().gen_range(0, self.servers.len());
        self.servers[idx].clone()
    }

    fn total(&self) -> usize {
        self.servers.len()
    }
}
