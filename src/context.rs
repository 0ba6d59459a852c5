//! Shared basic configuration for the whole process

use std::sync::Arc;

use crate::config::Config;

/// State shared by every relay task
#[derive(Clone)]
pub struct Context {
    config: Config,
}

/// Unique context in the whole process
pub type SharedContext = Arc<Context>;

impl Context {
    pub fn new(config: Config) -> Context {
        Context { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
