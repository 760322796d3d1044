//! Configuration management for the key/value node.
//!
//! Provides hierarchical configuration loading with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod server;
mod watch;

pub use server::*;
pub use watch::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Main configuration container for the node.
///
/// Combines all subsystem configurations with hierarchical override
/// support (later sources override earlier ones):
/// 1. Default values from code
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with `MINIKV_` prefix (highest priority)
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct NodeConfig {
    /// Listener and logging configuration
    pub server: ServerConfig,
    /// Change-notification fan-out parameters
    pub watch: WatchConfig,
}

impl NodeConfig {
    /// Loads configuration from hierarchical sources and validates it.
    ///
    /// `config_path` overrides the `CONFIG_PATH` environment variable when
    /// given. Nested keys in environment variables use `__` as separator,
    /// e.g. `MINIKV_SERVER__LISTEN_ADDRESS=0.0.0.0:50051`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&NodeConfig::default())?);

        let file_path = config_path
            .map(str::to_string)
            .or_else(|| env::var("CONFIG_PATH").ok());
        if let Some(path) = file_path {
            builder = builder.add_source(File::with_name(&path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MINIKV")
                .separator("__")
                .try_parsing(true),
        );

        let settings: NodeConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates every subsystem section.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.watch.validate()?;
        Ok(())
    }
}
