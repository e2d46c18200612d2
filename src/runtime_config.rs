//! # Runtime Configuration Module
//!
//! Process settings read from environment variables, as opposed to the
//! application configuration file handled by [`config`](crate::config).
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! | --- | --- | --- |
//! | `TAGROUTE_BIND` | listen address | `127.0.0.1:8080` |
//! | `TAGROUTE_CONFIG` | configuration file | none |
//! | `TAGROUTE_ENV` | configuration environment | `production` |
//! | `TAGROUTE_WORKERS` | HTTP worker threads | available parallelism |
//!
//! ```rust
//! use tagroute::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.workers >= 1);
//! ```

use std::env;
use std::path::PathBuf;
use std::thread;

use crate::config::DEFAULT_ENVIRONMENT;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub bind: String,
    pub config_path: Option<PathBuf>,
    pub environment: String,
    /// HTTP worker threads, at least 1
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            config_path: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            workers: default_workers(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bind: non_empty("TAGROUTE_BIND").unwrap_or(defaults.bind),
            config_path: non_empty("TAGROUTE_CONFIG").map(PathBuf::from),
            environment: non_empty("TAGROUTE_ENV").unwrap_or(defaults.environment),
            workers: non_empty("TAGROUTE_WORKERS")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.workers),
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(4, |n| n.get())
}
