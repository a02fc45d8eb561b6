//! Process-wide configuration.
//!
//! The configuration is installed once, either explicitly with [`init`] or
//! lazily from the environment on first use, and never changes afterwards.
//!
//! Environment variables read by [`Config::from_env`]:
//!
//! | variable                  | field                |
//! |---------------------------|----------------------|
//! | `THENABLE_POOL_SIZE`      | `pool_size`          |
//! | `THENABLE_THREAD_PREFIX`  | `thread_name_prefix` |
//! | `THENABLE_STACK_SIZE`     | `stack_size`         |
//! | `THENABLE_DEFAULT_LAUNCH` | `default_launch`     |

use crate::launch::{Launch, ParseLaunchError};
use std::sync::OnceLock;

pub const POOL_SIZE_ENV: &str = "THENABLE_POOL_SIZE";
pub const THREAD_PREFIX_ENV: &str = "THENABLE_THREAD_PREFIX";
pub const STACK_SIZE_ENV: &str = "THENABLE_STACK_SIZE";
pub const DEFAULT_LAUNCH_ENV: &str = "THENABLE_DEFAULT_LAUNCH";

const DEFAULT_THREAD_PREFIX: &str = "thenable";

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("THENABLE_DEFAULT_LAUNCH: {0}")]
    InvalidLaunch(#[from] ParseLaunchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Worker threads in the shared pool used by `Launch::Async`.
    pub pool_size: usize,
    /// Prefix for the names of every thread this crate starts.
    pub thread_name_prefix: String,
    /// Stack size for pool, detached and parallel threads. `None` keeps the
    /// platform default.
    pub stack_size: Option<usize>,
    /// Policy returned by `Launch::default()`.
    pub default_launch: Launch,
}

impl Config {
    /// Defaults overridden by whatever `THENABLE_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(value) = lookup(POOL_SIZE_ENV) {
            config.pool_size = parse_positive(POOL_SIZE_ENV, value)?;
        }
        if let Some(value) = lookup(THREAD_PREFIX_ENV) {
            config.thread_name_prefix = value;
        }
        if let Some(value) = lookup(STACK_SIZE_ENV) {
            config.stack_size = Some(parse_positive(STACK_SIZE_ENV, value)?);
        }
        if let Some(value) = lookup(DEFAULT_LAUNCH_ENV) {
            config.default_launch = value.parse()?;
        }
        config.normalize();
        Ok(config)
    }

    /// Replaces out-of-range values with safe defaults.
    pub fn normalize(&mut self) {
        if self.pool_size == 0 {
            self.pool_size = 1;
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = DEFAULT_THREAD_PREFIX.to_string();
        }
        if self.stack_size == Some(0) {
            self.stack_size = None;
        }
    }

    pub(crate) fn thread_name(&self, role: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, role)
    }

    pub(crate) fn thread_builder(&self, role: &str) -> std::thread::Builder {
        let builder = std::thread::Builder::new().name(self.thread_name(role));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: hardware_concurrency(),
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
            stack_size: None,
            default_launch: Launch::Auto,
        }
    }
}

fn parse_positive(var: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}

/// Threads the host can run at once, at least 1.
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .max(1)
}

/// Installs `config` for the rest of the process. The first installation
/// wins; a later call gets its config back unchanged.
pub fn init(mut config: Config) -> Result<(), Config> {
    config.normalize();
    let mut pending = Some(config);
    CONFIG.get_or_init(|| pending.take().unwrap_or_default());
    match pending {
        Some(rejected) => Err(rejected),
        None => Ok(()),
    }
}

/// The installed configuration, loading it from the environment on first
/// use.
pub fn get() -> &'static Config {
    CONFIG.get_or_init(|| match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%err, "ignoring invalid environment configuration");
            Config::default()
        }
    })
}
