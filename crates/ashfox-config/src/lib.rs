#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Ashfox gateway process and its worker loop.
//!
//! This crate has no dependencies on other internal `ashfox-*` crates — only
//! `serde`, `toml`, `thiserror`, and `tracing` — so it can be loaded before
//! anything else stands up.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ashfox_config::GatewayConfig;
//!
//! // Layer an optional gateway.toml, then ASHFOX_* environment overrides,
//! // onto the embedded defaults.
//! let config = GatewayConfig::load(Some(std::path::Path::new("gateway.toml"))).unwrap();
//! println!("worker poll interval: {}ms", config.worker.poll_ms);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`ASHFOX_WORKER_*`, `ASHFOX_NATIVE_PIPELINE_BACKEND`)
//! 2. **Config file** (`gateway.toml`, explicitly named by the caller)
//! 3. **Embedded defaults** (the values named throughout the component design)

/// `ASHFOX_*` environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use types::{GatewayConfig, LockConfig, PipelineBackend, PipelineConfig, PolicyConfig, WorkerConfig};

impl GatewayConfig {
    /// Load configuration with the full precedence chain (defaults → file → env).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config_path` names a file that cannot be
    /// read or parsed, or an `ASHFOX_*` environment variable is malformed.
    pub fn load(config_path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(config_path)
    }

    /// Load configuration from a single file, with no environment layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
