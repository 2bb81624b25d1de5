//! Configuration file discovery and loading.
//!
//! Precedence, highest to lowest:
//!
//! 1. Environment variables (`ASHFOX_WORKER_*`, `ASHFOX_NATIVE_PIPELINE_BACKEND`)
//! 2. A `gateway.toml` file, if `config_path` names one
//! 3. Embedded defaults ([`GatewayConfig::default`])

use crate::env::{apply_pipeline_backend_env, apply_worker_env};
use crate::error::{ConfigError, ConfigResult};
use crate::types::GatewayConfig;
use std::path::Path;

/// Load the gateway configuration, applying the file-then-env precedence
/// chain over the embedded defaults.
///
/// `config_path`, if given, must point at a TOML file layering partial
/// overrides onto [`GatewayConfig::default`].
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config_path` names a file that cannot be
/// read or parsed, or if an `ASHFOX_*` environment variable holds an
/// unparseable value.
pub fn load(config_path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    let mut config = match config_path {
        Some(path) => load_file(path)?,
        None => GatewayConfig::default(),
    };

    config.worker = apply_worker_env(config.worker)?;
    config.pipeline.backend = apply_pipeline_backend_env(config.pipeline.backend)?;

    Ok(config)
}

/// Load configuration from a single TOML file (no environment layering).
///
/// The file may specify any subset of [`GatewayConfig`]'s fields; missing
/// fields fall back to their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or
/// [`ConfigError::Parse`] if its contents are not valid TOML for
/// [`GatewayConfig`].
pub fn load_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_no_file_is_given() {
        std::env::remove_var("ASHFOX_WORKER_POLL_MS");
        let config = load(None).unwrap();
        assert_eq!(config.worker.poll_ms, 1_200);
        assert_eq!(config.lock.idle_ttl_ms, 2_000);
    }

    #[test]
    fn file_overrides_layer_onto_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[lock]\nidle_ttl_ms = 5000\n").unwrap();
        let config = load_file(file.path()).unwrap();
        assert_eq!(config.lock.idle_ttl_ms, 5_000);
        assert_eq!(config.policy.snapshot_cache_ttl_ms, 1_500);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_file(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
