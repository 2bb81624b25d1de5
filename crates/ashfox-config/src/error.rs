//! Configuration error types.

/// Errors raised while loading or validating gateway configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file's TOML could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: std::path::PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// An environment variable held a value of the wrong shape.
    #[error("environment variable {name} has an invalid value: {value}")]
    InvalidEnvValue {
        /// The variable name, e.g. `ASHFOX_WORKER_POLL_MS`.
        name: String,
        /// The value that failed to parse.
        value: String,
    },

    /// The resolved configuration failed a validation rule.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
