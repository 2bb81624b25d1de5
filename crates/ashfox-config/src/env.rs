//! `ASHFOX_*` environment variable overrides for the worker process.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{PipelineBackend, WorkerConfig};

/// Apply `ASHFOX_WORKER_*` and `ASHFOX_NATIVE_PIPELINE_BACKEND` environment
/// overrides on top of `worker` and the pipeline backend default.
///
/// Environment variables take precedence over any file-sourced value, per
/// the precedence chain documented on [`crate::loader::load`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvValue`] if a numeric or enum variable is
/// set but cannot be parsed.
pub fn apply_worker_env(mut worker: WorkerConfig) -> ConfigResult<WorkerConfig> {
    if let Some(level) = read_env("ASHFOX_WORKER_LOG_LEVEL") {
        worker.log_level = level;
    }
    if let Some(raw) = read_env("ASHFOX_WORKER_HEARTBEAT_MS") {
        worker.heartbeat_ms = parse_u64("ASHFOX_WORKER_HEARTBEAT_MS", &raw)?;
    }
    if let Some(raw) = read_env("ASHFOX_WORKER_POLL_MS") {
        worker.poll_ms = parse_u64("ASHFOX_WORKER_POLL_MS", &raw)?;
    }
    if let Some(raw) = read_env("ASHFOX_WORKER_NATIVE_PIPELINE") {
        worker.native_pipeline_enabled = raw == "1";
    }
    if let Some(id) = read_env("ASHFOX_WORKER_ID") {
        worker.worker_id = Some(id);
    }
    if let Some(raw) = read_env("ASHFOX_WORKER_WORKSPACE_IDS") {
        worker.workspace_id_hints = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    Ok(worker)
}

/// Apply the `ASHFOX_NATIVE_PIPELINE_BACKEND` environment override.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvValue`] if the variable is set to
/// anything other than `memory` or `persistence`.
pub fn apply_pipeline_backend_env(default: PipelineBackend) -> ConfigResult<PipelineBackend> {
    match read_env("ASHFOX_NATIVE_PIPELINE_BACKEND") {
        None => Ok(default),
        Some(raw) => PipelineBackend::parse(&raw).ok_or_else(|| ConfigError::InvalidEnvValue {
            name: "ASHFOX_NATIVE_PIPELINE_BACKEND".to_string(),
            value: raw,
        }),
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_u64(name: &str, value: &str) -> ConfigResult<u64> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn overrides_only_the_set_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ASHFOX_WORKER_POLL_MS", "750");
        std::env::remove_var("ASHFOX_WORKER_HEARTBEAT_MS");

        let worker = apply_worker_env(WorkerConfig::default()).unwrap();
        assert_eq!(worker.poll_ms, 750);
        assert_eq!(worker.heartbeat_ms, 5_000);

        std::env::remove_var("ASHFOX_WORKER_POLL_MS");
    }

    #[test]
    fn rejects_unparseable_numeric_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ASHFOX_WORKER_HEARTBEAT_MS", "soon");
        let err = apply_worker_env(WorkerConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvValue { .. }));
        std::env::remove_var("ASHFOX_WORKER_HEARTBEAT_MS");
    }

    #[test]
    fn workspace_id_hints_split_on_comma() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ASHFOX_WORKER_WORKSPACE_IDS", "ws-1, ws-2 ,ws-3");
        let worker = apply_worker_env(WorkerConfig::default()).unwrap();
        assert_eq!(worker.workspace_id_hints, vec!["ws-1", "ws-2", "ws-3"]);
        std::env::remove_var("ASHFOX_WORKER_WORKSPACE_IDS");
    }
}
