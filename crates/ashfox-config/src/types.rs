//! Configuration struct definitions for the gateway and its worker process.

use serde::{Deserialize, Serialize};

/// The fully resolved, validated configuration for a gateway process.
///
/// Field defaults mirror the values the specification calls out directly:
/// lock idle TTL, pipeline lock timeout, policy cache TTL, and worker
/// poll/heartbeat cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Project lock manager (C2) settings.
    pub lock: LockConfig,
    /// Native pipeline store (C3) settings.
    pub pipeline: PipelineConfig,
    /// Workspace policy service (C4) settings.
    pub policy: PolicyConfig,
    /// Worker job loop (C7) settings.
    pub worker: WorkerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            pipeline: PipelineConfig::default(),
            policy: PolicyConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

/// Project lock manager settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Idle TTL for an exclusive project lock, in milliseconds.
    pub idle_ttl_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { idle_ttl_ms: 2_000 }
    }
}

/// Native pipeline store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Overall timeout for acquiring the distributed pipeline lock, in
    /// milliseconds, before the call fails with `lock_acquire_timeout`.
    pub lock_acquire_timeout_ms: u64,
    /// Delay between distributed-lock acquisition retries, in milliseconds.
    pub lock_retry_interval_ms: u64,
    /// Backend selection: `memory` (in-process only) or `persistence`
    /// (durable, multi-process safe).
    pub backend: PipelineBackend,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lock_acquire_timeout_ms: 10_000,
            lock_retry_interval_ms: 30,
            backend: PipelineBackend::Persistence,
        }
    }
}

/// Which storage backend the native pipeline store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineBackend {
    /// In-process only; state does not survive a restart.
    Memory,
    /// Durable, multi-process safe via the repository ports.
    Persistence,
}

impl PipelineBackend {
    /// Parse the `ASHFOX_NATIVE_PIPELINE_BACKEND` wire value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "memory" => Some(Self::Memory),
            "persistence" => Some(Self::Persistence),
            _ => None,
        }
    }
}

/// Workspace policy service settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// TTL for a cached workspace snapshot, in milliseconds.
    pub snapshot_cache_ttl_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            snapshot_cache_ttl_ms: 1_500,
        }
    }
}

/// Worker job loop settings, overridable by the `ASHFOX_WORKER_*` environment
/// variables documented in the external interface surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// `tracing` log level filter, e.g. `"info"`.
    pub log_level: String,
    /// Heartbeat interval, in milliseconds.
    pub heartbeat_ms: u64,
    /// Poll interval between queue drain attempts, in milliseconds.
    pub poll_ms: u64,
    /// Whether the native pipeline is enabled for this worker.
    pub native_pipeline_enabled: bool,
    /// This worker's identifier. Defaults to `worker-<pid>` at startup if unset.
    pub worker_id: Option<String>,
    /// Static workspace-id hints, unioned with a repository prefix scan by
    /// the workspace-ids resolver.
    pub workspace_id_hints: Vec<String>,
    /// TTL for the cached resolved workspace-id set, in milliseconds.
    pub workspace_ids_cache_ttl_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            heartbeat_ms: 5_000,
            poll_ms: 1_200,
            native_pipeline_enabled: false,
            worker_id: None,
            workspace_id_hints: Vec::new(),
            workspace_ids_cache_ttl_ms: 2_000,
        }
    }
}

impl WorkerConfig {
    /// The effective worker id: the configured value, or `worker-<pid>`.
    #[must_use]
    pub fn effective_worker_id(&self) -> String {
        self.worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", std::process::id()))
    }
}
