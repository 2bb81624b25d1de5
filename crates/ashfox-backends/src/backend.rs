//! The `Backend` port every modeling-tool backend implements.

use ashfox_core::ids::{AccountId, ProjectId, TenantId};
use ashfox_core::ToolResult;
use async_trait::async_trait;
use serde_json::Value;

/// A backend's self-reported readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Fully operational.
    Ready,
    /// Operational with reduced capability (e.g. optional codec missing).
    Degraded,
    /// Cannot serve requests right now.
    Unavailable,
}

/// The result of a backend health probe.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BackendHealth {
    /// The backend's registered kind.
    pub kind: String,
    /// Current readiness.
    pub availability: Availability,
    /// Backend-reported version string.
    pub version: String,
    /// Free-form diagnostic details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// The session identity a dispatched tool call executes under.
#[derive(Debug, Clone)]
pub struct BackendSession {
    /// The owning tenant.
    pub tenant_id: TenantId,
    /// The acting account.
    pub actor_id: AccountId,
    /// The target project.
    pub project_id: ProjectId,
}

/// A pluggable modeling-tool backend, addressed by its `kind` in the registry.
///
/// Implementations are expected to be cheaply `Clone`-able handles (an `Arc`
/// around shared state) since the registry hands out `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The backend's registry key, e.g. `"native"` or `"blender"`.
    fn kind(&self) -> &str;

    /// Report current readiness. Never errors: an unreachable dependency is
    /// reported as `Availability::Unavailable`, not propagated.
    async fn get_health(&self) -> BackendHealth;

    /// Execute `name` against `payload` under `session`.
    async fn handle_tool(
        &self,
        name: &str,
        payload: Value,
        session: BackendSession,
    ) -> ToolResult<Value>;
}
