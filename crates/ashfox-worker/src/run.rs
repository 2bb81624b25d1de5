//! The worker's poll loop and heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use ashfox_backends::{Backend, BackendSession};
use ashfox_core::ids::{AccountId, WorkspaceId};
use ashfox_pipeline::NativePipelineStore;
use ashfox_storage::WorkspaceRepository;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::jobs::{check_capabilities, execute};
use crate::resolver::WorkspaceIdsResolver;

/// Drains the native pipeline queue across workspaces, executing claimed
/// jobs against a single backend.
pub struct Worker {
    store: Arc<NativePipelineStore>,
    workspaces: Arc<dyn WorkspaceRepository>,
    backend: Arc<dyn Backend>,
    resolver: Arc<dyn WorkspaceIdsResolver>,
    worker_id: String,
    poll_interval: Duration,
    heartbeat_interval: Duration,
}

impl Worker {
    /// Assemble a worker from its ports and the resolved poll/heartbeat cadence.
    #[must_use]
    pub fn new(
        store: Arc<NativePipelineStore>,
        workspaces: Arc<dyn WorkspaceRepository>,
        backend: Arc<dyn Backend>,
        resolver: Arc<dyn WorkspaceIdsResolver>,
        worker_id: String,
        poll_ms: u64,
        heartbeat_ms: u64,
    ) -> Self {
        Self {
            store,
            workspaces,
            backend,
            resolver,
            worker_id,
            poll_interval: Duration::from_millis(poll_ms),
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
        }
    }

    /// Run the job-claim poll loop until `shutdown_rx` fires.
    ///
    /// The in-flight job (if any) always runs to completion; no further tick
    /// starts after a shutdown signal is observed.
    pub async fn run_poll_loop(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("worker poll loop shutting down");
                    return;
                }
                () = tokio::time::sleep(self.poll_interval) => {
                    self.poll_once().await;
                }
            }
        }
    }

    /// Run the health-check heartbeat until `shutdown_rx` fires.
    ///
    /// Heartbeat failures are logged, never propagated: the job loop keeps
    /// running regardless of backend health.
    pub async fn run_heartbeat(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("worker heartbeat shutting down");
                    return;
                }
                () = tokio::time::sleep(self.heartbeat_interval) => {
                    let health = self.backend.get_health().await;
                    debug!(kind = %health.kind, availability = ?health.availability, version = %health.version, "backend heartbeat");
                }
            }
        }
    }

    /// Iterate the resolved workspace set, claiming and running at most one
    /// job per workspace this tick.
    async fn poll_once(&self) {
        for workspace_id in self.resolver.resolve().await {
            if let Err(error) = self.poll_workspace(&workspace_id).await {
                warn!(%workspace_id, %error, "skipping workspace this tick");
            }
        }
    }

    async fn poll_workspace(&self, workspace_id: &WorkspaceId) -> Result<(), String> {
        let job = self
            .store
            .claim_next_job(workspace_id, &self.worker_id)
            .await
            .map_err(|error| error.to_string())?;
        let Some(job) = job else {
            return Ok(());
        };

        let workspace = self
            .workspaces
            .find_workspace(workspace_id)
            .await
            .map_err(|error| error.to_string())?;
        let Some(workspace) = workspace else {
            return Err(format!("workspace {workspace_id} not found while running claimed job"));
        };

        let session = BackendSession {
            tenant_id: workspace.tenant_id,
            actor_id: AccountId::from(self.worker_id.clone()),
            project_id: job.project_id.clone(),
        };

        let capabilities = self
            .backend
            .handle_tool("list_capabilities", json!({}), session.clone())
            .await
            .unwrap_or_else(|error| json!({"tools": [], "error": error.message}));

        if let Err(error) = check_capabilities(job.kind, &capabilities) {
            self.store
                .fail_job(workspace_id, &job.id, &error.message)
                .await
                .map_err(|error| error.to_string())?;
            return Ok(());
        }

        let payload = job.payload.clone().unwrap_or(serde_json::Value::Null);
        match execute(job.kind, self.backend.as_ref(), session, payload).await {
            Ok(result) => {
                self.store
                    .complete_job(workspace_id, &job.id, Some(result))
                    .await
                    .map_err(|error| error.to_string())?;
            }
            Err(tool_error) => {
                if let Err(fail_error) = self.store.fail_job(workspace_id, &job.id, &tool_error.message).await {
                    error!(%workspace_id, job_id = %job.id, %fail_error, "failed to record job failure");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticWorkspaceIdsResolver;
    use ashfox_backends::BackendHealth;
    use ashfox_core::error::{ErrorCode, ToolError};
    use ashfox_core::ids::ProjectId;
    use ashfox_core::{JobKind, ToolResult};
    use ashfox_pipeline::{JobStatus, SubmitJobInput};
    use ashfox_storage::workspace::Workspace;
    use ashfox_test::{test_workspace_with_admin_role, InMemoryProjectRepository, InMemoryWorkspaceRepository};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    struct ScriptedBackend {
        health_calls: AtomicUsize,
        fail_export: bool,
    }

    impl ScriptedBackend {
        fn new(fail_export: bool) -> Self {
            Self {
                health_calls: AtomicUsize::new(0),
                fail_export,
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        fn kind(&self) -> &str {
            "native"
        }

        async fn get_health(&self) -> BackendHealth {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            BackendHealth {
                kind: "native".to_string(),
                availability: ashfox_backends::Availability::Ready,
                version: "test".to_string(),
                details: None,
            }
        }

        async fn handle_tool(&self, name: &str, _payload: Value, _session: BackendSession) -> ToolResult<Value> {
            match name {
                "list_capabilities" => Ok(serde_json::json!({
                    "tools": ["ensure_project", "export", "get_project_state", "preflight_texture"]
                })),
                "ensure_project" => Ok(serde_json::json!({})),
                "export" => {
                    if self.fail_export {
                        Err(ToolError::new(ErrorCode::UnsupportedFormat, "export failed (unsupported_format)"))
                    } else {
                        Ok(serde_json::json!({"exportPath": "/tmp/out.gltf", "selectedTarget": "gltf", "selectedFormat": "gltf"}))
                    }
                }
                "get_project_state" => Ok(serde_json::json!({"hasGeometry": true, "hierarchy": [{"type": "bone", "id": "b1", "name": "root", "children": []}]})),
                other => panic!("unexpected tool call: {other}"),
            }
        }
    }

    async fn wired(fail_export: bool) -> (Arc<NativePipelineStore>, Arc<dyn WorkspaceRepository>, Arc<ScriptedBackend>, WorkspaceId, ProjectId) {
        let repository = Arc::new(InMemoryProjectRepository::new());
        let store = Arc::new(NativePipelineStore::new(repository));
        let workspaces: Arc<dyn WorkspaceRepository> = Arc::new(InMemoryWorkspaceRepository::new());
        let (workspace, _role) = test_workspace_with_admin_role("ws-1", "tenant-1", "owner", "role-member");
        let workspace_id = workspace.workspace_id.clone();
        upsert_workspace(&workspaces, workspace).await;

        let project_id = ProjectId::from("project-a");
        store
            .submit_job(
                &workspace_id,
                SubmitJobInput {
                    project_id: project_id.clone(),
                    kind: JobKind::GltfConvert,
                    payload: Some(serde_json::json!({"codecId": "gltf", "optimize": true})),
                    max_attempts: None,
                    lease_ms: None,
                },
            )
            .await
            .unwrap();

        (store, workspaces, Arc::new(ScriptedBackend::new(fail_export)), workspace_id, project_id)
    }

    async fn upsert_workspace(workspaces: &Arc<dyn WorkspaceRepository>, workspace: Workspace) {
        workspaces.upsert_workspace(workspace).await.unwrap();
    }

    #[tokio::test]
    async fn claims_and_completes_a_job() {
        let (store, workspaces, backend, workspace_id, project_id) = wired(false).await;
        let resolver = Arc::new(StaticWorkspaceIdsResolver::new(vec![workspace_id.clone()]));
        let worker = Worker::new(store.clone(), workspaces, backend, resolver, "worker-1".to_string(), 50, 5_000);

        worker.poll_once().await;

        let jobs = store.list_project_jobs(&workspace_id, &project_id).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        let result = jobs[0].result.as_ref().unwrap();
        assert_eq!(result["status"], "converted");
        assert_eq!(result["output"]["selectedTarget"], "gltf");
    }

    #[tokio::test]
    async fn backend_error_fails_the_job_with_its_message() {
        let (store, workspaces, backend, workspace_id, project_id) = wired(true).await;
        let resolver = Arc::new(StaticWorkspaceIdsResolver::new(vec![workspace_id.clone()]));
        let worker = Worker::new(store.clone(), workspaces, backend, resolver, "worker-1".to_string(), 50, 5_000);

        worker.poll_once().await;

        let jobs = store.list_project_jobs(&workspace_id, &project_id).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].error.as_ref().unwrap().contains("export failed (unsupported_format)"));
    }

    #[tokio::test]
    async fn poll_loop_stops_on_shutdown_without_starting_another_tick() {
        let (store, workspaces, backend, workspace_id, _project_id) = wired(false).await;
        let resolver = Arc::new(StaticWorkspaceIdsResolver::new(vec![workspace_id]));
        let worker = Arc::new(Worker::new(store, workspaces, backend, resolver, "worker-1".to_string(), 10_000, 5_000));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn({
            let worker = worker.clone();
            async move { worker.run_poll_loop(shutdown_rx).await }
        });
        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("poll loop should shut down promptly")
            .unwrap();
    }
}
