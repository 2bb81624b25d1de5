//! `Dispatcher`: the single public entry point for every tool call.

use std::sync::Arc;

use ashfox_backends::{Backend, BackendRegistry, BackendSession};
use ashfox_core::actor::{ActorContext, McpContext};
use ashfox_core::error::{ToolError, ToolResponse, ToolResult};
use ashfox_core::ids::{ProjectId, ProjectScope, TenantId, WorkspaceId};
use ashfox_core::tools::ToolName;
use ashfox_lock::{LockOwner, ProjectLockError, ProjectLockManager};
use ashfox_policy::{AuthzError, WorkspacePolicyService};
use ashfox_storage::{ProjectRepository, Workspace, WorkspaceRepository};
use serde_json::Value;

use crate::metrics::GuardFailureCounter;

const DEFAULT_PROJECT_ID: &str = "default-project";
const PROJECT_ID_ALIASES: &[&str] = &["projectId", "project_id", "projectName", "project", "name"];

/// Turns one `(toolName, payload, ctx)` into exactly one [`ToolResponse`].
///
/// Mutating tools go through the full guard chain: folder-path lookup,
/// write authorization, project lock acquisition, the optional `ifRevision`
/// guard, then the backend call, with the lock released on every exit path.
/// Non-mutating tools skip locking and write authorization, checking
/// read authorization only for tools that expose project state.
pub struct Dispatcher {
    backends: BackendRegistry,
    workspaces: Arc<dyn WorkspaceRepository>,
    projects: Arc<dyn ProjectRepository>,
    policy: Arc<WorkspacePolicyService>,
    locks: Arc<ProjectLockManager>,
    guard_failures: GuardFailureCounter,
}

impl Dispatcher {
    /// Wire a dispatcher over its ports and services.
    #[must_use]
    pub fn new(
        backends: BackendRegistry,
        workspaces: Arc<dyn WorkspaceRepository>,
        projects: Arc<dyn ProjectRepository>,
        policy: Arc<WorkspacePolicyService>,
        locks: Arc<ProjectLockManager>,
    ) -> Self {
        Self {
            backends,
            workspaces,
            projects,
            policy,
            locks,
            guard_failures: GuardFailureCounter::default(),
        }
    }

    /// A point-in-time snapshot of failed-guard counts, keyed by `(tool, code, reason)`.
    #[must_use]
    pub fn guard_failure_counts(
        &self,
    ) -> std::collections::HashMap<(String, &'static str, String), u64> {
        self.guard_failures.snapshot()
    }

    /// Dispatch one tool call. Never panics out to the caller and never
    /// returns anything other than a well-formed envelope.
    pub async fn handle(&self, tool_name: &str, payload: Value, ctx: &McpContext) -> ToolResponse<Value> {
        let result = self.handle_inner(tool_name, payload, ctx).await;
        if let Err(ref error) = result {
            self.guard_failures
                .record(tool_name, error.code, error.reason().unwrap_or("none"));
            tracing::warn!(
                tool = tool_name,
                code = error.code.as_str(),
                account_id = ctx.mcp_account_id.as_ref().map(|a| a.as_str()).unwrap_or("anonymous"),
                reason = error.reason().unwrap_or("none"),
                "tool dispatch failed"
            );
        }
        result.into()
    }

    async fn handle_inner(&self, tool_name: &str, payload: Value, ctx: &McpContext) -> ToolResult<Value> {
        let tool = ToolName::parse(tool_name)
            .map_err(|name| ToolError::invalid_payload(format!("unknown tool {name:?}")))?;

        let account_id = ctx.mcp_account_id.clone().ok_or_else(|| {
            ToolError::invalid_state("this tool requires an authenticated MCP session")
                .with_reason("missing_mcp_account_context")
        })?;
        let actor = ActorContext {
            account_id,
            system_roles: ctx.mcp_system_roles.clone().unwrap_or_default(),
        };

        if let Some(declared) = payload.get("workspaceId").and_then(Value::as_str) {
            if declared != ctx.mcp_workspace_id.as_str() {
                return Err(ToolError::invalid_payload(
                    "payload.workspaceId does not match the session's workspace",
                )
                .with_reason("mcp_workspace_context_mismatch"));
            }
        }

        let backend_kind = payload.get("backend").and_then(Value::as_str);
        let backend = self.backends.resolve(backend_kind).ok_or_else(|| {
            ToolError::invalid_state(format!(
                "Requested backend is unavailable. Registered backends: {}",
                self.backends.list_kinds().join(", ")
            ))
        })?;

        let project_id = resolve_project_id(&payload);
        let workspace_id = ctx.mcp_workspace_id.clone();
        let workspace = self.find_workspace(&workspace_id).await?;
        let tenant_id = workspace.tenant_id.clone();

        if tool.is_mutating() {
            self.handle_mutating(
                &tool,
                payload,
                ctx,
                &actor,
                &workspace_id,
                &tenant_id,
                &project_id,
                backend,
            )
            .await
        } else {
            self.handle_non_mutating(
                &tool,
                payload,
                &actor,
                &workspace_id,
                &tenant_id,
                &project_id,
                backend,
            )
            .await
        }
    }

    async fn find_workspace(&self, workspace_id: &WorkspaceId) -> ToolResult<Workspace> {
        self.workspaces
            .find_workspace(workspace_id)
            .await
            .map_err(|error| ToolError::io_error(error.to_string()))?
            .ok_or_else(|| {
                ToolError::invalid_state(format!("workspace not found: {workspace_id}"))
                    .with_reason("workspace_not_found")
            })
    }

    async fn folder_path(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> ToolResult<Vec<Option<String>>> {
        self.workspaces
            .project_folder_path(workspace_id, project_id)
            .await
            .map_err(|error| ToolError::io_error(error.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_mutating(
        &self,
        tool: &ToolName,
        payload: Value,
        ctx: &McpContext,
        actor: &ActorContext,
        workspace_id: &WorkspaceId,
        tenant_id: &TenantId,
        project_id: &ProjectId,
        backend: Arc<dyn Backend>,
    ) -> ToolResult<Value> {
        let folder_path = self.folder_path(workspace_id, project_id).await?;
        self.policy
            .authorize_project_write(workspace_id, &folder_path, project_id, tool.as_str(), actor)
            .await
            .map_err(authz_to_tool_error)?;

        let owner = LockOwner::new(ctx.lock_owner_agent_id(), ctx.mcp_session_id.clone());
        self.locks
            .acquire(workspace_id, project_id, owner.clone())
            .map_err(lock_error_to_tool_error)?;
        let _release_guard = LockReleaseGuard {
            locks: self.locks.clone(),
            workspace_id: workspace_id.clone(),
            project_id: project_id.clone(),
            owner,
        };

        if let Some(expected) = payload.get("ifRevision").and_then(Value::as_str) {
            let scope = ProjectScope::new(tenant_id.clone(), project_id.clone());
            let current = self
                .projects
                .find(&scope)
                .await
                .map_err(|error| ToolError::io_error(error.to_string()))?;
            let current_revision = current.map(|record| record.revision);
            if current_revision.as_deref() != Some(expected) {
                return Err(ToolError::revision_mismatch(
                    expected,
                    current_revision.as_deref().unwrap_or("<none>"),
                ));
            }
        }

        let session = BackendSession {
            tenant_id: tenant_id.clone(),
            actor_id: actor.account_id.clone(),
            project_id: project_id.clone(),
        };
        backend.handle_tool(tool.as_str(), payload, session).await
    }

    async fn handle_non_mutating(
        &self,
        tool: &ToolName,
        payload: Value,
        actor: &ActorContext,
        workspace_id: &WorkspaceId,
        tenant_id: &TenantId,
        project_id: &ProjectId,
        backend: Arc<dyn Backend>,
    ) -> ToolResult<Value> {
        if tool.requires_project() {
            let folder_path = self.folder_path(workspace_id, project_id).await?;
            self.policy
                .authorize_project_read(workspace_id, &folder_path, project_id, actor)
                .await
                .map_err(authz_to_tool_error)?;
        }

        let session = BackendSession {
            tenant_id: tenant_id.clone(),
            actor_id: actor.account_id.clone(),
            project_id: project_id.clone(),
        };
        backend.handle_tool(tool.as_str(), payload, session).await
    }
}

/// Releases the project lock when dropped, on every exit path including an
/// unwinding panic. Only the owner recorded at acquire time is released.
struct LockReleaseGuard {
    locks: Arc<ProjectLockManager>,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    owner: LockOwner,
}

impl Drop for LockReleaseGuard {
    fn drop(&mut self) {
        if let Err(error) = self.locks.release(&self.workspace_id, &self.project_id, &self.owner) {
            tracing::error!(
                workspace_id = %self.workspace_id,
                project_id = %self.project_id,
                ?error,
                "failed to release project lock after dispatch"
            );
        }
    }
}

fn resolve_project_id(payload: &Value) -> ProjectId {
    PROJECT_ID_ALIASES
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(ProjectId::from)
        .unwrap_or_else(|| ProjectId::from(DEFAULT_PROJECT_ID))
}

fn authz_to_tool_error(error: AuthzError) -> ToolError {
    match error {
        AuthzError::WorkspaceNotFound(workspace_id) => {
            ToolError::invalid_state(format!("workspace not found: {workspace_id}"))
                .with_reason("workspace_not_found")
        }
        AuthzError::Forbidden { reason, permission } => ToolError::invalid_state(format!(
            "actor lacks {permission} ({})",
            reason.as_str()
        ))
        .with_reason(reason.as_str()),
    }
}

fn lock_error_to_tool_error(error: ProjectLockError) -> ToolError {
    match error {
        ProjectLockError::LockHeld { current_owner } => ToolError::invalid_state(format!(
            "project is locked by {}",
            current_owner.agent_id
        ))
        .with_reason("project_locked"),
        ProjectLockError::NotOwner => {
            ToolError::invalid_state("lock owner mismatch on acquire").with_reason("project_locked")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_backends::{Availability, BackendHealth};
    use ashfox_core::ids::{AccountId, ApiKeyId, RoleId};
    use ashfox_storage::{AclEffect, AclRule, Member, Role};
    use ashfox_test::InMemoryWorkspaceRepository;
    use ashfox_test::InMemoryProjectRepository;
    use async_trait::async_trait;
    use chrono::Utc;

    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        fn kind(&self) -> &str {
            "native"
        }

        async fn get_health(&self) -> BackendHealth {
            BackendHealth {
                kind: "native".to_string(),
                availability: Availability::Ready,
                version: "test".to_string(),
                details: None,
            }
        }

        async fn handle_tool(
            &self,
            name: &str,
            payload: Value,
            _session: BackendSession,
        ) -> ToolResult<Value> {
            Ok(serde_json::json!({ "tool": name, "echo": payload }))
        }
    }

    async fn wired(workspace_id: &WorkspaceId, account_id: &AccountId) -> Dispatcher {
        let workspaces = Arc::new(InMemoryWorkspaceRepository::new());
        let projects = Arc::new(InMemoryProjectRepository::new());

        workspaces
            .upsert_workspace(Workspace {
                workspace_id: workspace_id.clone(),
                tenant_id: TenantId::from("tenant-1"),
                name: "Demo".to_string(),
                default_member_role_id: RoleId::from("editor"),
                created_by: account_id.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        workspaces
            .upsert_role(Role {
                workspace_id: workspace_id.clone(),
                role_id: RoleId::from("editor"),
                name: "Editor".to_string(),
                builtin: None,
                permissions: std::collections::BTreeSet::new(),
            })
            .await
            .unwrap();
        workspaces
            .upsert_member(Member {
                workspace_id: workspace_id.clone(),
                account_id: account_id.clone(),
                role_ids: vec![RoleId::from("editor")],
            })
            .await
            .unwrap();
        workspaces
            .upsert_acl_rule(AclRule {
                workspace_id: workspace_id.clone(),
                rule_id: "rule-root".to_string(),
                folder_id: None,
                role_ids: vec![RoleId::from("editor")],
                read: AclEffect::Allow,
                write: AclEffect::Allow,
                locked: false,
            })
            .await
            .unwrap();

        let backends = BackendRegistry::builder()
            .register(Arc::new(EchoBackend))
            .with_default("native")
            .build();
        let policy = Arc::new(WorkspacePolicyService::new(workspaces.clone()));
        let locks = Arc::new(ProjectLockManager::with_system_clock());

        Dispatcher::new(backends, workspaces, projects, policy, locks)
    }

    fn ctx(workspace_id: &WorkspaceId, account_id: &AccountId) -> McpContext {
        McpContext {
            mcp_session_id: "sess-1".to_string(),
            mcp_account_id: Some(account_id.clone()),
            mcp_system_roles: None,
            mcp_workspace_id: workspace_id.clone(),
            mcp_api_key_id: None::<ApiKeyId>,
        }
    }

    #[tokio::test]
    async fn mutating_call_succeeds_and_releases_the_lock() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;
        let call_ctx = ctx(&workspace_id, &account_id);

        let response = dispatcher
            .handle("add_bone", serde_json::json!({"projectId": "proj-1"}), &call_ctx)
            .await;
        assert!(response.is_ok());

        // The lock manager has released the lock: a second caller can acquire it.
        dispatcher
            .locks
            .acquire(
                &workspace_id,
                &ProjectId::from("proj-1"),
                LockOwner::new("mcp:sess-2", "sess-2"),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn missing_account_context_is_rejected() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;
        let mut anonymous_ctx = ctx(&workspace_id, &account_id);
        anonymous_ctx.mcp_account_id = None;

        let response = dispatcher
            .handle("add_bone", serde_json::json!({}), &anonymous_ctx)
            .await;
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn non_member_is_forbidden_on_a_mutating_call() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;
        let stranger = AccountId::from("acct-stranger");
        let mut stranger_ctx = ctx(&workspace_id, &account_id);
        stranger_ctx.mcp_account_id = Some(stranger);

        let response = dispatcher
            .handle("add_bone", serde_json::json!({}), &stranger_ctx)
            .await;
        assert!(!response.is_ok());
        assert!(dispatcher
            .guard_failure_counts()
            .into_keys()
            .any(|(_, code, reason)| code == "invalid_state" && reason == "forbidden_workspace"));
    }

    #[tokio::test]
    async fn held_lock_blocks_a_second_mutating_call() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;
        let project_id = ProjectId::from("proj-1");

        dispatcher
            .locks
            .acquire(&workspace_id, &project_id, LockOwner::new("mcp:other", "other"))
            .unwrap();

        let call_ctx = ctx(&workspace_id, &account_id);
        let response = dispatcher
            .handle(
                "add_bone",
                serde_json::json!({"projectId": "proj-1"}),
                &call_ctx,
            )
            .await;
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn if_revision_mismatch_is_rejected() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;

        let response = dispatcher
            .handle(
                "add_bone",
                serde_json::json!({"projectId": "proj-1", "ifRevision": "stale-hash"}),
                &ctx(&workspace_id, &account_id),
            )
            .await;
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn non_mutating_call_does_not_require_a_project_lock() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;

        let response = dispatcher
            .handle("list_capabilities", serde_json::json!({}), &ctx(&workspace_id, &account_id))
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn workspace_context_mismatch_is_rejected() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;

        let response = dispatcher
            .handle(
                "add_bone",
                serde_json::json!({"workspaceId": "some-other-ws"}),
                &ctx(&workspace_id, &account_id),
            )
            .await;
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn unregistered_backend_is_rejected() {
        let workspace_id = WorkspaceId::from("ws-1");
        let account_id = AccountId::from("acct-1");
        let dispatcher = wired(&workspace_id, &account_id).await;

        let response = dispatcher
            .handle(
                "list_capabilities",
                serde_json::json!({"backend": "blender"}),
                &ctx(&workspace_id, &account_id),
            )
            .await;
        assert!(!response.is_ok());
    }
}
