//! Builders for the domain objects tests construct most often.

use ashfox_core::{ActorContext, McpContext};
use ashfox_core::ids::{AccountId, ApiKeyId, WorkspaceId};
use ashfox_storage::workspace::{Role, Workspace, WORKSPACE_ADMIN_ROLE};
use chrono::Utc;

/// Build an `McpContext` authenticated as `account_id` in `workspace_id`.
#[must_use]
pub fn test_mcp_context(workspace_id: &str, account_id: &str) -> McpContext {
    McpContext {
        mcp_session_id: format!("sess-{account_id}"),
        mcp_account_id: Some(AccountId::from(account_id)),
        mcp_system_roles: None,
        mcp_workspace_id: WorkspaceId::from(workspace_id),
        mcp_api_key_id: None,
    }
}

/// Build an unauthenticated `McpContext` (no `mcpAccountId`).
#[must_use]
pub fn test_unauthenticated_mcp_context(workspace_id: &str) -> McpContext {
    McpContext {
        mcp_session_id: "sess-anon".to_string(),
        mcp_account_id: None,
        mcp_system_roles: None,
        mcp_workspace_id: WorkspaceId::from(workspace_id),
        mcp_api_key_id: None,
    }
}

/// Build an `McpContext` for a system manager (bypasses workspace ACLs).
#[must_use]
pub fn test_system_manager_context(workspace_id: &str, account_id: &str) -> McpContext {
    McpContext {
        mcp_session_id: format!("sess-{account_id}"),
        mcp_account_id: Some(AccountId::from(account_id)),
        mcp_system_roles: Some(["system_admin".to_string()].into_iter().collect()),
        mcp_workspace_id: WorkspaceId::from(workspace_id),
        mcp_api_key_id: None,
    }
}

/// Build an `ActorContext` with no system roles.
#[must_use]
pub fn test_actor(account_id: &str) -> ActorContext {
    ActorContext::new(account_id)
}

/// Build a workspace plus its built-in `workspace_admin` role, with
/// `default_member_role_id` left pointing at a caller-supplied non-admin role.
#[must_use]
pub fn test_workspace_with_admin_role(
    workspace_id: &str,
    tenant_id: &str,
    created_by: &str,
    default_member_role_id: &str,
) -> (Workspace, Role) {
    let workspace = Workspace {
        workspace_id: WorkspaceId::from(workspace_id),
        tenant_id: tenant_id.into(),
        name: format!("Test workspace {workspace_id}"),
        default_member_role_id: default_member_role_id.into(),
        created_by: AccountId::from(created_by),
        created_at: Utc::now(),
    };
    let admin_role = Role {
        workspace_id: WorkspaceId::from(workspace_id),
        role_id: "role-admin".into(),
        name: "Workspace Admin".to_string(),
        builtin: Some(WORKSPACE_ADMIN_ROLE.to_string()),
        permissions: ["workspace.manage".to_string(), "folder.read".to_string(), "folder.write".to_string()]
            .into_iter()
            .collect(),
    };
    (workspace, admin_role)
}

/// A placeholder API key id for fixtures that don't exercise key lookup.
#[must_use]
pub fn test_api_key_id(suffix: &str) -> ApiKeyId {
    ApiKeyId::from(format!("key-{suffix}"))
}
