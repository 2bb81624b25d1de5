//! Actor identity and the MCP request context carried on every call.

use crate::ids::{AccountId, ApiKeyId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// System-wide roles that bypass workspace-level authorization entirely.
pub const SYSTEM_MANAGER_ROLES: &[&str] = &["system_admin", "cs_admin"];

/// The identity of the caller, independent of the transport that carried it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// The acting account.
    pub account_id: AccountId,
    /// System-wide roles (not workspace roles) held by this account.
    #[serde(default)]
    pub system_roles: HashSet<String>,
}

impl ActorContext {
    /// Construct an actor with no system roles.
    #[must_use]
    pub fn new(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            system_roles: HashSet::new(),
        }
    }

    /// Construct an actor holding the given system roles.
    #[must_use]
    pub fn with_system_roles(
        account_id: impl Into<AccountId>,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            system_roles: roles.into_iter().collect(),
        }
    }

    /// A system manager (holding `system_admin` or `cs_admin`) bypasses all
    /// workspace-level authorization checks unconditionally.
    #[must_use]
    pub fn is_system_manager(&self) -> bool {
        SYSTEM_MANAGER_ROLES
            .iter()
            .any(|r| self.system_roles.contains(*r))
    }
}

/// The per-request identity envelope supplied by the transport layer.
///
/// Field names mirror the wire names used by the MCP session context so the
/// dispatcher can deserialize it directly from the transport's handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpContext {
    /// The MCP session identifier (used to derive the lock owner's session half).
    #[serde(rename = "mcpSessionId")]
    pub mcp_session_id: String,
    /// The authenticated account, if any. Absent for unauthenticated calls.
    #[serde(rename = "mcpAccountId", skip_serializing_if = "Option::is_none")]
    pub mcp_account_id: Option<AccountId>,
    /// System-wide roles granted to the caller, if any.
    #[serde(rename = "mcpSystemRoles", skip_serializing_if = "Option::is_none")]
    pub mcp_system_roles: Option<HashSet<String>>,
    /// The workspace this session is bound to.
    #[serde(rename = "mcpWorkspaceId")]
    pub mcp_workspace_id: WorkspaceId,
    /// The API key used to authenticate, if any.
    #[serde(rename = "mcpApiKeyId", skip_serializing_if = "Option::is_none")]
    pub mcp_api_key_id: Option<ApiKeyId>,
}

impl McpContext {
    /// Build the actor identity this context authenticates, if authenticated.
    #[must_use]
    pub fn actor(&self) -> Option<ActorContext> {
        let account_id = self.mcp_account_id.clone()?;
        Some(ActorContext {
            account_id,
            system_roles: self.mcp_system_roles.clone().unwrap_or_default(),
        })
    }

    /// The lock-owner agent identity derived from this session, `mcp:<sessionId>`.
    #[must_use]
    pub fn lock_owner_agent_id(&self) -> String {
        format!("mcp:{}", self.mcp_session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_manager_roles_bypass() {
        let actor = ActorContext::with_system_roles("acct-1", ["system_admin".to_string()]);
        assert!(actor.is_system_manager());

        let plain = ActorContext::new("acct-2");
        assert!(!plain.is_system_manager());
    }

    #[test]
    fn context_without_account_has_no_actor() {
        let ctx = McpContext {
            mcp_session_id: "sess-1".to_string(),
            mcp_account_id: None,
            mcp_system_roles: None,
            mcp_workspace_id: WorkspaceId::from("ws-1"),
            mcp_api_key_id: None,
        };
        assert!(ctx.actor().is_none());
        assert_eq!(ctx.lock_owner_agent_id(), "mcp:sess-1");
    }
}
