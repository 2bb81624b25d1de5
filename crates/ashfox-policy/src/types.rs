//! Snapshot and permission vocabulary.

use ashfox_core::ids::RoleId;
use ashfox_storage::{AclRule, Member, Role, Workspace};
use std::collections::BTreeSet;

/// A permission the policy service can be asked to authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    /// Membership in the workspace at all.
    WorkspaceMember,
    /// Administrative control over workspace settings, roles, and members.
    WorkspaceManage,
    /// Read access to a folder (and, transitively, projects under it).
    FolderRead,
    /// Write access to a folder (and, transitively, projects under it).
    FolderWrite,
}

impl Permission {
    /// Stable wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceMember => "workspace.member",
            Self::WorkspaceManage => "workspace.manage",
            Self::FolderRead => "folder.read",
            Self::FolderWrite => "folder.write",
        }
    }
}

/// A materialized view of one workspace's authorization-relevant state.
///
/// Built from parallel reads of the workspace's roles, members, and ACL
/// rules; cached with a TTL by [`crate::service::WorkspacePolicyService`].
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    /// The workspace itself.
    pub workspace: Workspace,
    /// All roles defined in the workspace.
    pub roles: Vec<Role>,
    /// All memberships in the workspace.
    pub members: Vec<Member>,
    /// All folder ACL rules in the workspace.
    pub acl_rules: Vec<AclRule>,
    /// The role ids flagged as the workspace's built-in admin role.
    pub workspace_admin_role_ids: BTreeSet<RoleId>,
}

impl WorkspaceSnapshot {
    /// Build a snapshot, deriving `workspace_admin_role_ids` from `roles`.
    #[must_use]
    pub fn new(
        workspace: Workspace,
        roles: Vec<Role>,
        members: Vec<Member>,
        acl_rules: Vec<AclRule>,
    ) -> Self {
        let workspace_admin_role_ids = roles
            .iter()
            .filter(|r| r.is_workspace_admin())
            .map(|r| r.role_id.clone())
            .collect();
        Self {
            workspace,
            roles,
            members,
            acl_rules,
            workspace_admin_role_ids,
        }
    }

    /// The role ids held by `account_id` in this workspace, or an empty set
    /// if the account is not a member.
    #[must_use]
    pub fn role_ids_for(&self, account_id: &ashfox_core::ids::AccountId) -> BTreeSet<RoleId> {
        self.members
            .iter()
            .find(|m| &m.account_id == account_id)
            .map(|m| m.role_ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any of `role_ids` is the workspace's built-in admin role.
    #[must_use]
    pub fn holds_workspace_admin(&self, role_ids: &BTreeSet<RoleId>) -> bool {
        role_ids.iter().any(|r| self.workspace_admin_role_ids.contains(r))
    }
}
