//! Workspace domain types and the `WorkspaceRepository` port.

use crate::error::StorageResult;
use crate::revision::content_hash;
use ashfox_core::ids::{AccountId, ApiKeyId, ProjectId, RoleId, TenantId, WorkspaceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The built-in role name every workspace carries and cannot delete.
pub const WORKSPACE_ADMIN_ROLE: &str = "workspace_admin";

/// An account: a human or service identity that can hold workspace roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier.
    pub account_id: AccountId,
    /// Display name.
    pub name: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A tenancy boundary grouping projects, roles, members, and ACL rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Stable identifier.
    pub workspace_id: WorkspaceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// The role newly added members receive by default.
    pub default_member_role_id: RoleId,
    /// The account that created this workspace.
    pub created_by: AccountId,
    /// When the workspace was created.
    pub created_at: DateTime<Utc>,
}

/// A named bundle of permissions, scoped to one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Stable identifier.
    pub role_id: RoleId,
    /// Display name. Unique within a workspace, case-insensitive, trimmed.
    pub name: String,
    /// `Some("workspace_admin")` for the one built-in admin role.
    pub builtin: Option<String>,
    /// Permission strings this role grants, e.g. `"folder.read"`.
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Whether this is the workspace's built-in, undeletable admin role.
    #[must_use]
    pub fn is_workspace_admin(&self) -> bool {
        self.builtin.as_deref() == Some(WORKSPACE_ADMIN_ROLE)
    }
}

/// An account's membership in a workspace, with the role(s) it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// The member's account.
    pub account_id: AccountId,
    /// Roles held by this member within the workspace.
    pub role_ids: Vec<RoleId>,
}

/// An allow/deny/inherit tristate used when resolving folder permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclEffect {
    /// Explicitly grant the permission.
    Allow,
    /// Explicitly revoke the permission.
    Deny,
    /// Defer to the parent folder's resolved effect.
    Inherit,
}

/// A folder-scoped access rule, unioned across an actor's roles at that folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Stable identifier, derived from `(folder_id, read, write, locked)` when
    /// the caller does not supply one.
    pub rule_id: String,
    /// `None` means the rule applies at the workspace root.
    pub folder_id: Option<String>,
    /// Roles this rule applies to.
    pub role_ids: Vec<RoleId>,
    /// Read effect for matching roles at this folder.
    pub read: AclEffect,
    /// Write effect for matching roles at this folder.
    pub write: AclEffect,
    /// Whether this rule is locked against further edits.
    pub locked: bool,
}

impl AclRule {
    /// Derive a stable rule id from the rule's identity fields.
    #[must_use]
    pub fn derive_rule_id(
        folder_id: Option<&str>,
        read: AclEffect,
        write: AclEffect,
        locked: bool,
    ) -> String {
        let basis = format!("{folder_id:?}:{read:?}:{write:?}:{locked}");
        content_hash(basis.as_bytes())
    }
}

/// An API key scoped to a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceApiKey {
    /// Stable identifier.
    pub api_key_id: ApiKeyId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// SHA-256 hash of the key secret; the secret itself is never stored.
    pub key_hash: String,
    /// When the key was created.
    pub created_at: DateTime<Utc>,
    /// When the key was last used to authenticate, if ever.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the key was revoked, if it has been.
    pub revoked_at: Option<DateTime<Utc>>,
}

/// An API key scoped to the whole service rather than one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceApiKey {
    /// Stable identifier.
    pub api_key_id: ApiKeyId,
    /// SHA-256 hash of the key secret.
    pub key_hash: String,
    /// When the key was created.
    pub created_at: DateTime<Utc>,
    /// When the key was last used to authenticate, if ever.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the key was revoked, if it has been.
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Service-wide configuration settings, keyed by name.
pub type ServiceSettings = std::collections::BTreeMap<String, serde_json::Value>;

/// Abstract storage for the workspace/account/role/member/ACL/API-key domain.
///
/// All list operations return defensively cloned records: callers may freely
/// mutate the returned `Vec` without affecting the store.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Create or overwrite an account.
    async fn upsert_account(&self, account: Account) -> StorageResult<()>;
    /// Fetch an account by id.
    async fn find_account(&self, account_id: &AccountId) -> StorageResult<Option<Account>>;
    /// Remove an account.
    async fn remove_account(&self, account_id: &AccountId) -> StorageResult<()>;

    /// Create or overwrite a workspace.
    async fn upsert_workspace(&self, workspace: Workspace) -> StorageResult<()>;
    /// Fetch a workspace by id.
    async fn find_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<Option<Workspace>>;
    /// Remove a workspace.
    async fn remove_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<()>;

    /// Create or overwrite a role.
    async fn upsert_role(&self, role: Role) -> StorageResult<()>;
    /// List all roles for a workspace.
    async fn list_roles(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<Role>>;
    /// Remove a role.
    async fn remove_role(&self, workspace_id: &WorkspaceId, role_id: &RoleId) -> StorageResult<()>;

    /// Create or overwrite a member's role assignment.
    async fn upsert_member(&self, member: Member) -> StorageResult<()>;
    /// List all members of a workspace.
    async fn list_members(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<Member>>;
    /// Remove a member from a workspace.
    async fn remove_member(
        &self,
        workspace_id: &WorkspaceId,
        account_id: &AccountId,
    ) -> StorageResult<()>;

    /// Create or overwrite a folder ACL rule.
    async fn upsert_acl_rule(&self, rule: AclRule) -> StorageResult<()>;
    /// List all ACL rules for a workspace.
    async fn list_acl_rules(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<AclRule>>;
    /// Remove an ACL rule.
    async fn remove_acl_rule(&self, workspace_id: &WorkspaceId, rule_id: &str) -> StorageResult<()>;

    /// Create a workspace-scoped API key.
    async fn create_workspace_api_key(&self, key: WorkspaceApiKey) -> StorageResult<()>;
    /// List all API keys for a workspace.
    async fn list_workspace_api_keys(
        &self,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Vec<WorkspaceApiKey>>;
    /// Revoke a workspace API key.
    async fn revoke_workspace_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()>;
    /// Look up a workspace API key by its secret hash.
    async fn find_workspace_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> StorageResult<Option<WorkspaceApiKey>>;
    /// Record that a workspace API key was just used.
    async fn touch_workspace_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()>;

    /// Create a service-wide API key.
    async fn create_service_api_key(&self, key: ServiceApiKey) -> StorageResult<()>;
    /// List all service-wide API keys.
    async fn list_service_api_keys(&self) -> StorageResult<Vec<ServiceApiKey>>;
    /// Revoke a service-wide API key.
    async fn revoke_service_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()>;
    /// Look up a service-wide API key by its secret hash.
    async fn find_service_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> StorageResult<Option<ServiceApiKey>>;
    /// Record that a service API key was just used.
    async fn touch_service_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()>;

    /// Fetch the service-wide settings blob.
    async fn get_service_settings(&self) -> StorageResult<ServiceSettings>;
    /// Merge `patch` into the service-wide settings blob.
    async fn upsert_service_settings(&self, patch: ServiceSettings) -> StorageResult<()>;

    /// Resolve the folder path (root to leaf, as folder ids) a project lives
    /// under, used by `AuthorizeProjectWrite`. `None` means the project is at
    /// the workspace root.
    async fn project_folder_path(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> StorageResult<Vec<Option<String>>>;
}
