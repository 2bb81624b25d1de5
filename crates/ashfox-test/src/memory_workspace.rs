//! An in-memory `WorkspaceRepository`.

use ashfox_core::ids::{AccountId, ApiKeyId, ProjectId, RoleId, WorkspaceId};
use ashfox_storage::workspace::{
    Account, AclRule, Member, Role, ServiceApiKey, ServiceSettings, Workspace, WorkspaceApiKey,
    WorkspaceRepository,
};
use ashfox_storage::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    accounts: BTreeMap<String, Account>,
    workspaces: BTreeMap<String, Workspace>,
    roles: BTreeMap<String, BTreeMap<String, Role>>,
    members: BTreeMap<String, BTreeMap<String, Member>>,
    acl_rules: BTreeMap<String, BTreeMap<String, AclRule>>,
    workspace_api_keys: BTreeMap<String, WorkspaceApiKey>,
    service_api_keys: BTreeMap<String, ServiceApiKey>,
    service_settings: ServiceSettings,
    project_folder_paths: BTreeMap<(String, String), Vec<Option<String>>>,
}

/// An in-memory implementation of [`WorkspaceRepository`], suitable for unit
/// and integration tests of the policy service and dispatcher.
#[derive(Default)]
pub struct InMemoryWorkspaceRepository {
    state: Mutex<State>,
}

impl InMemoryWorkspaceRepository {
    /// An empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the folder path a project lives under, for
    /// [`WorkspaceRepository::project_folder_path`].
    pub fn set_project_folder_path(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
        path: Vec<Option<String>>,
    ) {
        let mut state = self.state.lock().expect(LOCK_POISONED);
        state
            .project_folder_paths
            .insert((workspace_id.as_str().to_string(), project_id.as_str().to_string()), path);
    }
}

const LOCK_POISONED: &str = "in-memory workspace repository mutex poisoned";

fn poison<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Internal(LOCK_POISONED.to_string())
}

#[async_trait]
impl WorkspaceRepository for InMemoryWorkspaceRepository {
    async fn upsert_account(&self, account: Account) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state.accounts.insert(account.account_id.as_str().to_string(), account);
        Ok(())
    }

    async fn find_account(&self, account_id: &AccountId) -> StorageResult<Option<Account>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state.accounts.get(account_id.as_str()).cloned())
    }

    async fn remove_account(&self, account_id: &AccountId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state.accounts.remove(account_id.as_str());
        Ok(())
    }

    async fn upsert_workspace(&self, workspace: Workspace) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state
            .workspaces
            .insert(workspace.workspace_id.as_str().to_string(), workspace);
        Ok(())
    }

    async fn find_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<Option<Workspace>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state.workspaces.get(workspace_id.as_str()).cloned())
    }

    async fn remove_workspace(&self, workspace_id: &WorkspaceId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state.workspaces.remove(workspace_id.as_str());
        Ok(())
    }

    async fn upsert_role(&self, role: Role) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state
            .roles
            .entry(role.workspace_id.as_str().to_string())
            .or_default()
            .insert(role.role_id.as_str().to_string(), role);
        Ok(())
    }

    async fn list_roles(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<Role>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .roles
            .get(workspace_id.as_str())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_role(&self, workspace_id: &WorkspaceId, role_id: &RoleId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(roles) = state.roles.get_mut(workspace_id.as_str()) {
            roles.remove(role_id.as_str());
        }
        Ok(())
    }

    async fn upsert_member(&self, member: Member) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state
            .members
            .entry(member.workspace_id.as_str().to_string())
            .or_default()
            .insert(member.account_id.as_str().to_string(), member);
        Ok(())
    }

    async fn list_members(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<Member>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .members
            .get(workspace_id.as_str())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_member(
        &self,
        workspace_id: &WorkspaceId,
        account_id: &AccountId,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(members) = state.members.get_mut(workspace_id.as_str()) {
            members.remove(account_id.as_str());
        }
        Ok(())
    }

    async fn upsert_acl_rule(&self, rule: AclRule) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state
            .acl_rules
            .entry(rule.workspace_id.as_str().to_string())
            .or_default()
            .insert(rule.rule_id.clone(), rule);
        Ok(())
    }

    async fn list_acl_rules(&self, workspace_id: &WorkspaceId) -> StorageResult<Vec<AclRule>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .acl_rules
            .get(workspace_id.as_str())
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_acl_rule(&self, workspace_id: &WorkspaceId, rule_id: &str) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(rules) = state.acl_rules.get_mut(workspace_id.as_str()) {
            rules.remove(rule_id);
        }
        Ok(())
    }

    async fn create_workspace_api_key(&self, key: WorkspaceApiKey) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state
            .workspace_api_keys
            .insert(key.api_key_id.as_str().to_string(), key);
        Ok(())
    }

    async fn list_workspace_api_keys(
        &self,
        workspace_id: &WorkspaceId,
    ) -> StorageResult<Vec<WorkspaceApiKey>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .workspace_api_keys
            .values()
            .filter(|k| &k.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn revoke_workspace_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(key) = state.workspace_api_keys.get_mut(api_key_id.as_str()) {
            key.revoked_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn find_workspace_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> StorageResult<Option<WorkspaceApiKey>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .workspace_api_keys
            .values()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn touch_workspace_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(key) = state.workspace_api_keys.get_mut(api_key_id.as_str()) {
            key.last_used_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn create_service_api_key(&self, key: ServiceApiKey) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state.service_api_keys.insert(key.api_key_id.as_str().to_string(), key);
        Ok(())
    }

    async fn list_service_api_keys(&self) -> StorageResult<Vec<ServiceApiKey>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state.service_api_keys.values().cloned().collect())
    }

    async fn revoke_service_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(key) = state.service_api_keys.get_mut(api_key_id.as_str()) {
            key.revoked_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn find_service_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> StorageResult<Option<ServiceApiKey>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .service_api_keys
            .values()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn touch_service_api_key(&self, api_key_id: &ApiKeyId) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        if let Some(key) = state.service_api_keys.get_mut(api_key_id.as_str()) {
            key.last_used_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn get_service_settings(&self) -> StorageResult<ServiceSettings> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state.service_settings.clone())
    }

    async fn upsert_service_settings(&self, patch: ServiceSettings) -> StorageResult<()> {
        let mut state = self.state.lock().map_err(poison)?;
        state.service_settings.extend(patch);
        Ok(())
    }

    async fn project_folder_path(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> StorageResult<Vec<Option<String>>> {
        let state = self.state.lock().map_err(poison)?;
        Ok(state
            .project_folder_paths
            .get(&(workspace_id.as_str().to_string(), project_id.as_str().to_string()))
            .cloned()
            .unwrap_or_else(|| vec![None]))
    }
}
