//! The cached workspace policy service.

use ashfox_core::actor::ActorContext;
use ashfox_core::clock::{Clock, SystemClock};
use ashfox_core::ids::{AccountId, ProjectId, WorkspaceId};
use ashfox_storage::{Workspace, WorkspaceRepository};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AuthzError, AuthzResult, ForbiddenReason};
use crate::resolve::resolve_folder_permissions;
use crate::types::{Permission, WorkspaceSnapshot};

const DEFAULT_TTL_MS: i64 = 1500;

struct CacheEntry {
    snapshot: Arc<WorkspaceSnapshot>,
    expires_at: DateTime<Utc>,
}

/// Answers authorization questions against cached per-workspace snapshots.
///
/// Snapshot misses re-materialize from the repository; invalidation races
/// with an in-flight read are benign since a miss always re-fetches.
pub struct WorkspacePolicyService {
    repository: Arc<dyn WorkspaceRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: RwLock<HashMap<WorkspaceId, CacheEntry>>,
}

impl WorkspacePolicyService {
    /// Build a service over `repository`, using the real wall clock and the
    /// default 1500ms snapshot TTL.
    #[must_use]
    pub fn new(repository: Arc<dyn WorkspaceRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            ttl: Duration::milliseconds(DEFAULT_TTL_MS),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Override the clock (for deterministic tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the snapshot cache TTL.
    #[must_use]
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl = Duration::milliseconds(ttl_ms as i64);
        self
    }

    /// Drop the cached snapshot for one workspace, forcing the next lookup
    /// to re-materialize it.
    pub async fn invalidate_workspace(&self, workspace_id: &WorkspaceId) {
        self.cache.write().await.remove(workspace_id);
    }

    /// Drop every cached snapshot.
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    async fn snapshot(&self, workspace_id: &WorkspaceId) -> AuthzResult<Arc<WorkspaceSnapshot>> {
        let now = self.clock.now();
        if let Some(entry) = self.cache.read().await.get(workspace_id) {
            if entry.expires_at > now {
                return Ok(entry.snapshot.clone());
            }
        }
        self.materialize(workspace_id, now).await
    }

    async fn materialize(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> AuthzResult<Arc<WorkspaceSnapshot>> {
        let (workspace, roles, members, acl_rules) = tokio::join!(
            self.repository.find_workspace(workspace_id),
            self.repository.list_roles(workspace_id),
            self.repository.list_members(workspace_id),
            self.repository.list_acl_rules(workspace_id),
        );
        let workspace = workspace
            .map_err(|error| {
                tracing::warn!(%error, %workspace_id, "failed to load workspace for policy snapshot");
                AuthzError::WorkspaceNotFound(workspace_id.clone())
            })?
            .ok_or_else(|| AuthzError::WorkspaceNotFound(workspace_id.clone()))?;
        let roles = roles.unwrap_or_default();
        let members = members.unwrap_or_default();
        let acl_rules = acl_rules.unwrap_or_default();

        let snapshot = Arc::new(WorkspaceSnapshot::new(workspace, roles, members, acl_rules));
        self.cache.write().await.insert(
            workspace_id.clone(),
            CacheEntry {
                snapshot: snapshot.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(snapshot)
    }

    /// Derive the permission set an account holds in a workspace.
    pub async fn resolve_role_permissions(
        &self,
        workspace_id: &WorkspaceId,
        account_id: &AccountId,
    ) -> AuthzResult<BTreeSet<Permission>> {
        let snapshot = self.snapshot(workspace_id).await?;
        let held_roles = snapshot.role_ids_for(account_id);
        if held_roles.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut permissions = BTreeSet::new();
        permissions.insert(Permission::WorkspaceMember);

        if snapshot.holds_workspace_admin(&held_roles) {
            permissions.insert(Permission::WorkspaceManage);
            permissions.insert(Permission::FolderRead);
            permissions.insert(Permission::FolderWrite);
            return Ok(permissions);
        }

        let folder_perms = resolve_folder_permissions(&held_roles, &snapshot.acl_rules, &[None]);
        if folder_perms.read {
            permissions.insert(Permission::FolderRead);
        }
        if folder_perms.write {
            permissions.insert(Permission::FolderWrite);
        }
        Ok(permissions)
    }

    /// Authorize `actor` for `permission` at the workspace root. System
    /// managers bypass this check unconditionally.
    pub async fn authorize_workspace_access(
        &self,
        workspace_id: &WorkspaceId,
        actor: &ActorContext,
        permission: Permission,
    ) -> AuthzResult<Workspace> {
        let snapshot = self.snapshot(workspace_id).await?;
        if actor.is_system_manager() {
            return Ok(snapshot.workspace.clone());
        }

        let held_roles = snapshot.role_ids_for(&actor.account_id);
        if held_roles.is_empty() {
            return Err(AuthzError::Forbidden {
                reason: ForbiddenReason::ForbiddenWorkspace,
                permission: permission.as_str(),
            });
        }
        if snapshot.holds_workspace_admin(&held_roles) {
            return Ok(snapshot.workspace.clone());
        }

        let allowed = match permission {
            Permission::WorkspaceMember => true,
            Permission::WorkspaceManage => false,
            Permission::FolderRead | Permission::FolderWrite => {
                let perms = resolve_folder_permissions(&held_roles, &snapshot.acl_rules, &[None]);
                match permission {
                    Permission::FolderRead => perms.read,
                    Permission::FolderWrite => perms.write,
                    _ => unreachable!(),
                }
            }
        };

        if allowed {
            Ok(snapshot.workspace.clone())
        } else {
            let reason = match permission {
                Permission::WorkspaceManage => ForbiddenReason::ForbiddenWorkspaceManage,
                Permission::FolderRead => ForbiddenReason::ForbiddenWorkspaceFolderRead,
                Permission::FolderWrite => ForbiddenReason::ForbiddenWorkspaceFolderWrite,
                Permission::WorkspaceMember => ForbiddenReason::ForbiddenWorkspace,
            };
            Err(AuthzError::Forbidden {
                reason,
                permission: permission.as_str(),
            })
        }
    }

    /// Authorize `actor` to write to `project_id`, which lives under `folder_path`.
    pub async fn authorize_project_write(
        &self,
        workspace_id: &WorkspaceId,
        folder_path: &[Option<String>],
        _project_id: &ProjectId,
        _tool: &str,
        actor: &ActorContext,
    ) -> AuthzResult<()> {
        self.authorize_project_permission(workspace_id, folder_path, actor, Permission::FolderWrite)
            .await
    }

    /// Authorize `actor` to read `project_id`, which lives under `folder_path`.
    pub async fn authorize_project_read(
        &self,
        workspace_id: &WorkspaceId,
        folder_path: &[Option<String>],
        _project_id: &ProjectId,
        actor: &ActorContext,
    ) -> AuthzResult<()> {
        self.authorize_project_permission(workspace_id, folder_path, actor, Permission::FolderRead)
            .await
    }

    async fn authorize_project_permission(
        &self,
        workspace_id: &WorkspaceId,
        folder_path: &[Option<String>],
        actor: &ActorContext,
        permission: Permission,
    ) -> AuthzResult<()> {
        let snapshot = self.snapshot(workspace_id).await?;
        if actor.is_system_manager() {
            return Ok(());
        }

        let held_roles = snapshot.role_ids_for(&actor.account_id);
        if held_roles.is_empty() {
            return Err(AuthzError::Forbidden {
                reason: ForbiddenReason::ForbiddenWorkspace,
                permission: permission.as_str(),
            });
        }
        if snapshot.holds_workspace_admin(&held_roles) {
            return Ok(());
        }

        let perms = resolve_folder_permissions(&held_roles, &snapshot.acl_rules, folder_path);
        let allowed = match permission {
            Permission::FolderWrite => perms.write,
            Permission::FolderRead => perms.read,
            _ => unreachable!("only folder permissions are checked per-project"),
        };
        if allowed {
            return Ok(());
        }

        let reason = match permission {
            Permission::FolderWrite => ForbiddenReason::ForbiddenWorkspaceProjectWrite,
            Permission::FolderRead => ForbiddenReason::ForbiddenWorkspaceFolderRead,
            _ => unreachable!(),
        };
        Err(AuthzError::Forbidden {
            reason,
            permission: permission.as_str(),
        })
    }
}
