//! Authorization outcomes.

use ashfox_core::ids::WorkspaceId;

/// A denial reason, carried verbatim into the dispatcher's `details.reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The actor holds no role at all in the workspace.
    ForbiddenWorkspace,
    /// The actor's resolved folder permissions deny `workspace.manage`.
    ForbiddenWorkspaceManage,
    /// The actor's resolved folder permissions deny write at the project's folder.
    ForbiddenWorkspaceFolderWrite,
    /// The actor's resolved folder permissions deny read at the project's folder.
    ForbiddenWorkspaceFolderRead,
    /// The project's folder permits folder write but the tool targets a
    /// project the actor has no specific write grant over.
    ForbiddenWorkspaceProjectWrite,
}

impl ForbiddenReason {
    /// Stable wire string, used as `details.reason` in the dispatcher's error envelope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForbiddenWorkspace => "forbidden_workspace",
            Self::ForbiddenWorkspaceManage => "forbidden_workspace_manage",
            Self::ForbiddenWorkspaceFolderWrite => "forbidden_workspace_folder_write",
            Self::ForbiddenWorkspaceFolderRead => "forbidden_workspace_folder_read",
            Self::ForbiddenWorkspaceProjectWrite => "forbidden_workspace_project_write",
        }
    }
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The workspace does not exist.
    #[error("workspace not found: {0:?}")]
    WorkspaceNotFound(WorkspaceId),
    /// The actor lacks the requested permission.
    #[error("forbidden: {reason:?} (permission={permission})")]
    Forbidden {
        /// Machine-readable denial reason.
        reason: ForbiddenReason,
        /// The permission that was denied.
        permission: &'static str,
    },
}

/// Result type for authorization checks.
pub type AuthzResult<T> = Result<T, AuthzError>;
