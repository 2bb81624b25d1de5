//! Newtype identifiers shared across the gateway.
//!
//! Kept as thin string wrappers rather than UUIDs: tenant, workspace, and
//! project identifiers are caller-supplied in this system (they come from the
//! MCP session context or tool payload), not generated here.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(TenantId, "Tenant (multi-tenant owner) identifier.");
string_id!(WorkspaceId, "Workspace identifier, unique within a tenant.");
string_id!(ProjectId, "Project identifier, unique within a workspace.");
string_id!(AccountId, "Account (human or service) identifier.");
string_id!(ApiKeyId, "API key identifier.");
string_id!(RoleId, "Workspace role identifier.");
string_id!(JobId, "Native pipeline job identifier, formatted as `job-<n>`.");

impl JobId {
    /// Build the canonical `job-<n>` identifier for a pipeline job counter value.
    #[must_use]
    pub fn from_counter(n: u64) -> Self {
        Self(format!("job-{n}"))
    }
}

/// A project repository scope: `(tenantId, projectId)`.
///
/// Scope equality is `tenantId == tenantId && projectId == projectId`; two
/// scopes with the same pair always address the same persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectScope {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Project within the tenant.
    pub project_id: ProjectId,
}

impl ProjectScope {
    /// Construct a new scope.
    #[must_use]
    pub fn new(tenant_id: impl Into<TenantId>, project_id: impl Into<ProjectId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
        }
    }
}

impl From<(TenantId, ProjectId)> for ProjectScope {
    fn from((tenant_id, project_id): (TenantId, ProjectId)) -> Self {
        Self {
            tenant_id,
            project_id,
        }
    }
}
