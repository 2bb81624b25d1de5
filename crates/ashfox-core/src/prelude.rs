//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ashfox_core::prelude::*;` to import the vocabulary shared by the
//! dispatcher, worker, lock manager, and pipeline store.

// Errors and response envelope
pub use crate::{ErrorCode, ToolError, ToolResponse, ToolResult};

// Identifiers
pub use crate::{AccountId, ApiKeyId, JobId, ProjectId, RoleId, TenantId, WorkspaceId};
pub use crate::ids::ProjectScope;

// Actor / MCP context
pub use crate::{ActorContext, McpContext};

// Jobs
pub use crate::JobKind;

// Tool registry
pub use crate::{ToolMeta, ToolName, TOOL_REGISTRY};

// Retry utilities
pub use crate::{retry_backoff, RetryConfig};
