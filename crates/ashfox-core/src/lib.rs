//! Ashfox Core — shared types and error taxonomy for the modeling-tool gateway.
//!
//! This crate provides the vocabulary every other `ashfox-*` crate builds on:
//! - Newtype identifiers for tenants, workspaces, projects, accounts, and jobs
//! - The `ToolError` / `ToolResponse` envelope returned by every dispatched tool call
//! - The job-kind and tool-name registries shared by the dispatcher and worker
//! - Deterministic retry/backoff used by the pipeline store and worker loop
//! - The actor/MCP context types carried on every request

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod actor;
pub mod clock;
pub mod error;
pub mod ids;
pub mod jobs;
pub mod prelude;
pub mod retry;
pub mod tools;

pub use actor::{ActorContext, McpContext};
pub use clock::{Clock, SystemClock};
pub use error::{ErrorCode, ToolError, ToolResult, ToolResponse};
pub use ids::{AccountId, ApiKeyId, JobId, ProjectId, RoleId, TenantId, WorkspaceId};
pub use jobs::JobKind;
pub use retry::{retry_backoff, RetryConfig};
pub use tools::{ToolMeta, ToolName, TOOL_REGISTRY};
