//! Ashfox Dispatcher — the single public entry point for every tool call.
//!
//! [`Dispatcher::handle`] validates the MCP session context, resolves the
//! backend and project, RBAC-gates mutating calls through
//! [`ashfox_policy::WorkspacePolicyService`], acquires the project lock
//! through [`ashfox_lock::ProjectLockManager`] for mutations, enforces the
//! optional `ifRevision` guard against [`ashfox_storage::ProjectRepository`],
//! and delegates to the resolved [`ashfox_backends::Backend`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod dispatcher;
mod metrics;

pub use dispatcher::Dispatcher;
pub use metrics::GuardFailureCounter;
