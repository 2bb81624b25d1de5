//! Ashfox Worker — drains the native pipeline queue through a backend.
//!
//! [`Worker::run_poll_loop`] claims at most one job per workspace per tick
//! from [`ashfox_pipeline::NativePipelineStore`], verifies the backend
//! reports the job kind's required capabilities, executes it, and completes
//! or fails the job with the backend's own error message. A separate
//! [`Worker::run_heartbeat`] task logs backend health independently; a
//! heartbeat failure never halts the job loop.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod jobs;
mod resolver;
mod run;

pub use jobs::{check_capabilities, execute, required_tools};
pub use resolver::{CachedWorkspaceIdsResolver, StaticWorkspaceIdsResolver, WorkspaceIdsResolver};
pub use run::Worker;
