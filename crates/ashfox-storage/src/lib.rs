//! Ashfox Storage — persistence ports for the modeling-tool gateway.
//!
//! This crate defines the abstract interfaces every other `ashfox-*` crate
//! programs against: [`project::ProjectRepository`] (scoped project state
//! with an optional CAS revision guard), [`workspace::WorkspaceRepository`]
//! (accounts, workspaces, roles, members, ACL rules, API keys), and
//! [`blob::BlobStore`] (bucketed byte blobs for export artifacts).
//!
//! In-memory implementations of these ports live in `ashfox-test`, which the
//! dispatcher, lock manager, and pipeline store all depend on for their own
//! test suites.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod blob;
pub mod error;
pub mod project;
pub mod revision;
pub mod workspace;

pub use blob::{BlobPointer, BlobRead, BlobStore};
pub use error::{StorageError, StorageResult};
pub use project::{PersistedProjectRecord, ProjectRepository};
pub use revision::{content_hash, content_hash_of};
pub use workspace::{
    Account, AclEffect, AclRule, Member, Role, ServiceApiKey, ServiceSettings, Workspace,
    WorkspaceApiKey, WorkspaceRepository, WORKSPACE_ADMIN_ROLE,
};
