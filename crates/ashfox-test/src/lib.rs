//! Ashfox Test — in-memory persistence ports and deterministic clock seams.
//!
//! This crate provides the C9 test harness: in-memory implementations of the
//! `ashfox-storage` ports ([`InMemoryProjectRepository`],
//! [`InMemoryWorkspaceRepository`], [`InMemoryBlobStore`]) plus an injectable
//! [`Clock`] so the project lock manager and pipeline store can be driven by
//! tests without sleeping on real TTLs.
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! ashfox-test = { path = "../ashfox-test" }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod fixtures;
pub mod memory_blob;
pub mod memory_project;
pub mod memory_workspace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fixtures::*;
pub use memory_blob::InMemoryBlobStore;
pub use memory_project::InMemoryProjectRepository;
pub use memory_workspace::InMemoryWorkspaceRepository;
