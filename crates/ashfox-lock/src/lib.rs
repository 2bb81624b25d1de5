//! Ashfox Lock — in-process exclusive project lock manager (C2).
//!
//! Arbitrates mutator access to a single project within one process. A lock
//! is identified by its holder's `(ownerAgentId, ownerSessionId)` pair and
//! carries an idle TTL; expired locks are pruned lazily on every acquire or
//! release. All operations are synchronous and infallible except for the
//! logical "held by someone else" outcome, which is a typed error rather
//! than a panic.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod manager;

pub use manager::{LockOwner, ProjectLock, ProjectLockError, ProjectLockManager};
