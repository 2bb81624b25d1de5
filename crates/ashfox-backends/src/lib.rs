//! Ashfox Backends — the immutable, kind-addressed backend registry.
//!
//! A [`Backend`] is a pluggable modeling-tool implementation (native pipeline,
//! an external DCC bridge, …); the [`BackendRegistry`] resolves a tool call's
//! requested `kind` (or a configured default) to one, and is built once at
//! startup and never mutated afterward.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod registry;

pub use backend::{Availability, Backend, BackendHealth, BackendSession};
pub use registry::{BackendRegistry, BackendRegistryBuilder};
