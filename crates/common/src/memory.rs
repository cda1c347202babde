//! In-memory collaborator implementations.
//!
//! These stand in for the remote access, directory and role-registry
//! services in tests and local development. Each one can be given an
//! artificial per-call latency to widen interleavings between concurrent
//! requests, and counts the calls it serves.

mod call_recorder;
mod in_memory_access_service;
mod in_memory_directory_service;
mod in_memory_role_registry;

pub use call_recorder::*;
pub use in_memory_access_service::*;
pub use in_memory_directory_service::*;
pub use in_memory_role_registry::*;
