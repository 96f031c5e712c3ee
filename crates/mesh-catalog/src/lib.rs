//! # mesh-catalog
//!
//! Agents as the mesh sees them, and the catalog that joins them into one
//! namespace.
//!
//! An [`AgentHandle`] is either an [`HttpAgent`] talking JSON-RPC to a remote
//! agent server or a [`LocalAgent`] wrapping an in-process registry. The
//! [`AgentCatalog`] qualifies every action with its owning agent
//! (`claims.submitClaim`) so bare names that collide stay addressable.

pub mod catalog;
pub mod handle;
pub mod http_agent;
pub mod index;

pub use catalog::{AgentCatalog, AgentStats};
pub use handle::{AgentHandle, LocalAgent};
pub use http_agent::HttpAgent;
pub use index::{AgentEntry, AgentStatus, CatalogEntry, CatalogIndex};
