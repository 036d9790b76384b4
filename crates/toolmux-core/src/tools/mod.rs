//! Tool catalog
//!
//! Merges the tools advertised by every registered provider into one
//! namespace and keeps the routing table from tool name to provider.
//!
//! ```text
//!   provider "a" ──┐   list_tools (concurrent)
//!   provider "b" ──┼──────────────────────────► ToolCatalog
//!   provider "c" ──┘                             ├─ advertised: (Tool, provider) pairs
//!                                                └─ routes: tool name → provider
//! ```
//!
//! Provider ownership never reaches the model: [`ToolCatalog::llm_tools`]
//! returns bare [`Tool`](crate::types::Tool) schemas.

mod catalog;

pub use catalog::{CatalogEntry, CollisionPolicy, ToolCatalog, ToolFilter};
