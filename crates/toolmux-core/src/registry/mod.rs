//! Provider registry
//!
//! Owns every tool-provider connection and its lifecycle: connect,
//! list, invoke, disconnect. Two transports sit behind the
//! [`ToolProvider`] seam:
//!
//! - [`LocalProvider`]: a spawned child process holding one persistent
//!   MCP session over its standard streams
//! - [`RemoteProvider`]: an HTTP endpoint; every operation opens,
//!   uses and closes its own short-lived session
//!
//! Results keep their transport shape in [`ToolOutcome`] until
//! [`ToolOutcome::normalize`] reduces them to text.

mod error;
mod outcome;
mod provider;
mod registry;

pub use error::{ConnectError, InvokeError, NoProvidersError};
pub use outcome::ToolOutcome;
pub use provider::{LocalProvider, ProviderKind, RemoteProvider, ToolProvider};
pub use registry::{Liveness, ProviderConnection, ProviderRegistry, ProviderSummary};

#[cfg(test)]
pub(crate) use registry::testing;
