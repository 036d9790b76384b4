//! Reasoning service boundary
//!
//! The language model is an external collaborator: it receives the
//! conversation and the tool schemas, and streams back text and tool
//! calls. [`ReasoningService`] is the seam; [`GenaiReasoner`] talks to
//! real model APIs through the `genai` crate and [`MockReasoner`] plays
//! back scripted replies for tests and offline runs.
//!
//! Auth for the real service flows through the [`SecretStore`](crate::secrets::SecretStore)
//! chain, not genai's own environment lookup.

mod traits;
mod error;
mod genai_adapter;
mod genai_reasoner;
mod mock;

pub use traits::{collect_blocks, ChatOptions, ReasoningService, StreamResponse};
pub use error::{ReasoningError, ReasoningResult};
pub use genai_reasoner::GenaiReasoner;
pub use genai_adapter::is_genai_supported;
pub use mock::{MockMode, MockReasoner, RecordedRequest};

use std::sync::Arc;

use crate::logging::Logger;
use crate::secrets::SecretStore;
use crate::types::ModelSettings;

/// Create the reasoning service named by `settings.provider`
///
/// `mock` gives an echoing [`MockReasoner`]; every other id goes through
/// [`GenaiReasoner`].
pub fn create_reasoner(
    settings: &ModelSettings,
    secrets: Arc<dyn SecretStore>,
    logger: Arc<dyn Logger>,
) -> ReasoningResult<Arc<dyn ReasoningService>> {
    match settings.provider.to_lowercase().as_str() {
        "mock" => Ok(Arc::new(MockReasoner::echo(logger))),
        _ => Ok(Arc::new(GenaiReasoner::new(settings.clone(), secrets, logger)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_create_reasoner() {
        let secrets: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
        let mock = ModelSettings {
            provider: "mock".into(),
            ..ModelSettings::default()
        };

        let reasoner = create_reasoner(&mock, secrets.clone(), Arc::new(NoOpLogger)).unwrap();
        assert_eq!(reasoner.name(), "mock");

        let reasoner = create_reasoner(&ModelSettings::default(), secrets, Arc::new(NoOpLogger)).unwrap();
        assert_eq!(reasoner.name(), "anthropic");
    }
}
