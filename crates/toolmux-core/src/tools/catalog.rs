//! Tool aggregation and routing

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ToolFilterSettings;
use crate::logging::Logger;
use crate::registry::{NoProvidersError, ProviderRegistry};
use crate::types::Tool;

/// What happens when two providers advertise the same tool name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Calls go to the last provider registered, the model sees the first schema
    #[default]
    RouteLastAdvertiseFirst,
    /// First provider wins for both routing and schema
    FirstRegistered,
    /// Last provider wins for both routing and schema
    LastRegistered,
}

/// A tool paired with the provider that advertised it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub tool: Tool,
    pub provider: String,
}

/// Filter for the model-facing tool list
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    /// If set, only include tools with these names
    pub include: Option<HashSet<String>>,
    /// Exclude tools with these names
    pub exclude: HashSet<String>,
}

impl ToolFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include only specific tools
    pub fn with_include(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.include = Some(names.into_iter().collect());
        self
    }

    /// Exclude specific tools
    pub fn with_exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude = names.into_iter().collect();
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.contains(name) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(name),
            None => true,
        }
    }
}

impl From<&ToolFilterSettings> for ToolFilter {
    fn from(settings: &ToolFilterSettings) -> Self {
        let filter = ToolFilter::new().with_exclude(settings.exclude.iter().cloned());
        match &settings.include {
            Some(include) => filter.with_include(include.iter().cloned()),
            None => filter,
        }
    }
}

#[derive(Default)]
struct CatalogState {
    advertised: Vec<CatalogEntry>,
    routes: HashMap<String, String>,
}

/// Merged view of every provider's tools
pub struct ToolCatalog {
    registry: Arc<ProviderRegistry>,
    policy: CollisionPolicy,
    filter: ToolFilter,
    state: RwLock<CatalogState>,
    refresh_lock: Mutex<()>,
    logger: Arc<dyn Logger>,
}

impl ToolCatalog {
    pub fn new(registry: Arc<ProviderRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self {
            registry,
            policy: CollisionPolicy::default(),
            filter: ToolFilter::new(),
            state: RwLock::new(CatalogState::default()),
            refresh_lock: Mutex::new(()),
            logger,
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_filter(mut self, filter: ToolFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Re-list every live provider and rebuild the advertised list and routes.
    ///
    /// Providers are queried concurrently; one that fails contributes no
    /// tools. Concurrent refreshes run one at a time.
    pub async fn refresh(&self) -> Vec<CatalogEntry> {
        let _guard = self.refresh_lock.lock().await;

        let providers = self.registry.live_names();
        let listed = join_all(providers.iter().map(|name| self.registry.list_tools(name))).await;

        let mut state = CatalogState::default();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (provider, tools) in providers.iter().zip(listed) {
            for tool in tools {
                let Some(&position) = positions.get(&tool.name) else {
                    positions.insert(tool.name.clone(), state.advertised.len());
                    state.routes.insert(tool.name.clone(), provider.clone());
                    state.advertised.push(CatalogEntry {
                        tool,
                        provider: provider.clone(),
                    });
                    continue;
                };

                self.logger.debug(&format!(
                    "[ToolCatalog] '{}' also advertised by '{}'",
                    tool.name, provider
                ));
                match self.policy {
                    CollisionPolicy::RouteLastAdvertiseFirst => {
                        state.routes.insert(tool.name, provider.clone());
                    }
                    CollisionPolicy::FirstRegistered => {}
                    CollisionPolicy::LastRegistered => {
                        state.routes.insert(tool.name.clone(), provider.clone());
                        state.advertised[position] = CatalogEntry {
                            tool,
                            provider: provider.clone(),
                        };
                    }
                }
            }
        }

        self.logger.info(&format!(
            "[ToolCatalog] {} tools from {} providers",
            state.advertised.len(),
            providers.len()
        ));

        let advertised = state.advertised.clone();
        *self.state.write() = state;
        advertised
    }

    /// Provider that should receive a call to `tool`.
    ///
    /// Falls back to `preferred`, then the first live provider, then the
    /// first registered one.
    pub fn resolve(&self, tool: &str, preferred: Option<&str>) -> Result<String, NoProvidersError> {
        if self.registry.is_empty() {
            return Err(NoProvidersError);
        }
        if let Some(provider) = self.state.read().routes.get(tool) {
            return Ok(provider.clone());
        }
        if let Some(preferred) = preferred {
            return Ok(preferred.to_string());
        }
        self.registry
            .live_names()
            .into_iter()
            .next()
            .or_else(|| self.registry.names().into_iter().next())
            .ok_or(NoProvidersError)
    }

    /// Tool schemas for the model, without provider ownership
    pub fn llm_tools(&self) -> Vec<Tool> {
        self.state
            .read()
            .advertised
            .iter()
            .filter(|e| self.filter.matches(&e.tool.name))
            .map(|e| e.tool.clone())
            .collect()
    }

    /// Advertised entries from the last refresh
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.state.read().advertised.clone()
    }

    pub fn tool_count(&self) -> usize {
        self.state.read().advertised.len()
    }
}
