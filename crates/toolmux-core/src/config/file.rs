//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolmux/config.yaml) and workspace-level
//! (.config/toolmux/config.yaml) config, or any explicit path.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::tools::CollisionPolicy;
use crate::types::{ConversationSettings, ListenerSettings, ModelSettings, ServerConfig};
use super::traits::{
    delete_server, insert_server, replace_server, ConfigProvider, ConfigResult,
};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    /// Tool providers, in registration order
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Reasoning-service settings
    #[serde(default)]
    pub model: ModelSettings,

    /// History bounds
    #[serde(default)]
    pub conversation: ConversationSettings,

    /// Network front end
    #[serde(default)]
    pub listener: ListenerSettings,

    /// Which tools are shown to the model
    #[serde(default)]
    pub tools: ToolFilterSettings,

    /// How duplicate tool names across providers are resolved
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Include/exclude lists applied to the model-facing tool list
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ToolFilterSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Config level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// ~/.config/toolmux/config.yaml
    User,
    /// .config/toolmux/config.yaml under a workspace root
    Workspace,
    /// A path given on the command line
    Explicit,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Explicit => "explicit",
        }
    }
}

/// File-based configuration provider
///
/// # Example
///
/// ```no_run
/// use toolmux_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/toolmux/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolmux").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config provider (.config/toolmux/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("toolmux").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// Workspace file if one exists under the current directory, else the user file
    pub fn discover() -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            let workspace = Self::workspace(cwd);
            if workspace.exists() {
                return workspace;
            }
        }
        Self::user()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Cached or freshly loaded config
    pub fn get_config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }

        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Apply an edit to the whole file and persist it
    pub fn update(&self, edit: impl FnOnce(&mut ConfigFile)) -> ConfigResult<()> {
        let mut config = self.get_config()?;
        edit(&mut config);
        self.save(&config)
    }

    /// Copy the current file next to itself with a `.backup` suffix
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    fn edit_servers(&self, edit: impl FnOnce(&mut Vec<ServerConfig>) -> ConfigResult<()>) -> ConfigResult<()> {
        let mut config = self.get_config()?;
        edit(&mut config.servers)?;
        self.save(&config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn get_servers(&self) -> Vec<ServerConfig> {
        self.get_config().map(|c| c.servers).unwrap_or_default()
    }

    async fn update_server(&self, name: &str, config: ServerConfig) -> ConfigResult<()> {
        self.edit_servers(|servers| replace_server(servers, name, config))
    }

    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()> {
        self.edit_servers(|servers| insert_server(servers, config))
    }

    async fn remove_server(&self, name: &str) -> ConfigResult<()> {
        self.edit_servers(|servers| delete_server(servers, name))
    }
}
