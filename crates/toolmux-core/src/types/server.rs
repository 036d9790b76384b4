//! Tool-provider, model and front-end settings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a configured tool provider is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ServerTransport {
    /// Spawned subprocess speaking MCP over its standard streams
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    /// Remote endpoint reached over Streamable HTTP
    Http {
        url: String,
    },
}

/// One configured tool provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unique provider name
    pub name: String,
    /// Whether to connect at startup (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Transport details
    #[serde(flatten)]
    pub transport: ServerTransport,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    /// A provider launched as a local subprocess
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            transport: ServerTransport::Stdio {
                command: command.into(),
                args,
                env: HashMap::new(),
            },
        }
    }

    /// A provider reached over HTTP
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            transport: ServerTransport::Http { url: url.into() },
        }
    }

    /// Disable the provider
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Reasoning-service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// genai provider id (anthropic, openai, ollama, ...)
    #[serde(default = "default_model_provider")]
    pub provider: String,
    /// Model identifier as used by the provider's API
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Explicit API key; otherwise resolved from the secret stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

fn default_model_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            api_key: None,
            api_base: None,
        }
    }
}

/// Network listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenerSettings {
    /// `host:port` for binding
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Conversation history settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// History keeps at most `2 * max_turns` entries
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Seeded as entry 0 of every new conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_turns() -> usize {
    10
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_yaml() {
        let yaml = r#"
- name: jokes
  transport: http
  url: http://localhost:8090/mcp
- name: local
  transport: stdio
  command: python
  args: [server.py]
  enabled: false
"#;
        let servers: Vec<ServerConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0], ServerConfig::http("jokes", "http://localhost:8090/mcp"));
        assert!(!servers[1].enabled);
        assert!(matches!(
            &servers[1].transport,
            ServerTransport::Stdio { command, args, .. } if command == "python" && args == &["server.py"]
        ));
    }

    #[test]
    fn test_model_defaults() {
        let settings: ModelSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, ModelSettings::default());
        assert_eq!(settings.provider, "anthropic");
        assert_eq!(settings.max_tokens, 2000);
    }

    #[test]
    fn test_listener_address() {
        let listener = ListenerSettings::default();
        assert_eq!(listener.address(), "127.0.0.1:8765");
    }
}
