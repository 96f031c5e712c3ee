//! Configuration types for the insurance agent mesh.
//!
//! Configuration is loaded from a single YAML file (`mesh.yaml` by default,
//! or the path in `MESH_CONFIG`). Every section is optional.
//!
//! ```yaml
//! agents:
//!   - id: policy
//!     endpoint: http://localhost:7871/
//! resolver:
//!   min_confidence: 0.3
//! pipeline:
//!   max_attempts: 3
//!   call_timeout_ms: 5000
//!   merge: concatenate
//! ```

pub mod pipeline;
pub mod server;

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use pipeline::{MergeStrategy, PipelineConfig, ResolverConfig};
pub use server::{AgentEndpoint, ServerConfig};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MESH_CONFIG";

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mesh.yaml";

/// Complete mesh configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Remote agents joined into the catalog at startup.
    #[serde(default)]
    pub agents: Vec<AgentEndpoint>,

    /// Intent resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Pipeline retry, deadline and merge settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Agent server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Descriptor cache lifetime. Absent means cache until invalidated.
    #[serde(default)]
    pub descriptor_ttl_secs: Option<u64>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MeshConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `MESH_CONFIG`, then `mesh.yaml`, else fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }

    /// The four insurance agents on their conventional local ports.
    pub fn demo() -> Self {
        let agents = [
            ("policy", 7871),
            ("claims", 7872),
            ("underwriting", 7873),
            ("customer", 7874),
        ]
        .into_iter()
        .map(|(id, port)| AgentEndpoint {
            id: id.to_string(),
            endpoint: format!("http://localhost:{}/", port),
        })
        .collect();

        Self {
            agents,
            ..Self::default()
        }
    }

    pub fn descriptor_ttl(&self) -> Option<Duration> {
        self.descriptor_ttl_secs.map(Duration::from_secs)
    }

    /// Find the configured endpoint for an agent id.
    pub fn agent(&self, id: &str) -> Option<&AgentEndpoint> {
        self.agents.iter().find(|a| a.id == id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.resolver.min_confidence) {
            return Err(ConfigError::Config(format!(
                "resolver.min_confidence must be within 0..1, got {}",
                self.resolver.min_confidence
            )));
        }
        if self.pipeline.max_attempts == 0 {
            return Err(ConfigError::Config(
                "pipeline.max_attempts must be at least 1".to_string(),
            ));
        }
        for agent in &self.agents {
            if agent.id.contains('.') {
                return Err(ConfigError::Config(format!(
                    "agent id '{}' must not contain '.'",
                    agent.id
                )));
            }
        }
        Ok(())
    }
}
