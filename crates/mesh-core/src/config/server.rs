//! Agent endpoint and agent server configuration.

use serde::{Deserialize, Serialize};

/// A remote agent the mesh connects to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentEndpoint {
    /// Logical agent id; qualifies action names (`policy.createPolicy`).
    pub id: String,
    /// Base URL of the agent server, e.g. `http://localhost:7871/`.
    pub endpoint: String,
}

/// Bind settings for `mesh serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7871
}
