//! `mesh serve` - run one insurance agent as a JSON-RPC server.

use anyhow::{Context, Result};
use mesh_core::{MeshConfig, ServerConfig};
use mesh_registry::AgentServer;
use mesh_services::{Service, ServiceContext};

pub async fn run(
    service: Service,
    host: Option<String>,
    port: Option<u16>,
    config: MeshConfig,
) -> Result<()> {
    let registry = service
        .registry(&ServiceContext::default())
        .with_context(|| format!("Failed to build the {service} agent"))?;

    let server_config = ServerConfig {
        host: host.unwrap_or(config.server.host),
        port: port.unwrap_or_else(|| service.default_port()),
    };
    tracing::info!(agent = %service, addr = %server_config.bind_addr(), "Starting agent");

    AgentServer::new(registry, server_config)
        .run()
        .await
        .with_context(|| format!("{service} agent server failed"))
}
