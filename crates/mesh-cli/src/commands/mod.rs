//! CLI command implementations for the `mesh` binary.

pub mod demo;
pub mod query;
pub mod serve;

use anyhow::{Context, Result};
use mesh_catalog::LocalAgent;
use mesh_core::MeshConfig;
use mesh_runtime::Mesh;
use mesh_services::{ServiceContext, all_registries};
use std::path::Path;
use std::sync::Arc;

/// Load `path`, or fall back to `MESH_CONFIG` / `mesh.yaml` / defaults.
pub fn load_config(path: Option<&Path>) -> Result<MeshConfig> {
    match path {
        Some(path) => MeshConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => MeshConfig::load().context("Failed to load configuration"),
    }
}

/// Build the mesh: in-process agents with `local`, otherwise the configured
/// endpoints (the four conventional local ports when none are configured).
pub async fn connect(mut config: MeshConfig, local: bool) -> Result<Mesh> {
    if local {
        let mesh = Mesh::new(config);
        let registries = all_registries(&ServiceContext::default())
            .context("Failed to build the insurance agents")?;
        for registry in registries {
            mesh.add_agent(Arc::new(LocalAgent::new(registry))).await?;
        }
        return Ok(mesh);
    }

    if config.agents.is_empty() {
        config.agents = MeshConfig::demo().agents;
    }
    let mesh = Mesh::new(config);
    let actions = mesh.connect_configured().await.context(
        "Failed to connect to an agent (start it with `mesh serve <service>` or pass --local)",
    )?;
    tracing::info!(
        agents = mesh.config().agents.len(),
        actions,
        "Mesh initialized"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "agents:\n  - id: policy\n    endpoint: http://10.0.0.5:7871/\npipeline:\n  max_attempts: 5"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.pipeline.max_attempts, 5);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/mesh.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[tokio::test]
    async fn local_mesh_has_every_action() {
        let mesh = connect(MeshConfig::default(), true).await.unwrap();
        assert_eq!(mesh.list_actions().await.len(), 30);
    }
}
