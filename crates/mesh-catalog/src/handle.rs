//! The agent handle seam and its in-process implementation.

use async_trait::async_trait;
use mesh_core::{ActionDescriptor, ActionOutput, Arguments, MeshError};
use mesh_registry::ActionRegistry;
use std::sync::Arc;

/// One agent as seen by the mesh.
///
/// Implementations must keep transport failures (`AgentUnreachable`) distinct
/// from the agent's own semantic errors so callers can decide what to retry.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    /// Logical agent id; qualifies action names.
    fn id(&self) -> &str;

    /// The agent's descriptors, in the agent's registration order.
    async fn describe(&self) -> Result<Vec<ActionDescriptor>, MeshError>;

    /// Invoke a bare action name on this agent.
    async fn invoke(&self, action: &str, args: &Arguments) -> Result<ActionOutput, MeshError>;

    /// Drop any cached descriptors so the next `describe` re-pulls them.
    async fn invalidate(&self) {}
}

/// An agent whose registry lives in this process.
pub struct LocalAgent {
    id: String,
    registry: Arc<ActionRegistry>,
}

impl LocalAgent {
    /// Wrap a registry, using its name as the agent id.
    pub fn new(registry: ActionRegistry) -> Self {
        Self {
            id: registry.name().to_string(),
            registry: Arc::new(registry),
        }
    }

    /// Wrap a registry under a different agent id.
    pub fn with_id(id: impl Into<String>, registry: ActionRegistry) -> Self {
        Self {
            id: id.into(),
            registry: Arc::new(registry),
        }
    }
}

#[async_trait]
impl AgentHandle for LocalAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn describe(&self) -> Result<Vec<ActionDescriptor>, MeshError> {
        Ok(self.registry.describe())
    }

    async fn invoke(&self, action: &str, args: &Arguments) -> Result<ActionOutput, MeshError> {
        self.registry.invoke(action, args)
    }
}
