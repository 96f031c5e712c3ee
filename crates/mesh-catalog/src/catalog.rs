//! Agent catalog: many agents, one addressable namespace.

use crate::handle::AgentHandle;
use crate::index::{AgentEntry, AgentStatus, CatalogEntry, CatalogIndex};
use mesh_core::{ActionOutput, Arguments, MeshError, QualifiedName};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-agent invocation history. Survives `mark_unavailable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStats {
    pub invocations: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

/// Aggregates agent handles under qualified action names.
///
/// Readers take the current [`CatalogIndex`] snapshot and never block
/// writers for longer than a pointer swap.
#[derive(Default)]
pub struct AgentCatalog {
    index: RwLock<Arc<CatalogIndex>>,
    stats: RwLock<HashMap<String, AgentStats>>,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current index.
    pub async fn snapshot(&self) -> Arc<CatalogIndex> {
        self.index.read().await.clone()
    }

    /// Register an agent, pulling its descriptors once.
    ///
    /// Nothing is registered if the handshake fails.
    pub async fn add_agent(
        &self,
        handle: Arc<dyn AgentHandle>,
    ) -> Result<Vec<QualifiedName>, MeshError> {
        let id = handle.id().to_string();
        if self.snapshot().await.contains_agent(&id) {
            return Err(MeshError::DuplicateAgent { id });
        }

        let descriptors = handle.describe().await.map_err(|e| match e {
            MeshError::AgentUnreachable { .. } => e,
            other => MeshError::unreachable(&id, format!("handshake failed: {other}")),
        })?;

        let mut seen = HashSet::new();
        for d in &descriptors {
            if !seen.insert(d.name.as_str()) {
                return Err(MeshError::DuplicateAction {
                    name: QualifiedName::new(&id, &d.name).to_string(),
                });
            }
        }

        let added: Vec<QualifiedName> = descriptors
            .iter()
            .map(|d| QualifiedName::new(&id, &d.name))
            .collect();

        {
            let mut index = self.index.write().await;
            // Re-check under the write lock; another add may have raced us.
            if index.contains_agent(&id) {
                return Err(MeshError::DuplicateAgent { id });
            }
            let mut agents = index.agents().to_vec();
            agents.push(AgentEntry {
                handle,
                descriptors,
                status: AgentStatus::Available,
            });
            *index = Arc::new(CatalogIndex::build(agents));
        }

        self.stats
            .write()
            .await
            .insert(id.clone(), AgentStats::default());

        tracing::info!(agent = %id, actions = added.len(), "Agent registered");
        Ok(added)
    }

    /// Drop an agent and all of its qualified entries.
    pub async fn remove_agent(&self, id: &str) -> Result<(), MeshError> {
        {
            let mut index = self.index.write().await;
            if !index.contains_agent(id) {
                return Err(MeshError::UnknownAgent { id: id.to_string() });
            }
            let agents = index
                .agents()
                .iter()
                .filter(|a| a.id() != id)
                .cloned()
                .collect();
            *index = Arc::new(CatalogIndex::build(agents));
        }
        self.stats.write().await.remove(id);

        tracing::info!(agent = %id, "Agent removed");
        Ok(())
    }

    /// Every qualified action, including those of unavailable agents.
    pub async fn list_actions(&self) -> Vec<CatalogEntry> {
        self.snapshot().await.entries()
    }

    /// Resolve a bare or qualified action name.
    pub async fn resolve_name(&self, name: &str) -> Result<CatalogEntry, MeshError> {
        self.snapshot().await.resolve_name(name)
    }

    /// Invoke a qualified action on its owning agent.
    ///
    /// An agent removed since the caller resolved the name is unreachable.
    pub async fn invoke(
        &self,
        action: &QualifiedName,
        args: &Arguments,
    ) -> Result<ActionOutput, MeshError> {
        let handle = {
            let index = self.snapshot().await;
            let agent = index.agent(&action.agent).ok_or_else(|| {
                MeshError::unreachable(&action.agent, "agent is no longer in the catalog")
            })?;
            if !agent.descriptors.iter().any(|d| d.name == action.action) {
                return Err(MeshError::UnknownAction {
                    name: action.to_string(),
                });
            }
            agent.handle.clone()
        };

        let result = handle.invoke(&action.action, args).await;
        self.record(&action.agent, result.as_ref().err()).await;
        result
    }

    /// Re-pull an agent's descriptors and mark it available again.
    pub async fn refresh_agent(&self, id: &str) -> Result<usize, MeshError> {
        let handle = self
            .snapshot()
            .await
            .agent(id)
            .map(|a| a.handle.clone())
            .ok_or_else(|| MeshError::UnknownAgent { id: id.to_string() })?;

        handle.invalidate().await;
        let descriptors = handle.describe().await?;
        let count = descriptors.len();

        let mut index = self.index.write().await;
        if !index.contains_agent(id) {
            return Err(MeshError::UnknownAgent { id: id.to_string() });
        }
        let agents = index
            .agents()
            .iter()
            .map(|a| {
                if a.id() == id {
                    AgentEntry {
                        handle: a.handle.clone(),
                        descriptors: descriptors.clone(),
                        status: AgentStatus::Available,
                    }
                } else {
                    a.clone()
                }
            })
            .collect();
        *index = Arc::new(CatalogIndex::build(agents));

        tracing::info!(agent = %id, actions = count, "Agent refreshed");
        Ok(count)
    }

    /// Take an agent out of resolution without forgetting it.
    pub async fn mark_unavailable(&self, id: &str, reason: &str) -> Result<(), MeshError> {
        {
            let mut index = self.index.write().await;
            if !index.contains_agent(id) {
                return Err(MeshError::UnknownAgent { id: id.to_string() });
            }
            let agents = index
                .agents()
                .iter()
                .map(|a| {
                    let mut a = a.clone();
                    if a.id() == id {
                        a.status = AgentStatus::Unavailable;
                    }
                    a
                })
                .collect();
            *index = Arc::new(CatalogIndex::build(agents));
        }

        if let Some(stats) = self.stats.write().await.get_mut(id) {
            stats.last_error = Some(reason.to_string());
        }

        tracing::warn!(agent = %id, reason = %reason, "Agent marked unavailable");
        Ok(())
    }

    pub async fn status(&self, id: &str) -> Option<AgentStatus> {
        self.snapshot().await.agent(id).map(|a| a.status)
    }

    pub async fn stats(&self, id: &str) -> Option<AgentStats> {
        self.stats.read().await.get(id).cloned()
    }

    /// Registered agent ids, in registration order.
    pub async fn agent_ids(&self) -> Vec<String> {
        self.snapshot()
            .await
            .agents()
            .iter()
            .map(|a| a.id().to_string())
            .collect()
    }

    async fn record(&self, agent: &str, error: Option<&MeshError>) {
        let mut stats = self.stats.write().await;
        if let Some(entry) = stats.get_mut(agent) {
            entry.invocations += 1;
            if let Some(err) = error {
                entry.failures += 1;
                entry.last_error = Some(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::LocalAgent;
    use async_trait::async_trait;
    use mesh_core::{ActionDescriptor, ParamKind};
    use mesh_registry::ActionRegistry;

    fn echo(args: &Arguments) -> Result<ActionOutput, MeshError> {
        Ok(ActionOutput::text(format!("{} args", args.len())))
    }

    fn agent(id: &str, actions: &[&str]) -> Arc<dyn AgentHandle> {
        let mut registry = ActionRegistry::new(id);
        for name in actions {
            registry
                .register(
                    ActionDescriptor::new(*name, format!("Run {name}"))
                        .optional("note", ParamKind::String),
                    echo,
                )
                .unwrap();
        }
        Arc::new(LocalAgent::new(registry))
    }

    struct DownAgent;

    #[async_trait]
    impl AgentHandle for DownAgent {
        fn id(&self) -> &str {
            "down"
        }

        async fn describe(&self) -> Result<Vec<ActionDescriptor>, MeshError> {
            Err(MeshError::unreachable("down", "connection refused"))
        }

        async fn invoke(&self, _: &str, _: &Arguments) -> Result<ActionOutput, MeshError> {
            Err(MeshError::unreachable("down", "connection refused"))
        }
    }

    async fn create_test_catalog() -> AgentCatalog {
        let catalog = AgentCatalog::new();
        catalog
            .add_agent(agent("claims", &["submitClaim", "processPayment"]))
            .await
            .unwrap();
        catalog
            .add_agent(agent("customer", &["getCustomerAccount", "processPayment"]))
            .await
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_add_agent_qualifies_names() {
        let catalog = AgentCatalog::new();
        let added = catalog
            .add_agent(agent("policy", &["createPolicy", "renewPolicy"]))
            .await
            .unwrap();

        let names: Vec<String> = added.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["policy.createPolicy", "policy.renewPolicy"]);
    }

    #[tokio::test]
    async fn test_duplicate_agent_rejected() {
        let catalog = create_test_catalog().await;
        let err = catalog
            .add_agent(agent("claims", &["other"]))
            .await
            .unwrap_err();
        assert_eq!(err, MeshError::DuplicateAgent { id: "claims".into() });
        assert_eq!(catalog.list_actions().await.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_handshake_registers_nothing() {
        let catalog = create_test_catalog().await;
        let err = catalog.add_agent(Arc::new(DownAgent)).await.unwrap_err();

        assert!(matches!(err, MeshError::AgentUnreachable { .. }));
        assert_eq!(catalog.agent_ids().await, ["claims", "customer"]);
    }

    #[tokio::test]
    async fn test_resolve_unique_bare_name() {
        let catalog = create_test_catalog().await;
        let entry = catalog.resolve_name("submitClaim").await.unwrap();
        assert_eq!(entry.action.to_string(), "claims.submitClaim");
    }

    #[tokio::test]
    async fn test_resolve_ambiguous_bare_name() {
        let catalog = create_test_catalog().await;
        let err = catalog.resolve_name("processPayment").await.unwrap_err();

        assert_eq!(
            err,
            MeshError::AmbiguousAction {
                name: "processPayment".into(),
                matches: vec![
                    "claims.processPayment".into(),
                    "customer.processPayment".into()
                ],
            }
        );

        let qualified = catalog.resolve_name("customer.processPayment").await.unwrap();
        assert_eq!(qualified.action.agent, "customer");
    }

    #[tokio::test]
    async fn test_remove_agent_leaves_others_intact() {
        let catalog = create_test_catalog().await;
        catalog.remove_agent("claims").await.unwrap();

        let entry = catalog.resolve_name("processPayment").await.unwrap();
        assert_eq!(entry.action.to_string(), "customer.processPayment");

        let err = catalog
            .invoke(&QualifiedName::new("claims", "submitClaim"), &Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::AgentUnreachable { .. }));

        assert_eq!(
            catalog.remove_agent("claims").await.unwrap_err(),
            MeshError::UnknownAgent { id: "claims".into() }
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_updates() {
        let catalog = create_test_catalog().await;
        let before = catalog.snapshot().await;
        catalog.remove_agent("customer").await.unwrap();

        assert_eq!(before.len(), 4);
        assert_eq!(catalog.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_agents_listed_but_not_candidates() {
        let catalog = create_test_catalog().await;
        catalog
            .invoke(&QualifiedName::new("claims", "submitClaim"), &Arguments::new())
            .await
            .unwrap();
        catalog.mark_unavailable("claims", "retries exhausted").await.unwrap();

        let snapshot = catalog.snapshot().await;
        assert_eq!(snapshot.entries().len(), 4);
        assert!(snapshot.candidates().iter().all(|e| e.action.agent == "customer"));
        assert_eq!(catalog.status("claims").await, Some(AgentStatus::Unavailable));

        let stats = catalog.stats("claims").await.unwrap();
        assert_eq!(stats.invocations, 1);
        assert_eq!(stats.last_error.as_deref(), Some("retries exhausted"));

        catalog.refresh_agent("claims").await.unwrap();
        assert_eq!(catalog.status("claims").await, Some(AgentStatus::Available));
    }

    #[tokio::test]
    async fn test_invoke_records_failures() {
        let catalog = create_test_catalog().await;
        let err = catalog
            .invoke(&QualifiedName::new("claims", "denyClaim"), &Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::UnknownAction { .. }));

        let out = catalog
            .invoke(
                &QualifiedName::new("customer", "getCustomerAccount"),
                &Arguments::new().with("note", "x"),
            )
            .await
            .unwrap();
        assert_eq!(out, ActionOutput::text("1 args"));
        assert_eq!(catalog.stats("customer").await.unwrap().failures, 0);
    }
}
