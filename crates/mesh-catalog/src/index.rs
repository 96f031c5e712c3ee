//! Immutable snapshot of the catalog's name index.

use crate::handle::AgentHandle;
use mesh_core::{ActionDescriptor, MeshError, QualifiedName};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Whether an agent takes part in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Available,
    /// Retry budget exhausted. Still listed, never resolved to.
    Unavailable,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Available => f.write_str("available"),
            AgentStatus::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// One registered agent inside a snapshot.
#[derive(Clone)]
pub struct AgentEntry {
    pub handle: Arc<dyn AgentHandle>,
    pub descriptors: Vec<ActionDescriptor>,
    pub status: AgentStatus,
}

impl AgentEntry {
    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

/// One qualified action.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub action: QualifiedName,
    pub descriptor: ActionDescriptor,
    pub status: AgentStatus,
}

/// Point-in-time view of every agent and its qualified actions.
///
/// Never mutated: the catalog builds a new index for each change and swaps
/// it in whole.
#[derive(Clone, Default)]
pub struct CatalogIndex {
    agents: Vec<AgentEntry>,
    by_agent: HashMap<String, usize>,
    by_bare_name: HashMap<String, Vec<QualifiedName>>,
}

impl CatalogIndex {
    /// Build an index over agents, in registration order.
    pub fn build(agents: Vec<AgentEntry>) -> Self {
        let mut by_agent = HashMap::new();
        let mut by_bare_name: HashMap<String, Vec<QualifiedName>> = HashMap::new();

        for (i, agent) in agents.iter().enumerate() {
            by_agent.insert(agent.id().to_string(), i);
            for descriptor in &agent.descriptors {
                by_bare_name
                    .entry(descriptor.name.clone())
                    .or_default()
                    .push(QualifiedName::new(agent.id(), &descriptor.name));
            }
        }

        Self {
            agents,
            by_agent,
            by_bare_name,
        }
    }

    pub fn agents(&self) -> &[AgentEntry] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&AgentEntry> {
        self.by_agent.get(id).map(|&i| &self.agents[i])
    }

    pub fn contains_agent(&self, id: &str) -> bool {
        self.by_agent.contains_key(id)
    }

    /// Every qualified action, agents in registration order, then each
    /// agent's actions in its own order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.agents
            .iter()
            .flat_map(|agent| {
                agent.descriptors.iter().map(move |d| CatalogEntry {
                    action: QualifiedName::new(agent.id(), &d.name),
                    descriptor: d.clone(),
                    status: agent.status,
                })
            })
            .collect()
    }

    /// Entries eligible for resolution: those of available agents.
    pub fn candidates(&self) -> Vec<CatalogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.status == AgentStatus::Available)
            .collect()
    }

    /// Look up a qualified action.
    pub fn get(&self, name: &QualifiedName) -> Option<CatalogEntry> {
        let agent = self.agent(&name.agent)?;
        let descriptor = agent.descriptors.iter().find(|d| d.name == name.action)?;
        Some(CatalogEntry {
            action: name.clone(),
            descriptor: descriptor.clone(),
            status: agent.status,
        })
    }

    /// Resolve `agent.action` or a bare action name.
    ///
    /// A bare name must be exposed by exactly one agent; otherwise the error
    /// lists every qualified match.
    pub fn resolve_name(&self, name: &str) -> Result<CatalogEntry, MeshError> {
        if let Some(entry) = QualifiedName::parse(name).and_then(|q| self.get(&q)) {
            return Ok(entry);
        }

        match self.by_bare_name.get(name).map(Vec::as_slice) {
            Some([only]) => self.get(only).ok_or_else(|| MeshError::UnknownAction {
                name: name.to_string(),
            }),
            Some(matches) if matches.len() > 1 => Err(MeshError::AmbiguousAction {
                name: name.to_string(),
                matches: matches.iter().map(ToString::to_string).collect(),
            }),
            _ => Err(MeshError::UnknownAction {
                name: name.to_string(),
            }),
        }
    }

    /// Bare action names known to the index, in catalog order, deduplicated.
    pub fn action_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.agents
            .iter()
            .flat_map(|a| a.descriptors.iter())
            .filter(|d| seen.insert(d.name.clone()))
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.iter().map(|a| a.descriptors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
