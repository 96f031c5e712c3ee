//! Error taxonomy shared across the mesh.

use thiserror::Error;

/// Errors raised by registries, agents, the catalog and the resolver.
///
/// Only [`MeshError::AgentUnreachable`] is retryable; everything else is a
/// semantic error that surfaces to the caller immediately.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MeshError {
    /// An action with this name is already registered in the registry.
    #[error("action already registered: {name}")]
    DuplicateAction { name: String },

    /// No action with this name is registered.
    #[error("unknown action: {name}")]
    UnknownAction { name: String },

    /// A required parameter is missing or failed type coercion.
    #[error("invalid argument '{parameter}': {reason}")]
    ArgumentError { parameter: String, reason: String },

    /// Transport failure or deadline exceeded.
    #[error("agent {agent} unreachable: {reason}")]
    AgentUnreachable { agent: String, reason: String },

    /// A bare action name is exposed by more than one agent.
    #[error("ambiguous action '{name}', candidates: {}", .matches.join(", "))]
    AmbiguousAction { name: String, matches: Vec<String> },

    /// No candidate cleared the resolver's confidence threshold.
    #[error("no action matches request '{request}' (threshold {threshold:.2})")]
    NoMatchingAction { request: String, threshold: f32 },

    /// The chosen action still lacks required parameters after extraction.
    #[error("incomplete arguments for {action}: missing {}", .missing.join(", "))]
    IncompleteArguments { action: String, missing: Vec<String> },

    /// The pipeline run was cancelled before this step started.
    #[error("cancelled")]
    Cancelled,

    /// An agent with this id is already part of the catalog.
    #[error("agent already registered: {id}")]
    DuplicateAgent { id: String },

    /// No agent with this id is part of the catalog.
    #[error("unknown agent: {id}")]
    UnknownAgent { id: String },

    /// Malformed message on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MeshError {
    pub fn argument(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        MeshError::ArgumentError {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn unreachable(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        MeshError::AgentUnreachable {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Transport errors are retried; semantic errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MeshError::AgentUnreachable { .. })
    }

    /// Stable snake_case tag, used on the wire and in event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MeshError::DuplicateAction { .. } => "duplicate_action",
            MeshError::UnknownAction { .. } => "unknown_action",
            MeshError::ArgumentError { .. } => "argument_error",
            MeshError::AgentUnreachable { .. } => "agent_unreachable",
            MeshError::AmbiguousAction { .. } => "ambiguous_action",
            MeshError::NoMatchingAction { .. } => "no_matching_action",
            MeshError::IncompleteArguments { .. } => "incomplete_arguments",
            MeshError::Cancelled => "cancelled",
            MeshError::DuplicateAgent { .. } => "duplicate_agent",
            MeshError::UnknownAgent { .. } => "unknown_agent",
            MeshError::Protocol(_) => "protocol",
            MeshError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for MeshError {
    fn from(e: serde_json::Error) -> Self {
        MeshError::Protocol(e.to_string())
    }
}
