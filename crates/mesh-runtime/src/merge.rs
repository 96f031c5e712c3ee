//! Merged pipeline results and the pipeline error type.

use mesh_core::{ActionOutput, MergeStrategy, MeshError, QualifiedName};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

/// Output of one completed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub step: usize,
    pub action: QualifiedName,
    pub sub_intent: String,
    pub output: ActionOutput,
}

/// Completed step outputs, in plan order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedResponse {
    pub run_id: Uuid,
    pub strategy: MergeStrategy,
    pub sections: Vec<Section>,
}

impl MergedResponse {
    /// Sections are sorted by step, whatever order they arrive in.
    pub fn new(run_id: Uuid, strategy: MergeStrategy, mut sections: Vec<Section>) -> Self {
        sections.sort_by_key(|s| s.step);
        Self {
            run_id,
            strategy,
            sections,
        }
    }

    /// Concatenated sections, each headed by `[agent.action]`.
    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("[{}]\n{}", s.action, s.output.as_text()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// One object with an entry per step.
    pub fn to_json(&self) -> Value {
        let results: Vec<Value> = self
            .sections
            .iter()
            .map(|s| {
                let output = match &s.output {
                    ActionOutput::Text { text } => Value::String(text.clone()),
                    ActionOutput::Json { json } => json.clone(),
                };
                json!({
                    "step": s.step,
                    "action": s.action.to_string(),
                    "sub_intent": s.sub_intent,
                    "output": output,
                })
            })
            .collect();

        json!({
            "run_id": self.run_id.to_string(),
            "results": results,
        })
    }

    /// Rendering chosen by the merge strategy.
    pub fn render(&self) -> String {
        match self.strategy {
            MergeStrategy::Concatenate => self.text(),
            MergeStrategy::Structured => serde_json::to_string_pretty(&self.to_json())
                .unwrap_or_else(|_| self.to_json().to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Why a pipeline run did not produce a complete answer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No step ran.
    #[error("planning failed: {0}")]
    Planning(#[source] MeshError),

    /// Some steps completed; `completed` holds their outputs.
    #[error("step {failed_step} failed: {error}")]
    PartialFailure {
        completed: MergedResponse,
        failed_step: usize,
        error: MeshError,
        /// Steps never started because a dependency failed or the run was
        /// cancelled.
        skipped: Vec<usize>,
    },
}

impl PipelineError {
    /// The underlying mesh error.
    pub fn mesh_error(&self) -> &MeshError {
        match self {
            PipelineError::Planning(e) => e,
            PipelineError::PartialFailure { error, .. } => error,
        }
    }

    /// Results gathered before the failure, if any step ran.
    pub fn completed(&self) -> Option<&MergedResponse> {
        match self {
            PipelineError::Planning(_) => None,
            PipelineError::PartialFailure { completed, .. } => Some(completed),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.mesh_error(), MeshError::Cancelled)
    }
}
