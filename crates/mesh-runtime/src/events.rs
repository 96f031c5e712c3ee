//! Step-level pipeline events.

use mesh_core::{MeshError, QualifiedName};
use mesh_planner::ExecutionMode;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Planned {
        run_id: Uuid,
        steps: usize,
        mode: ExecutionMode,
    },
    StepResolved {
        run_id: Uuid,
        step: usize,
        action: QualifiedName,
        confidence: f32,
    },
    StepRetry {
        run_id: Uuid,
        step: usize,
        action: QualifiedName,
        attempt: u32,
        delay_ms: u64,
        error: MeshError,
    },
    StepCompleted {
        run_id: Uuid,
        step: usize,
        action: QualifiedName,
    },
    StepFailed {
        run_id: Uuid,
        step: usize,
        action: Option<QualifiedName>,
        error: MeshError,
    },
    /// The step's input came from a step that did not succeed.
    StepSkipped {
        run_id: Uuid,
        step: usize,
        after: usize,
    },
    AgentMarkedUnavailable {
        run_id: Uuid,
        agent: String,
    },
    Finished {
        run_id: Uuid,
        completed: usize,
        failed_step: Option<usize>,
    },
}

/// Where pipeline events go. Called inline; keep it cheap.
pub trait PipelineEventSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Writes events as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl PipelineEventSink for TracingEventSink {
    fn record(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Planned { run_id, steps, mode } => {
                tracing::info!(%run_id, steps, %mode, "Pipeline planned");
            }
            PipelineEvent::StepResolved {
                run_id,
                step,
                action,
                confidence,
            } => {
                tracing::debug!(%run_id, step, action = %action, confidence, "Step resolved");
            }
            PipelineEvent::StepRetry {
                run_id,
                step,
                action,
                attempt,
                delay_ms,
                error,
            } => {
                tracing::warn!(
                    %run_id,
                    step,
                    action = %action,
                    attempt,
                    delay_ms,
                    error = %error,
                    "Retrying step"
                );
            }
            PipelineEvent::StepCompleted {
                run_id,
                step,
                action,
            } => {
                tracing::debug!(%run_id, step, action = %action, "Step completed");
            }
            PipelineEvent::StepFailed {
                run_id,
                step,
                action,
                error,
            } => {
                let action = action.map(|a| a.to_string()).unwrap_or_default();
                tracing::warn!(%run_id, step, action = %action, error = %error, "Step failed");
            }
            PipelineEvent::StepSkipped { run_id, step, after } => {
                tracing::info!(%run_id, step, after, "Step skipped");
            }
            PipelineEvent::AgentMarkedUnavailable { run_id, agent } => {
                tracing::warn!(%run_id, agent = %agent, "Retry budget exhausted");
            }
            PipelineEvent::Finished {
                run_id,
                completed,
                failed_step,
            } => match failed_step {
                None => tracing::info!(%run_id, completed, "Pipeline completed"),
                Some(step) => {
                    tracing::info!(%run_id, completed, failed_step = step, "Pipeline partially failed")
                }
            },
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl PipelineEventSink for RecordingEventSink {
    fn record(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
