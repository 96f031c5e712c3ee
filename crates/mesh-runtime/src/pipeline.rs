//! Plan, execute and merge compound requests.

use crate::cancel::CancelSignal;
use crate::events::{PipelineEvent, PipelineEventSink, TracingEventSink};
use crate::merge::{MergedResponse, PipelineError, Section};
use futures::future::join_all;
use mesh_catalog::{AgentCatalog, CatalogIndex};
use mesh_core::{ActionOutput, MergeStrategy, MeshError, PipelineConfig, ResolvedCall};
use mesh_planner::{
    ConjunctionPlanner, ExecutionMode, IntentResolver, PipelinePlan, Planner, ResolutionTrace,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Per-run overrides of the planner's choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Force the execution mode instead of inferring it.
    pub mode: Option<ExecutionMode>,
    pub merge: Option<MergeStrategy>,
}

/// Result of a single resolve-and-invoke.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub call: ResolvedCall,
    pub output: ActionOutput,
    pub trace: ResolutionTrace,
}

enum StepState {
    Pending,
    Done(Section),
    Failed(MeshError),
    Skipped,
}

/// Runs requests against a catalog.
///
/// Every step call gets the configured deadline and retry budget; an agent
/// that exhausts the budget is marked unavailable so later resolutions route
/// around it. A failed step only takes down the steps that read its result.
pub struct Pipeline {
    catalog: Arc<AgentCatalog>,
    resolver: IntentResolver,
    planner: Arc<dyn Planner>,
    config: PipelineConfig,
    events: Arc<dyn PipelineEventSink>,
}

impl Pipeline {
    pub fn new(catalog: Arc<AgentCatalog>, resolver: IntentResolver, config: PipelineConfig) -> Self {
        Self {
            catalog,
            resolver,
            planner: Arc::new(ConjunctionPlanner::new(config.merge)),
            config,
            events: Arc::new(TracingEventSink),
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn PipelineEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve `text` to one action and invoke it.
    pub async fn invoke_once(&self, text: &str) -> Result<Invocation, MeshError> {
        let run_id = Uuid::new_v4();
        let index = self.catalog.snapshot().await;
        let resolution = self.resolver.resolve(text, &index)?;
        self.events.record(PipelineEvent::StepResolved {
            run_id,
            step: 0,
            action: resolution.call.action.clone(),
            confidence: resolution.call.confidence,
        });

        let output = self
            .call_with_retry(run_id, 0, &resolution.call, &CancelSignal::never())
            .await?;
        self.events.record(PipelineEvent::StepCompleted {
            run_id,
            step: 0,
            action: resolution.call.action.clone(),
        });

        Ok(Invocation {
            call: resolution.call,
            output,
            trace: resolution.trace,
        })
    }

    /// Plan `request` and run it to completion, partial failure or
    /// cancellation.
    pub async fn run(
        &self,
        request: &str,
        options: RunOptions,
        cancel: &CancelSignal,
    ) -> Result<MergedResponse, PipelineError> {
        let run_id = Uuid::new_v4();
        // One snapshot for the whole run: resolution never sees a half-updated
        // catalog, and invocation re-checks membership on its own.
        let index = self.catalog.snapshot().await;

        let (plan, mut resolved) = self.plan(request, options, &index).await?;
        self.events.record(PipelineEvent::Planned {
            run_id,
            steps: plan.len(),
            mode: plan.mode,
        });
        for (step, call) in resolved.iter().enumerate() {
            if let Some(call) = call {
                self.events.record(PipelineEvent::StepResolved {
                    run_id,
                    step,
                    action: call.action.clone(),
                    confidence: call.confidence,
                });
            }
        }

        let mut states: Vec<StepState> = plan.steps.iter().map(|_| StepState::Pending).collect();

        loop {
            for step in &plan.steps {
                if !matches!(states[step.index], StepState::Pending) {
                    continue;
                }
                let blocked = step
                    .depends_on
                    .iter()
                    .find(|d| matches!(states[**d], StepState::Failed(_) | StepState::Skipped));
                if let Some(&after) = blocked {
                    self.events.record(PipelineEvent::StepSkipped {
                        run_id,
                        step: step.index,
                        after,
                    });
                    states[step.index] = StepState::Skipped;
                }
            }

            let mut ready: Vec<usize> = plan
                .steps
                .iter()
                .filter(|s| matches!(states[s.index], StepState::Pending))
                .filter(|s| {
                    s.depends_on
                        .iter()
                        .all(|d| matches!(states[*d], StepState::Done(_)))
                })
                .map(|s| s.index)
                .collect();
            if plan.mode == ExecutionMode::Sequential {
                ready.truncate(1);
            }
            if ready.is_empty() {
                break;
            }

            if cancel.is_cancelled() {
                let step = ready[0];
                self.events.record(PipelineEvent::StepFailed {
                    run_id,
                    step,
                    action: None,
                    error: MeshError::Cancelled,
                });
                states[step] = StepState::Failed(MeshError::Cancelled);
                break;
            }

            let mut calls = Vec::with_capacity(ready.len());
            for step in ready {
                let call = match resolved[step].take() {
                    Some(call) => call,
                    None => {
                        let context = step_context(&states, step, plan.shared_context.as_deref());
                        match self.resolver.resolve_with_context(
                            &plan.steps[step].sub_intent,
                            &index,
                            &context,
                        ) {
                            Ok(resolution) => {
                                self.events.record(PipelineEvent::StepResolved {
                                    run_id,
                                    step,
                                    action: resolution.call.action.clone(),
                                    confidence: resolution.call.confidence,
                                });
                                resolution.call
                            }
                            Err(error) => {
                                self.events.record(PipelineEvent::StepFailed {
                                    run_id,
                                    step,
                                    action: None,
                                    error: error.clone(),
                                });
                                states[step] = StepState::Failed(error);
                                continue;
                            }
                        }
                    }
                };
                calls.push((step, call));
            }

            let results = join_all(calls.into_iter().map(|(step, call)| async move {
                let result = self.call_with_retry(run_id, step, &call, cancel).await;
                (step, call, result)
            }))
            .await;

            for (step, call, result) in results {
                states[step] = match result {
                    Ok(output) => {
                        self.events.record(PipelineEvent::StepCompleted {
                            run_id,
                            step,
                            action: call.action.clone(),
                        });
                        StepState::Done(Section {
                            step,
                            action: call.action,
                            sub_intent: plan.steps[step].sub_intent.clone(),
                            output,
                        })
                    }
                    Err(error) => {
                        self.events.record(PipelineEvent::StepFailed {
                            run_id,
                            step,
                            action: Some(call.action),
                            error: error.clone(),
                        });
                        StepState::Failed(error)
                    }
                };
            }
        }

        self.finish(run_id, plan.merge, states)
    }

    /// Planning: split, pin overrides, resolve what can be resolved up front.
    async fn plan(
        &self,
        request: &str,
        options: RunOptions,
        index: &CatalogIndex,
    ) -> Result<(PipelinePlan, Vec<Option<ResolvedCall>>), PipelineError> {
        let mut plan = self
            .planner
            .plan(request, index)
            .await
            .map_err(PipelineError::Planning)?;
        if plan.is_empty() {
            return Err(PipelineError::Planning(MeshError::NoMatchingAction {
                request: request.to_string(),
                threshold: self.resolver.config().min_confidence,
            }));
        }
        if let Some(mode) = options.mode {
            plan.force_mode(mode);
        }
        if let Some(merge) = options.merge {
            plan.merge = merge;
        }

        let shared: Vec<String> = plan.shared_context.iter().cloned().collect();
        let mut resolved: Vec<Option<ResolvedCall>> = vec![None; plan.len()];

        if plan.mode == ExecutionMode::Sequential {
            let first = self
                .resolver
                .resolve_with_context(&plan.steps[0].sub_intent, index, &shared)
                .map_err(PipelineError::Planning)?;
            resolved[0] = Some(first.call);
            return Ok((plan, resolved));
        }

        for step in 0..plan.len() {
            match self
                .resolver
                .resolve_with_context(&plan.steps[step].sub_intent, index, &shared)
            {
                Ok(resolution) => resolved[step] = Some(resolution.call),
                Err(MeshError::IncompleteArguments { action, missing })
                    if step > 0 && !plan.mode_forced =>
                {
                    tracing::debug!(
                        step,
                        action = %action,
                        missing = %missing.join(", "),
                        "Step needs earlier results, running sequentially"
                    );
                    plan.make_sequential();
                    resolved.iter_mut().skip(1).for_each(|call| *call = None);
                    break;
                }
                Err(e) => return Err(PipelineError::Planning(e)),
            }
        }

        Ok((plan, resolved))
    }

    /// One step call under the deadline and retry budget.
    async fn call_with_retry(
        &self,
        run_id: Uuid,
        step: usize,
        call: &ResolvedCall,
        cancel: &CancelSignal,
    ) -> Result<ActionOutput, MeshError> {
        let max_attempts = self.config.max_attempts.max(1);
        let deadline = self.config.call_timeout();
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(
                deadline,
                self.catalog.invoke(&call.action, &call.arguments),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(MeshError::unreachable(
                    &call.action.agent,
                    format!("no response within {}ms", deadline.as_millis()),
                )),
            };

            match result {
                Ok(output) => return Ok(output),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff_delay(attempt);
                    self.events.record(PipelineEvent::StepRetry {
                        run_id,
                        step,
                        action: call.action.clone(),
                        attempt,
                        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error,
                    });
                    tokio::time::sleep(delay).await;
                    if cancel.is_cancelled() {
                        return Err(MeshError::Cancelled);
                    }
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_retryable() {
                        self.give_up_on(run_id, &call.action.agent, &error).await;
                    }
                    return Err(error);
                }
            }
        }
    }

    async fn give_up_on(&self, run_id: Uuid, agent: &str, error: &MeshError) {
        match self.catalog.mark_unavailable(agent, &error.to_string()).await {
            Ok(()) => self.events.record(PipelineEvent::AgentMarkedUnavailable {
                run_id,
                agent: agent.to_string(),
            }),
            Err(e) => tracing::debug!(agent = %agent, error = %e, "Agent already gone"),
        }
    }

    fn finish(
        &self,
        run_id: Uuid,
        merge: MergeStrategy,
        states: Vec<StepState>,
    ) -> Result<MergedResponse, PipelineError> {
        let mut sections = Vec::new();
        let mut first_failure: Option<(usize, MeshError)> = None;
        let mut skipped = Vec::new();

        for (step, state) in states.into_iter().enumerate() {
            match state {
                StepState::Done(section) => sections.push(section),
                StepState::Failed(error) => {
                    if first_failure.is_none() {
                        first_failure = Some((step, error));
                    }
                }
                StepState::Pending | StepState::Skipped => skipped.push(step),
            }
        }

        let completed = sections.len();
        let merged = MergedResponse::new(run_id, merge, sections);

        let failure = match first_failure {
            Some(failure) => failure,
            None if skipped.is_empty() => {
                self.events.record(PipelineEvent::Finished {
                    run_id,
                    completed,
                    failed_step: None,
                });
                return Ok(merged);
            }
            None => (
                skipped.remove(0),
                MeshError::Internal("step dependencies can never be satisfied".to_string()),
            ),
        };

        let (failed_step, error) = failure;
        self.events.record(PipelineEvent::Finished {
            run_id,
            completed,
            failed_step: Some(failed_step),
        });
        Err(PipelineError::PartialFailure {
            completed: merged,
            failed_step,
            error,
            skipped,
        })
    }
}

/// Outputs of earlier completed steps, nearest first, then the shared
/// context.
fn step_context(states: &[StepState], step: usize, shared: Option<&str>) -> Vec<String> {
    states[..step]
        .iter()
        .rev()
        .filter_map(|state| match state {
            StepState::Done(section) => Some(section.output.as_text()),
            _ => None,
        })
        .chain(shared.map(str::to_string))
        .collect()
}
