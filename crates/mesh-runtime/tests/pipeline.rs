//! Pipeline scenarios over the insurance agents, with fault injection.

use async_trait::async_trait;
use chrono::NaiveDate;
use mesh_catalog::{AgentHandle, AgentStatus, LocalAgent};
use mesh_core::{
    ActionDescriptor, ActionOutput, ArgValue, Arguments, MergeStrategy, MeshConfig, MeshError,
    SequentialIds,
};
use mesh_runtime::{
    ExecutionMode, Mesh, PipelineError, PipelineEvent, RecordingEventSink, RunOptions, cancel_pair,
};
use mesh_services::{FixedClock, Service, ServiceContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

enum Fault {
    /// Fail with `AgentUnreachable` this many times, then behave.
    Unreachable(AtomicU32),
    /// Always fail with a semantic error.
    Reject,
    /// Answer after a pause.
    Delay(Duration),
}

/// Wraps a real agent and misbehaves on `invoke`.
struct FaultyAgent {
    inner: LocalAgent,
    fault: Fault,
}

#[async_trait]
impl AgentHandle for FaultyAgent {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn describe(&self) -> Result<Vec<ActionDescriptor>, MeshError> {
        self.inner.describe().await
    }

    async fn invoke(&self, action: &str, args: &Arguments) -> Result<ActionOutput, MeshError> {
        match &self.fault {
            Fault::Unreachable(remaining) => {
                let left = remaining.load(Ordering::SeqCst);
                if left > 0 {
                    remaining.store(left - 1, Ordering::SeqCst);
                    return Err(MeshError::unreachable(self.id(), "connection refused"));
                }
            }
            Fault::Reject => {
                return Err(MeshError::argument("claimNumber", "claim archive offline"));
            }
            Fault::Delay(pause) => tokio::time::sleep(*pause).await,
        }
        self.inner.invoke(action, args).await
    }
}

fn context() -> ServiceContext {
    let instant = NaiveDate::from_ymd_opt(2026, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    ServiceContext::new(Arc::new(SequentialIds::new()), Arc::new(FixedClock(instant)))
}

fn fast_config() -> MeshConfig {
    let mut config = MeshConfig::default();
    config.pipeline.base_backoff_ms = 1;
    config.pipeline.max_backoff_ms = 5;
    config.pipeline.call_timeout_ms = 1_000;
    config
}

/// All four agents, with `fault` injected into `faulty`.
async fn mesh(config: MeshConfig, faulty: Option<(Service, Fault)>) -> Mesh {
    let mesh = Mesh::new(config);
    let ctx = context();
    let mut faulty = faulty;
    for service in Service::ALL {
        let agent = LocalAgent::new(service.registry(&ctx).unwrap());
        let handle: Arc<dyn AgentHandle> = match faulty.take() {
            Some((target, fault)) if target == service => Arc::new(FaultyAgent { inner: agent, fault }),
            other => {
                faulty = other;
                Arc::new(agent)
            }
        };
        mesh.add_agent(handle).await.unwrap();
    }
    mesh
}

fn actions(merged: &mesh_runtime::MergedResponse) -> Vec<String> {
    merged.sections.iter().map(|s| s.action.to_string()).collect()
}

#[tokio::test]
async fn single_request_creates_a_policy() {
    let mesh = mesh(fast_config(), None).await;

    let invocation = mesh
        .resolve_and_invoke("Create a life insurance policy for John Doe with $500,000 coverage")
        .await
        .unwrap();

    assert_eq!(invocation.call.action.to_string(), "policy.createPolicy");
    assert_eq!(
        invocation.call.arguments.get("customerName"),
        Some(&ArgValue::String("John Doe".to_string()))
    );
    assert_eq!(
        invocation.call.arguments.get("coverageAmount"),
        Some(&ArgValue::Decimal(500_000.0))
    );
    let text = invocation.output.as_text();
    assert!(text.contains("Policy Number: POL-00001"), "{text}");
    assert!(text.contains("Coverage Amount: $500,000.00"), "{text}");
    assert_eq!(invocation.trace.chosen, Some(invocation.call.action.clone()));
}

#[tokio::test]
async fn later_step_reads_earlier_output() {
    let mesh = mesh(fast_config(), None).await;

    let merged = mesh
        .run_pipeline("check customer CUST-12345's policies and then submit a claim for $5000")
        .await
        .unwrap();

    assert_eq!(actions(&merged), ["policy.listCustomerPolicies", "claims.submitClaim"]);
    let claim = merged.sections[1].output.as_text();
    assert!(claim.contains("Policy Number: POL-12345"), "{claim}");
    assert!(claim.contains("Claim Type: Life"), "{claim}");
    assert!(claim.contains("Claim Amount: $5,000.00"), "{claim}");
    assert!(merged.text().starts_with("[policy.listCustomerPolicies]\n"));
}

#[tokio::test]
async fn missing_arguments_turn_an_independent_plan_sequential() {
    let mesh = mesh(fast_config(), None).await;

    let merged = mesh
        .run_pipeline("check customer CUST-12345's policies and submit a claim for $5000")
        .await
        .unwrap();

    assert_eq!(actions(&merged), ["policy.listCustomerPolicies", "claims.submitClaim"]);
    assert!(merged.sections[1].output.as_text().contains("Policy Number: POL-12345"));
}

#[tokio::test]
async fn forced_independent_mode_is_not_rewritten() {
    let mesh = mesh(fast_config(), None).await;

    let err = mesh
        .run_pipeline_with(
            "check customer CUST-12345's policies and submit a claim for $5000",
            RunOptions {
                mode: Some(ExecutionMode::Independent),
                merge: None,
            },
            &mesh_runtime::CancelSignal::never(),
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::Planning(MeshError::IncompleteArguments { action, missing }) => {
            assert_eq!(action, "claims.submitClaim");
            assert_eq!(missing, ["policyNumber", "claimType"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn independent_failure_keeps_other_results_in_order() {
    let mesh = mesh(fast_config(), Some((Service::Claims, Fault::Reject))).await;

    let err = mesh
        .run_pipeline(
            "get policy details for POL-1; get claim status for CLM-2; get customer account information for CUST-3",
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            skipped,
        } => {
            assert_eq!(failed_step, 1);
            assert!(matches!(error, MeshError::ArgumentError { .. }));
            assert!(skipped.is_empty());
            assert_eq!(
                actions(&completed),
                ["policy.getPolicyDetails", "customer.getCustomerAccount"]
            );
            assert_eq!(completed.sections[0].step, 0);
            assert_eq!(completed.sections[1].step, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Semantic errors never take an agent out of rotation.
    assert_eq!(mesh.catalog().status("claims").await, Some(AgentStatus::Available));
}

#[tokio::test]
async fn transport_failures_are_retried() {
    let events = Arc::new(RecordingEventSink::new());
    let mesh = mesh(
        fast_config(),
        Some((Service::Claims, Fault::Unreachable(AtomicU32::new(2)))),
    )
    .await
    .with_event_sink(events.clone());

    let merged = mesh.run_pipeline("get claim status for CLM-2").await.unwrap();

    assert!(merged.sections[0].output.as_text().contains("Claim Status for CLM-2"));
    let retries = events
        .events()
        .iter()
        .filter(|e| matches!(e, PipelineEvent::StepRetry { .. }))
        .count();
    assert_eq!(retries, 2);
    assert_eq!(mesh.catalog().status("claims").await, Some(AgentStatus::Available));
}

#[tokio::test]
async fn exhausted_retries_mark_the_agent_unavailable() {
    let events = Arc::new(RecordingEventSink::new());
    let mesh = mesh(
        fast_config(),
        Some((Service::Claims, Fault::Unreachable(AtomicU32::new(10)))),
    )
    .await
    .with_event_sink(events.clone());

    let err = mesh.run_pipeline("get claim status for CLM-2").await.unwrap_err();

    assert!(matches!(err.mesh_error(), MeshError::AgentUnreachable { .. }));
    assert_eq!(err.completed().map(|c| c.len()), Some(0));
    assert_eq!(mesh.catalog().status("claims").await, Some(AgentStatus::Unavailable));
    assert!(events.events().iter().any(|e| matches!(
        e,
        PipelineEvent::AgentMarkedUnavailable { agent, .. } if agent == "claims"
    )));

    let retry = mesh.resolve_and_invoke("get claim status for CLM-2").await;
    assert!(matches!(retry, Err(MeshError::NoMatchingAction { .. })));
}

#[tokio::test]
async fn slow_calls_time_out_as_unreachable() {
    let mut config = fast_config();
    config.pipeline.call_timeout_ms = 50;
    config.pipeline.max_attempts = 1;
    let mesh = mesh(
        config,
        Some((Service::Policy, Fault::Delay(Duration::from_millis(500)))),
    )
    .await;

    let err = mesh.run_pipeline("get policy details for POL-1").await.unwrap_err();

    match err.mesh_error() {
        MeshError::AgentUnreachable { agent, reason } => {
            assert_eq!(agent, "policy");
            assert!(reason.contains("50ms"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_before_the_next_step() {
    let mesh = mesh(
        fast_config(),
        Some((Service::Policy, Fault::Delay(Duration::from_millis(150)))),
    )
    .await;
    let (handle, signal) = cancel_pair();

    let (result, ()) = tokio::join!(
        mesh.run_pipeline_with(
            "get policy details for POL-1 then get claim status for CLM-2 then get customer account information for CUST-3",
            RunOptions::default(),
            &signal,
        ),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        }
    );

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    match err {
        PipelineError::PartialFailure {
            completed,
            failed_step,
            skipped,
            ..
        } => {
            // The in-flight call was allowed to finish.
            assert_eq!(actions(&completed), ["policy.getPolicyDetails"]);
            assert_eq!(failed_step, 1);
            assert_eq!(skipped, [2]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn removing_an_agent_mid_run_fails_its_step() {
    let mesh = mesh(
        fast_config(),
        Some((Service::Customer, Fault::Delay(Duration::from_millis(100)))),
    )
    .await;
    let before = mesh.list_actions().await.len();

    let (result, removed) = tokio::join!(
        mesh.run_pipeline(
            "get customer account information for CUST-3 then get policy details for POL-1"
        ),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            mesh.remove_agent("policy").await
        }
    );
    removed.unwrap();

    match result.unwrap_err() {
        PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            ..
        } => {
            assert_eq!(actions(&completed), ["customer.getCustomerAccount"]);
            assert_eq!(failed_step, 1);
            assert!(matches!(error, MeshError::AgentUnreachable { ref agent, .. } if agent == "policy"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Only the policy agent's seven actions went away.
    let after = mesh.list_actions().await;
    assert_eq!(after.len(), before - 7);
    assert!(after.iter().all(|e| e.action.agent != "policy"));
    assert_eq!(mesh.catalog().status("claims").await, Some(AgentStatus::Available));
}

#[tokio::test]
async fn structured_merge_tags_each_result() {
    let mesh = mesh(fast_config(), None).await;

    let merged = mesh
        .run_pipeline_with(
            "get policy details for POL-1; get claim status for CLM-2",
            RunOptions {
                mode: None,
                merge: Some(MergeStrategy::Structured),
            },
            &mesh_runtime::CancelSignal::never(),
        )
        .await
        .unwrap();

    let json = merged.to_json();
    assert_eq!(json["results"][0]["action"], "policy.getPolicyDetails");
    assert_eq!(json["results"][1]["action"], "claims.getClaimStatus");
    assert_eq!(json["results"][1]["sub_intent"], "get claim status for CLM-2");
    assert!(merged.render().trim_start().starts_with('{'));
}

#[tokio::test]
async fn unmatched_request_fails_planning() {
    let mesh = mesh(fast_config(), None).await;

    let err = mesh.run_pipeline("what's the weather").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Planning(MeshError::NoMatchingAction { .. })
    ));
    assert!(err.completed().is_none());
}

#[tokio::test]
async fn compound_demo_request_runs_past_the_unmatched_step() {
    let events = Arc::new(RecordingEventSink::new());
    let mesh = mesh(fast_config(), None).await.with_event_sink(events.clone());

    let err = mesh
        .run_pipeline(
            "For customer CUST-12345, check their active policies, assess if they need additional coverage, and show any pending claims",
        )
        .await
        .unwrap_err();

    match err {
        PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            skipped,
        } => {
            assert_eq!(
                actions(&completed),
                ["policy.listCustomerPolicies", "claims.getClaimsSummary"]
            );
            assert!(completed.sections[0]
                .output
                .as_text()
                .contains("Active Policies for Customer CUST-12345"));
            assert_eq!(completed.sections[1].step, 2);
            assert!(completed.sections[1]
                .output
                .as_text()
                .contains("Claims Summary for Policy POL-12345"));
            assert_eq!(failed_step, 1);
            assert!(matches!(error, MeshError::NoMatchingAction { .. }));
            assert!(skipped.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!events
        .events()
        .iter()
        .any(|e| matches!(e, PipelineEvent::StepSkipped { .. })));
}

#[tokio::test]
async fn follow_up_uses_the_record_found_earlier() {
    let mesh = mesh(fast_config(), None).await;

    let merged = mesh
        .run_pipeline(
            "For customer CUST-12345, check their active policies, and show any pending claims",
        )
        .await
        .unwrap();

    assert_eq!(
        actions(&merged),
        ["policy.listCustomerPolicies", "claims.getClaimsSummary"]
    );
    assert!(merged.sections[1]
        .output
        .as_text()
        .contains("Claims Summary for Policy POL-12345"));
}

#[tokio::test]
async fn steps_reading_a_failed_result_are_skipped() {
    let events = Arc::new(RecordingEventSink::new());
    let mesh = mesh(fast_config(), Some((Service::Claims, Fault::Reject)))
        .await
        .with_event_sink(events.clone());

    let err = mesh
        .run_pipeline("get claim status for CLM-2 then get policy details for POL-1")
        .await
        .unwrap_err();

    match err {
        PipelineError::PartialFailure {
            completed,
            failed_step,
            error,
            skipped,
        } => {
            assert!(completed.is_empty());
            assert_eq!(failed_step, 0);
            assert!(matches!(error, MeshError::ArgumentError { .. }));
            assert_eq!(skipped, [1]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(events.events().iter().any(|e| matches!(
        e,
        PipelineEvent::StepSkipped { step: 1, after: 0, .. }
    )));
}
