//! Splitting compound requests into pipeline steps.

use crate::text::{VERB_SYNONYMS, leading_verb, words};
use async_trait::async_trait;
use mesh_catalog::CatalogIndex;
use mesh_core::{MergeStrategy, MeshError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[,;]\s*(?:(?:and\s+)?then\b|and\b)?|\b(?:and\s+)?then\b|\band\b")
        .expect("static pattern")
});

/// Words in a later clause that point back at an earlier result.
const BACK_REFERENCES: &[&str] = &["their", "them", "it", "that", "those", "if"];

/// How the steps of a plan relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Steps run one at a time in request order, each seeing every earlier
    /// result.
    Sequential,
    /// Steps run concurrently.
    Independent,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Independent => f.write_str("independent"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionMode::Sequential),
            "independent" | "parallel" => Ok(ExecutionMode::Independent),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// One sub-intent of a compound request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    pub sub_intent: String,
    /// The clause points back at the previous result ("then", "their").
    pub reads_previous: bool,
    /// Steps that must succeed before this one runs.
    pub depends_on: Vec<usize>,
}

/// Ordered steps plus how to run and merge them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelinePlan {
    pub steps: Vec<PlannedStep>,
    pub mode: ExecutionMode,
    pub merge: MergeStrategy,
    /// A leading clause with no verb ("For customer CUST-1"), offered to
    /// every step as extraction context.
    pub shared_context: Option<String>,
    /// Set when the caller chose the mode; the pipeline never changes it.
    pub mode_forced: bool,
}

impl PipelinePlan {
    /// Steps from `(sub_intent, reads_previous)` pairs in request order.
    pub fn new(clauses: Vec<(String, bool)>, mode: ExecutionMode, merge: MergeStrategy) -> Self {
        let mut plan = Self {
            steps: clauses
                .into_iter()
                .enumerate()
                .map(|(index, (sub_intent, reads_previous))| PlannedStep {
                    index,
                    sub_intent,
                    reads_previous,
                    depends_on: Vec::new(),
                })
                .collect(),
            mode,
            merge,
            shared_context: None,
            mode_forced: false,
        };
        plan.wire(mode);
        plan
    }

    /// Pin the mode chosen by the caller.
    pub fn force_mode(&mut self, mode: ExecutionMode) {
        self.wire(mode);
        self.mode_forced = true;
    }

    /// Run the steps in order so later ones see earlier results.
    pub fn make_sequential(&mut self) {
        self.wire(ExecutionMode::Sequential);
    }

    /// Only a step that reads its predecessor's result depends on it; the
    /// rest still run when an earlier step fails.
    fn wire(&mut self, mode: ExecutionMode) {
        self.mode = mode;
        for step in &mut self.steps {
            step.depends_on = match mode {
                ExecutionMode::Sequential if step.index > 0 && step.reads_previous => {
                    vec![step.index - 1]
                }
                _ => Vec::new(),
            };
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Turns a request into a plan.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &str, index: &CatalogIndex) -> Result<PipelinePlan, MeshError>;
}

/// Splits on conjunctions that are followed by an action verb.
///
/// "check their policies and show any pending claims" splits in two because
/// "show" starts a request; "for John and Jane" does not split.
#[derive(Debug, Clone, Default)]
pub struct ConjunctionPlanner {
    merge: MergeStrategy,
}

impl ConjunctionPlanner {
    pub fn new(merge: MergeStrategy) -> Self {
        Self { merge }
    }

    fn verbs(index: &CatalogIndex) -> HashSet<String> {
        let mut verbs: HashSet<String> = index
            .entries()
            .iter()
            .filter_map(|e| leading_verb(&e.descriptor.description))
            .collect();
        verbs.extend(VERB_SYNONYMS.iter().map(|v| v.to_string()));
        verbs
    }

    /// Clauses of `request`, each flagged when it was introduced by "then".
    fn split(request: &str, verbs: &HashSet<String>) -> Vec<(String, bool)> {
        let mut clauses = Vec::new();
        let mut start = 0;
        let mut joined_by_then = false;

        for boundary in BOUNDARY.find_iter(request) {
            let rest = &request[boundary.end()..];
            let starts_with_verb = words(rest)
                .first()
                .is_some_and(|w| verbs.contains(w));
            if !starts_with_verb || boundary.start() < start {
                continue;
            }
            clauses.push((request[start..boundary.start()].to_string(), joined_by_then));
            joined_by_then = boundary.as_str().to_lowercase().contains("then");
            start = boundary.end();
        }
        clauses.push((request[start..].to_string(), joined_by_then));

        clauses
            .into_iter()
            .map(|(c, then)| (clean(&c), then))
            .filter(|(c, _)| !c.is_empty())
            .collect()
    }
}

fn clean(clause: &str) -> String {
    clause
        .trim()
        .trim_end_matches(['.', '!', '?', ',', ';'])
        .trim()
        .to_string()
}

fn refers_back(clause: &str) -> bool {
    clause.to_lowercase().contains("the result")
        || words(clause)
            .iter()
            .any(|w| BACK_REFERENCES.contains(&w.as_str()))
}

#[async_trait]
impl Planner for ConjunctionPlanner {
    async fn plan(&self, request: &str, index: &CatalogIndex) -> Result<PipelinePlan, MeshError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(MeshError::NoMatchingAction {
                request: String::new(),
                threshold: 0.0,
            });
        }

        let verbs = Self::verbs(index);
        let mut clauses = Self::split(request, &verbs);

        let mut shared_context = None;
        let leading_is_context = clauses.len() > 1
            && clauses[0]
                .0
                .split_whitespace()
                .next()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .is_some_and(|w| !verbs.contains(&w));
        if leading_is_context {
            shared_context = Some(clauses.remove(0).0);
        }

        let clauses: Vec<(String, bool)> = clauses
            .into_iter()
            .enumerate()
            .map(|(i, (clause, then))| {
                let reads_previous = i > 0 && (then || refers_back(&clause));
                (clause, reads_previous)
            })
            .collect();
        let mode = if clauses.iter().any(|(_, reads_previous)| *reads_previous) {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Independent
        };

        let mut plan = PipelinePlan::new(clauses, mode, self.merge);
        plan.shared_context = shared_context;

        tracing::debug!(
            steps = plan.len(),
            mode = %plan.mode,
            shared_context = plan.shared_context.as_deref().unwrap_or_default(),
            "Planned request"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_catalog::{AgentEntry, AgentStatus, LocalAgent};
    use mesh_core::ActionDescriptor;
    use mesh_registry::ActionRegistry;
    use std::sync::Arc;

    fn index() -> CatalogIndex {
        let descriptors = vec![
            ActionDescriptor::new("listCustomerPolicies", "List all active policies for a customer"),
            ActionDescriptor::new("assessRisk", "Assess risk for an insurance application"),
            ActionDescriptor::new("submitClaim", "Submit a new insurance claim"),
            ActionDescriptor::new("getClaimsSummary", "Get a summary of claims for a customer"),
        ];
        CatalogIndex::build(vec![AgentEntry {
            handle: Arc::new(LocalAgent::new(ActionRegistry::new("all"))),
            descriptors,
            status: AgentStatus::Available,
        }])
    }

    fn sub_intents(plan: &PipelinePlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.sub_intent.as_str()).collect()
    }

    #[tokio::test]
    async fn leading_clause_becomes_shared_context() {
        let plan = ConjunctionPlanner::default()
            .plan(
                "For customer CUST-12345, check their active policies, assess if they need additional coverage, and show any pending claims",
                &index(),
            )
            .await
            .unwrap();

        assert_eq!(plan.shared_context.as_deref(), Some("For customer CUST-12345"));
        assert_eq!(
            sub_intents(&plan),
            [
                "check their active policies",
                "assess if they need additional coverage",
                "show any pending claims"
            ]
        );
        assert_eq!(plan.mode, ExecutionMode::Sequential);
        assert_eq!(plan.steps[1].depends_on, [0]);
        // "show any pending claims" does not need the assessment.
        assert!(plan.steps[2].depends_on.is_empty());
    }

    #[tokio::test]
    async fn unrelated_clauses_are_independent() {
        let plan = ConjunctionPlanner::default()
            .plan(
                "list policies for CUST-1; get a summary of claims for CUST-2",
                &index(),
            )
            .await
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.mode, ExecutionMode::Independent);
        assert!(plan.steps.iter().all(|s| s.depends_on.is_empty()));
        assert_eq!(plan.shared_context, None);
    }

    #[tokio::test]
    async fn then_forces_sequence() {
        let plan = ConjunctionPlanner::default()
            .plan(
                "check customer CUST-1's policies and then submit a claim for $5000",
                &index(),
            )
            .await
            .unwrap();

        assert_eq!(
            sub_intents(&plan),
            ["check customer CUST-1's policies", "submit a claim for $5000"]
        );
        assert_eq!(plan.mode, ExecutionMode::Sequential);
        assert!(plan.steps[1].reads_previous);
        assert_eq!(plan.steps[1].depends_on, [0]);
    }

    #[tokio::test]
    async fn conjunctions_without_verbs_do_not_split() {
        let plan = ConjunctionPlanner::default()
            .plan("Create a joint policy for John and Jane, $250,000 coverage", &index())
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.shared_context, None);
    }

    #[tokio::test]
    async fn forced_mode_rewires_dependencies() {
        let mut plan = ConjunctionPlanner::default()
            .plan("list policies for CUST-1, show claims for CUST-1", &index())
            .await
            .unwrap();
        assert_eq!(plan.mode, ExecutionMode::Independent);

        plan.force_mode(ExecutionMode::Sequential);
        assert!(plan.mode_forced);
        assert_eq!(plan.mode, ExecutionMode::Sequential);
        assert!(plan.steps[1].depends_on.is_empty());

        let mut chained = ConjunctionPlanner::default()
            .plan("list policies for CUST-1, then show claims for them", &index())
            .await
            .unwrap();
        chained.force_mode(ExecutionMode::Independent);
        assert!(chained.steps[1].depends_on.is_empty());
        chained.force_mode(ExecutionMode::Sequential);
        assert_eq!(chained.steps[1].depends_on, [0]);
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let err = ConjunctionPlanner::default().plan("   ", &index()).await.unwrap_err();
        assert!(matches!(err, MeshError::NoMatchingAction { .. }));
    }

    #[test]
    fn execution_mode_parses() {
        assert_eq!("parallel".parse::<ExecutionMode>(), Ok(ExecutionMode::Independent));
        assert_eq!(ExecutionMode::Sequential.to_string(), "sequential");
        assert!("sometimes".parse::<ExecutionMode>().is_err());
    }
}
