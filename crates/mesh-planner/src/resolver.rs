//! Free text to a single qualified action call.

use crate::scorer::{KeywordScorer, Scorer};
use mesh_catalog::{AgentStatus, CatalogEntry, CatalogIndex};
use mesh_core::{
    ActionDescriptor, Arguments, MeshError, QualifiedName, ResolvedCall, ResolverConfig,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// How one candidate fared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub action: QualifiedName,
    pub score: f32,
    /// Required parameters still unfilled after extraction.
    pub missing: Vec<String>,
    /// Why the candidate was not chosen. `None` for the winner.
    pub discarded: Option<String>,
}

/// Every candidate considered for a request, with its score and fate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionTrace {
    pub request: String,
    pub threshold: f32,
    pub candidates: Vec<CandidateScore>,
    pub chosen: Option<QualifiedName>,
}

impl fmt::Display for ResolutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "request: {}", self.request)?;
        writeln!(f, "threshold: {:.2}", self.threshold)?;
        for c in &self.candidates {
            write!(f, "  {:.3}  {}", c.score, c.action)?;
            match &c.discarded {
                None => write!(f, "  <- chosen")?,
                Some(reason) => write!(f, "  ({reason})")?,
            }
            if !c.missing.is_empty() {
                write!(f, "  missing: {}", c.missing.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A resolved call together with the trace that explains it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub call: ResolvedCall,
    pub trace: ResolutionTrace,
}

struct Scored {
    entry: CatalogEntry,
    arguments: Arguments,
    score: f32,
    missing: Vec<String>,
    eligible: bool,
}

/// Picks the action a request is asking for.
#[derive(Clone)]
pub struct IntentResolver {
    scorer: Arc<dyn Scorer>,
    config: ResolverConfig,
}

impl IntentResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            scorer: Arc::new(KeywordScorer::new(config.lexical_weight)),
            config,
        }
    }

    pub fn with_scorer(scorer: Arc<dyn Scorer>, config: ResolverConfig) -> Self {
        Self { scorer, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, text: &str, index: &CatalogIndex) -> Result<Resolution, MeshError> {
        self.resolve_with_context(text, index, &[])
    }

    /// Resolve `text`, filling required parameters it leaves open from
    /// `context`, searched in order.
    pub fn resolve_with_context(
        &self,
        text: &str,
        index: &CatalogIndex,
        context: &[String],
    ) -> Result<Resolution, MeshError> {
        let text = text.trim();
        if let Some(entry) = explicit_reference(text, index)? {
            return self.resolve_explicit(text, entry, context);
        }

        let scored = self.score_all(text, index, context);
        let best = self.pick(&scored);

        let trace = self.trace(text, &scored, best);
        for c in trace.candidates.iter().filter(|c| c.discarded.is_some()) {
            tracing::debug!(
                action = %c.action,
                score = c.score,
                reason = c.discarded.as_deref().unwrap_or_default(),
                "Candidate discarded"
            );
        }

        let Some(best) = best else {
            return Err(MeshError::NoMatchingAction {
                request: text.to_string(),
                threshold: self.config.min_confidence,
            });
        };
        let chosen = &scored[best];
        if !chosen.missing.is_empty() {
            return Err(MeshError::IncompleteArguments {
                action: chosen.entry.action.to_string(),
                missing: chosen.missing.clone(),
            });
        }

        tracing::info!(
            action = %chosen.entry.action,
            confidence = chosen.score,
            "Resolved request"
        );
        Ok(Resolution {
            call: ResolvedCall {
                action: chosen.entry.action.clone(),
                arguments: chosen.arguments.clone(),
                confidence: chosen.score,
            },
            trace,
        })
    }

    /// Score every candidate without failing.
    pub fn explain(&self, text: &str, index: &CatalogIndex, context: &[String]) -> ResolutionTrace {
        let text = text.trim();
        let scored = self.score_all(text, index, context);
        let best = self.pick(&scored);
        self.trace(text, &scored, best)
    }

    /// Index of the winning candidate, if any clears the threshold.
    fn pick(&self, scored: &[Scored]) -> Option<usize> {
        scored
            .iter()
            .enumerate()
            .filter(|(_, s)| s.eligible && s.score >= self.config.min_confidence)
            .min_by(|(i, a), (j, b)| rank(a, b).then(i.cmp(j)))
            .map(|(i, _)| i)
    }

    /// Required parameters `found` leaves open, filled from `context` in
    /// order.
    fn carried(&self, descriptor: &ActionDescriptor, found: &Arguments, context: &[String]) -> Arguments {
        let mut carried = Arguments::new();
        for source in context {
            let missing: Vec<String> = descriptor
                .missing_required(found)
                .into_iter()
                .filter(|name| !carried.contains(name))
                .collect();
            if missing.is_empty() {
                break;
            }
            let from_source = self.scorer.extract(source, descriptor);
            for name in missing {
                if let Some(value) = from_source.get(&name) {
                    carried.insert(name, value.clone());
                }
            }
        }
        carried
    }

    fn extract_with_context(&self, text: &str, entry: &CatalogEntry, context: &[String]) -> Arguments {
        let mut arguments = self.scorer.extract(text, &entry.descriptor);
        let carried = self.carried(&entry.descriptor, &arguments, context);
        arguments.fill_missing(&carried);
        arguments
    }

    /// Scores each candidate after context filling.
    fn score_all(&self, text: &str, index: &CatalogIndex, context: &[String]) -> Vec<Scored> {
        index
            .entries()
            .into_iter()
            .map(|entry| {
                let eligible = entry.status == AgentStatus::Available;
                let (score, arguments) = if eligible && !text.is_empty() {
                    self.score_candidate(text, &entry.descriptor, context)
                } else {
                    (0.0, Arguments::new())
                };
                let missing = entry.descriptor.missing_required(&arguments);
                Scored {
                    entry,
                    arguments,
                    score,
                    missing,
                    eligible,
                }
            })
            .collect()
    }

    fn score_candidate(
        &self,
        text: &str,
        descriptor: &ActionDescriptor,
        context: &[String],
    ) -> (f32, Arguments) {
        let mut found = self.scorer.extract(text, descriptor);
        let none = Arguments::new();
        if self.scorer.score_with_arguments(text, descriptor, &found, &none) == 0.0 {
            return (0.0, none);
        }

        let carried = self.carried(descriptor, &found, context);
        let score = self
            .scorer
            .score_with_arguments(text, descriptor, &found, &carried);
        found.fill_missing(&carried);
        (score, found)
    }

    fn trace(&self, text: &str, scored: &[Scored], best: Option<usize>) -> ResolutionTrace {
        let threshold = self.config.min_confidence;
        let chosen = best.map(|i| scored[i].entry.action.clone());
        let candidates = scored
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let discarded = if !s.eligible {
                    Some("agent unavailable".to_string())
                } else if s.score < threshold {
                    Some(format!("below threshold {threshold:.2}"))
                } else if Some(i) != best {
                    chosen.as_ref().map(|c| format!("outranked by {c}"))
                } else {
                    None
                };
                CandidateScore {
                    action: s.entry.action.clone(),
                    score: s.score,
                    missing: s.missing.clone(),
                    discarded,
                }
            })
            .collect();

        ResolutionTrace {
            request: text.to_string(),
            threshold,
            candidates,
            chosen,
        }
    }

    fn resolve_explicit(
        &self,
        text: &str,
        entry: CatalogEntry,
        context: &[String],
    ) -> Result<Resolution, MeshError> {
        if entry.status != AgentStatus::Available {
            return Err(MeshError::unreachable(
                &entry.action.agent,
                "agent is marked unavailable",
            ));
        }

        let arguments = self.extract_with_context(text, &entry, context);
        let missing = entry.descriptor.missing_required(&arguments);
        if !missing.is_empty() {
            return Err(MeshError::IncompleteArguments {
                action: entry.action.to_string(),
                missing,
            });
        }

        tracing::info!(action = %entry.action, "Resolved explicit action reference");
        let trace = ResolutionTrace {
            request: text.to_string(),
            threshold: self.config.min_confidence,
            candidates: vec![CandidateScore {
                action: entry.action.clone(),
                score: 1.0,
                missing: Vec::new(),
                discarded: None,
            }],
            chosen: Some(entry.action.clone()),
        };
        Ok(Resolution {
            call: ResolvedCall {
                action: entry.action,
                arguments,
                confidence: 1.0,
            },
            trace,
        })
    }
}

/// Higher score first, then fewer unfilled parameters.
fn rank(a: &Scored, b: &Scored) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.missing.len().cmp(&b.missing.len()))
}

/// A token naming an action outright: `renewPolicy` or `policy.renewPolicy`.
fn explicit_reference(text: &str, index: &CatalogIndex) -> Result<Option<CatalogEntry>, MeshError> {
    let names = index.action_names();
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        let qualified = QualifiedName::parse(token).is_some_and(|q| index.get(&q).is_some());
        if qualified || names.iter().any(|n| n == token) {
            return index.resolve_name(token).map(Some);
        }
    }
    Ok(None)
}
