//! Request-to-action relevance scoring.

use crate::extract::{extract_arguments, names_a_record};
use crate::text::{content_words, descriptor_keywords};
use mesh_core::{ActionDescriptor, Arguments};
use std::collections::HashSet;

/// Scores how well a request matches an action and pulls arguments out of it.
///
/// Implementations must be deterministic: the same text and descriptor
/// always give the same score.
pub trait Scorer: Send + Sync {
    /// Relevance in `0.0..=1.0`.
    fn score(&self, text: &str, descriptor: &ActionDescriptor) -> f32;

    /// Best-effort argument extraction. Missing parameters are simply absent.
    fn extract(&self, text: &str, descriptor: &ActionDescriptor) -> Arguments;

    /// Relevance once arguments are known: `found` came from `text` itself,
    /// `carried` from earlier results or shared context.
    fn score_with_arguments(
        &self,
        text: &str,
        descriptor: &ActionDescriptor,
        _found: &Arguments,
        _carried: &Arguments,
    ) -> f32 {
        self.score(text, descriptor)
    }
}

/// Weight of a record reference carried over from context, relative to one
/// stated in the request.
const CARRIED_RECORD_WEIGHT: f32 = 0.5;

/// Keyword overlap blended with how many required parameters the text
/// can fill.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    lexical_weight: f32,
}

impl KeywordScorer {
    pub fn new(lexical_weight: f32) -> Self {
        Self {
            lexical_weight: lexical_weight.clamp(0.0, 1.0),
        }
    }

    /// Share of the action's keywords present in the text.
    pub fn lexical(&self, text: &str, descriptor: &ActionDescriptor) -> f32 {
        let keywords = descriptor_keywords(descriptor);
        if keywords.is_empty() {
            return 0.0;
        }
        let words: HashSet<String> = content_words(text).into_iter().collect();
        let hits = keywords.iter().filter(|k| words.contains(*k)).count();
        hits as f32 / keywords.len() as f32
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl Scorer for KeywordScorer {
    fn score(&self, text: &str, descriptor: &ActionDescriptor) -> f32 {
        if self.lexical(text, descriptor) == 0.0 {
            return 0.0;
        }
        let found = self.extract(text, descriptor);
        self.score_with_arguments(text, descriptor, &found, &Arguments::new())
    }

    fn extract(&self, text: &str, descriptor: &ActionDescriptor) -> Arguments {
        extract_arguments(text, descriptor)
    }

    /// Carried values count only for record references, at half weight.
    fn score_with_arguments(
        &self,
        text: &str,
        descriptor: &ActionDescriptor,
        found: &Arguments,
        carried: &Arguments,
    ) -> f32 {
        let lexical = self.lexical(text, descriptor);
        if lexical == 0.0 {
            return 0.0;
        }

        let required: Vec<_> = descriptor.required_parameters().collect();
        let evidence = if required.is_empty() {
            lexical
        } else {
            let filled: f32 = required
                .iter()
                .map(|p| {
                    if found.contains(&p.name) {
                        1.0
                    } else if carried.contains(&p.name) && names_a_record(p) {
                        CARRIED_RECORD_WEIGHT
                    } else {
                        0.0
                    }
                })
                .sum();
            filled / required.len() as f32
        };

        (self.lexical_weight * lexical + (1.0 - self.lexical_weight) * evidence).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::ParamKind;

    fn list_policies() -> ActionDescriptor {
        ActionDescriptor::new("listCustomerPolicies", "List all active policies for a customer")
            .param("customerId", ParamKind::String)
    }

    fn claims_summary() -> ActionDescriptor {
        ActionDescriptor::new("getClaimsSummary", "Get a summary of claims for a customer")
            .param("customerId", ParamKind::String)
    }

    #[test]
    fn unrelated_text_scores_zero() {
        let scorer = KeywordScorer::default();
        assert_eq!(scorer.score("what's the weather", &list_policies()), 0.0);
    }

    #[test]
    fn matching_action_outranks_neighbour() {
        let scorer = KeywordScorer::default();
        let text = "check customer CUST-12345's active policies";
        let policies = scorer.score(text, &list_policies());
        let claims = scorer.score(text, &claims_summary());
        assert!(policies > claims, "{policies} <= {claims}");
        assert!(policies >= 0.5);
    }

    #[test]
    fn extracted_arguments_raise_the_score() {
        let scorer = KeywordScorer::default();
        let without = scorer.score("list active customer policies", &list_policies());
        let with = scorer.score("list active customer policies for CUST-1", &list_policies());
        assert!(with > without);
        assert!((with - 1.0).abs() < 1e-6);
    }

    #[test]
    fn carried_record_ids_count_half() {
        let scorer = KeywordScorer::default();
        let summary = ActionDescriptor::new("getClaimsSummary", "Get claims summary for a policy")
            .param("policyNumber", ParamKind::String);
        let submit = ActionDescriptor::new("submitClaim", "Submit a new insurance claim")
            .param("policyNumber", ParamKind::String)
            .param("claimType", ParamKind::String)
            .param("claimAmount", ParamKind::Decimal);
        let text = "show any pending claims";

        let carried = Arguments::new().with("policyNumber", "POL-12345");
        let plain = scorer.score(text, &summary);
        let with_id = scorer.score_with_arguments(text, &summary, &Arguments::new(), &carried);
        assert!((with_id - plain - 0.15).abs() < 1e-6, "{plain} -> {with_id}");

        // Amounts and types picked up from context are not evidence.
        let carried = carried.with("claimType", "Life").with("claimAmount", 500_000.0);
        let submit_score = scorer.score_with_arguments(text, &submit, &Arguments::new(), &carried);
        assert!(with_id > submit_score, "{with_id} <= {submit_score}");
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = KeywordScorer::default();
        let text = "show any pending claims for CUST-9";
        assert_eq!(
            scorer.score(text, &claims_summary()),
            scorer.score(text, &claims_summary())
        );
    }
}
