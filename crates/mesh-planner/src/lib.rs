//! # mesh-planner
//!
//! Natural-language dispatch for the mesh.
//!
//! ```text
//!   "For CUST-1, check their policies and then submit a claim for $5000"
//!        │
//!        ▼
//!   ConjunctionPlanner ── PipelinePlan { steps, mode, shared_context }
//!        │
//!        ▼ per step
//!   IntentResolver ── Scorer::score / Scorer::extract ── ResolvedCall
//! ```
//!
//! Scoring is pluggable behind [`Scorer`]; [`KeywordScorer`] is the
//! deterministic default.

mod extract;
pub mod planner;
pub mod resolver;
pub mod scorer;
mod text;

pub use planner::{ConjunctionPlanner, ExecutionMode, PipelinePlan, PlannedStep, Planner};
pub use resolver::{CandidateScore, IntentResolver, Resolution, ResolutionTrace};
pub use scorer::{KeywordScorer, Scorer};
