//! # mesh-runtime
//!
//! Runs requests against the agent catalog in one of two modes:
//!
//! - **single**: [`Mesh::resolve_and_invoke`] resolves the text to one action
//!   and calls it.
//! - **pipeline**: [`Mesh::run_pipeline`] plans a compound request, runs its
//!   steps sequentially or concurrently, and merges the outputs in plan
//!   order.
//!
//! ```text
//! Planning ──▶ Executing ──▶ Merging ──▶ Done
//!    │             │
//!    ▼             ▼
//!  Failed    PartialFailure { completed, failed_step, error }
//! ```
//!
//! Transport failures retry with capped exponential backoff. Semantic errors
//! surface at once. Whatever completed before a failure is always returned.

pub mod cancel;
pub mod events;
pub mod merge;
pub mod mesh;
pub mod pipeline;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use events::{PipelineEvent, PipelineEventSink, RecordingEventSink, TracingEventSink};
pub use merge::{MergedResponse, PipelineError, Section};
pub use mesh::Mesh;
pub use pipeline::{Invocation, Pipeline, RunOptions};

pub use mesh_planner::ExecutionMode;
