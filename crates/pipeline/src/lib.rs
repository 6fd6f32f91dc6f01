//! Migration pipeline: analysis, decision ledger, orchestration, execution.
//!
//! Pure planning lives in `arkivo-core`; this crate wires it to the
//! database and cloud layers. Each phase isolates per-event failures so a
//! bad event never sinks the run.

pub mod analyzer;
pub mod decisions;
pub mod error;
pub mod executor;
pub mod orchestrator;

pub use error::PipelineError;
