//! Output module for run verdicts and orchestrator signals
//!
//! This module handles:
//! - Evaluating the artifacts of a run into a pass/fail verdict
//! - Passing batch progress and verdicts to an orchestrating caller

mod evaluation;
mod run_output;

pub use evaluation::{
    discover_artifacts, evaluate_run, summarize, EvaluationReport, InvalidArtifact,
};
pub use run_output::RunOutput;
