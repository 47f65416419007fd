use thiserror::Error;

use crate::ai::InferenceError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Wallet data could not be fetched; no stage ran. The message is
    /// user-facing.
    #[error("{0}")]
    DataUnavailable(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPlan(String),

    #[error("Stage '{stage}' cannot run: dependency '{dependency}' has produced no output")]
    MissingDependency {
        stage: String,
        dependency: String,
    },

    #[error("Stage '{stage}' references unknown prompt variable '{placeholder}'")]
    Template { stage: String, placeholder: String },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: InferenceError,
    },
}
