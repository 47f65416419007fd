pub mod context;
pub mod error;
pub mod plans;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stage;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use plans::{duel_plan, single_wallet_plan, AnalysisRequest, StagePlan};
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter, TracingProgress};
pub use runner::Pipeline;
pub use stage::{OutputPolicy, PromptTemplate, Stage, StageMode};
