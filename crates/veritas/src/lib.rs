pub mod ai;
pub mod chain;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod secrets;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use ai::{ChatBackend, InferenceError, OpenAiCompatClient};
pub use chain::{BlockfrostClient, CardanoNetwork, FetchError, WalletDataSource, WalletSummary};
pub use config::{load_config, load_from_env, Config};
pub use error::{ConfigError, Result, VeritasError};
pub use jobs::{Job, JobRunner, JobStatus, JobStore};
pub use pipeline::{AnalysisRequest, Pipeline, PipelineContext, PipelineError};
pub use secrets::{resolve_secret, SecretError, SecretSource};
pub use server::{router, AppState};
