//! HTTP boundary: start jobs, poll their status, describe the input.

pub mod error;
mod routes;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::ai::OpenAiCompatClient;
use crate::chain::BlockfrostClient;
use crate::config::Config;
use crate::error::ConfigError;
use crate::jobs::{JobRunner, JobStore};
use crate::pipeline::Pipeline;

pub use error::ApiError;
pub use types::{InputData, JobResponse, StartJobRequest, INVALID_ADDRESS_DETAIL};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(runner: Arc<JobRunner>) -> Self {
        Self {
            store: Arc::clone(runner.store()),
            runner,
        }
    }

    /// Wires the Blockfrost fetcher, the inference client, an empty job
    /// store and the runner from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let source = Arc::new(BlockfrostClient::from_config(&config.blockfrost)?);
        let backend = Arc::new(OpenAiCompatClient::from_config(&config.inference)?);
        info!(
            network = %source.network(),
            model = backend.model(),
            inference_url = %config.inference.base_url,
            "Analysis clients ready"
        );

        let pipeline = Arc::new(Pipeline::new(source, backend));
        let runner = JobRunner::new(Arc::new(JobStore::new()), pipeline);
        Ok(Self::new(Arc::new(runner)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start_job", post(routes::start_job))
        .route("/status", get(routes::job_status))
        .route("/input_schema", get(routes::get_input_schema))
        .route("/health", get(routes::health))
        .fallback(routes::handler_404)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves, then drains
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    info!("Listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
