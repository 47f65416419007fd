use tracing::{info, warn};

/// Events emitted by the pipeline while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Fetching {
        wallets: usize,
    },
    StageStarted {
        stage: String,
        index: usize,
        total: usize,
    },
    StageFinished {
        stage: String,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes pipeline progress to the log, tagged with the job it belongs to.
pub struct TracingProgress {
    job_id: String,
}

impl TracingProgress {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }
}

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Fetching { wallets } => {
                info!(job_id = %self.job_id, wallets, "Fetching on-chain data");
            }
            ProgressEvent::StageStarted {
                stage,
                index,
                total,
            } => {
                info!(job_id = %self.job_id, %stage, "Stage {}/{} started", index + 1, total);
            }
            ProgressEvent::StageFinished { stage } => {
                info!(job_id = %self.job_id, %stage, "Stage finished");
            }
            ProgressEvent::Failed { error } => {
                warn!(job_id = %self.job_id, %error, "Pipeline failed");
            }
        }
    }
}
