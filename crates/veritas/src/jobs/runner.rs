use std::any::Any;
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, warn, Instrument};

use crate::pipeline::{AnalysisRequest, Pipeline, PipelineError, TracingProgress};

use super::job::{Job, JobKind, JobStatus};
use super::store::JobStore;

/// Handle to a scheduled job. Dropping it detaches the job; it still runs.
pub struct JobHandle {
    job_id: String,
    handle: JoinHandle<JobStatus>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Waits for the job to reach a terminal state.
    pub async fn wait(self) -> JobStatus {
        match self.handle.await {
            Ok(status) => status,
            Err(e) => {
                error!(job_id = %self.job_id, "Job supervisor failed: {}", e);
                JobStatus::Failed
            }
        }
    }
}

/// Schedules pipeline runs for jobs and records their outcome in the store.
pub struct JobRunner {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
}

impl JobRunner {
    pub fn new(store: Arc<JobStore>, pipeline: Arc<Pipeline>) -> Self {
        Self { store, pipeline }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Creates a pending job for `request` and schedules it.
    /// Returns the job as it was before execution started.
    pub fn start(&self, request: AnalysisRequest) -> (Job, JobHandle) {
        let job = self.store.create(JobKind::from(&request));
        let handle = self.submit(&job.id, request);
        (job, handle)
    }

    /// Schedules an existing pending job. A job that is no longer pending is
    /// left untouched.
    pub fn submit(&self, job_id: &str, request: AnalysisRequest) -> JobHandle {
        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        let id = job_id.to_string();
        let span = info_span!("job", job_id = %id, kind = request.kind());

        let handle = tokio::spawn(supervise(store, pipeline, id.clone(), request).instrument(span));

        JobHandle { job_id: id, handle }
    }
}

async fn supervise(
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    job_id: String,
    request: AnalysisRequest,
) -> JobStatus {
    if let Err(e) = store.mark_running(&job_id) {
        warn!("Not starting job: {}", e);
        return store
            .get(&job_id)
            .map(|job| job.status)
            .unwrap_or(JobStatus::Failed);
    }
    info!("Job started");

    // The pipeline runs in its own task so a panic surfaces here as a JoinError.
    let task_job_id = job_id.clone();
    let task = tokio::spawn(
        async move {
            let progress = TracingProgress::new(&task_job_id);
            let (result, ctx) = pipeline.run(request, &progress).await;
            (result, ctx.into_transcript())
        }
        .in_current_span(),
    );

    let outcome = match task.await {
        Ok((Ok(report), transcript)) => store.complete(&job_id, report, transcript),
        Ok((Err(PipelineError::DataUnavailable(message)), _)) => {
            store.fail(&job_id, message.clone(), message)
        }
        Ok((Err(e), transcript)) => {
            let diagnostic = format!("An error occurred: {}", e);
            store.fail(&job_id, diagnostic.clone(), transcript + &diagnostic)
        }
        Err(join_error) => {
            let diagnostic = format!("An error occurred: {}", describe_join_error(join_error));
            error!("{}", diagnostic);
            store.fail(&job_id, diagnostic.clone(), diagnostic)
        }
    };

    match outcome {
        Ok(job) => {
            info!(status = %job.status, "Job finished");
            job.status
        }
        Err(e) => {
            error!("Failed to record job outcome: {}", e);
            JobStatus::Failed
        }
    }
}

fn describe_join_error(e: JoinError) -> String {
    if e.is_cancelled() {
        return "pipeline task was cancelled".to_string();
    }
    match e.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(e) => e.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("pipeline panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("pipeline panicked: {}", s)
    } else {
        "pipeline panicked".to_string()
    }
}
