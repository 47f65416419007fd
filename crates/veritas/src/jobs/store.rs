//! In-memory job store shared by the HTTP boundary and the runner.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use thiserror::Error;

use super::job::{Job, JobKind, JobStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Jobs by id. Reads return snapshots; each update happens under one write
/// guard, so readers never see a half-written job. Jobs are never removed.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Creates a pending job and returns a snapshot of it.
    pub fn create(&self, kind: JobKind) -> Job {
        let job = Job::new(kind);
        self.write().insert(job.id.clone(), job.clone());
        job
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn mark_running(&self, job_id: &str) -> Result<Job, JobStoreError> {
        self.transition(job_id, JobStatus::Running, |_| {})
    }

    pub fn complete(&self, job_id: &str, result: String, log: String) -> Result<Job, JobStoreError> {
        self.finish(job_id, JobStatus::Completed, result, log)
    }

    pub fn fail(&self, job_id: &str, result: String, log: String) -> Result<Job, JobStoreError> {
        self.finish(job_id, JobStatus::Failed, result, log)
    }

    fn finish(
        &self,
        job_id: &str,
        status: JobStatus,
        result: String,
        log: String,
    ) -> Result<Job, JobStoreError> {
        self.transition(job_id, status, |job| {
            job.result = Some(result);
            job.log = Some(log);
        })
    }

    fn transition(
        &self,
        job_id: &str,
        to: JobStatus,
        update: impl FnOnce(&mut Job),
    ) -> Result<Job, JobStoreError> {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;

        if !job.status.can_transition_to(to) {
            return Err(JobStoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from: job.status,
                to,
            });
        }

        update(job);
        job.status = to;
        if to.is_terminal() {
            job.completed_at = Some(Utc::now());
        }
        Ok(job.clone())
    }
}
