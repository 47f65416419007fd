use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::AnalysisRequest;

/// Lifecycle of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Single,
    Duel,
}

impl From<&AnalysisRequest> for JobKind {
    fn from(request: &AnalysisRequest) -> Self {
        match request {
            AnalysisRequest::Single { .. } => Self::Single,
            AnalysisRequest::Duel { .. } => Self::Duel,
        }
    }
}

/// One analysis request and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Final report or failure reason. Written once, on entering a terminal state.
    pub result: Option<String>,
    /// Execution transcript. Written together with `result`.
    pub log: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Pending,
            result: None,
            log: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
