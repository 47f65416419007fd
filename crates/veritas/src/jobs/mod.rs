//! Job lifecycle: the shared store and the background runner.

pub mod job;
pub mod runner;
pub mod store;

pub use job::{Job, JobKind, JobStatus};
pub use runner::{JobHandle, JobRunner};
pub use store::{JobStore, JobStoreError};
