pub(crate) mod job;
mod sets;

pub use job::{Job, JobStatus};
pub use sets::{CycleCommit, JobSets, PolledJob, Promotion};
