use std::collections::HashSet;

use super::job::Job;

/// What a reconciliation cycle learned about one job from its snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum PolledJob {
    /// Still in flight (or the poll failed); goes back to the active set.
    Pending(Job),
    /// The backend reported `completed`.
    Completed(Job),
}

impl PolledJob {
    pub fn job_id(&self) -> &str {
        match self {
            PolledJob::Pending(job) | PolledJob::Completed(job) => &job.job_id,
        }
    }
}

/// Result of offering a job to the completed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Inserted,
    AlreadyCompleted,
}

/// Counts produced by [`JobSets::commit_cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCommit {
    pub promoted: usize,
    /// Poll results thrown away because the user removed the job mid-cycle.
    pub discarded: usize,
    /// Jobs submitted while the cycle was polling.
    pub carried_over: usize,
}

/// The active and completed job lists.
///
/// Active jobs keep submission order. Completed jobs are most recently
/// completed first. A `job_id` is never present in both lists, nor twice in
/// one of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSets {
    active: Vec<Job>,
    completed: Vec<Job>,
}

impl JobSets {
    /// Build the sets from persisted lists, repairing duplicates.
    ///
    /// The first occurrence of an id wins inside each list, and an id found
    /// in the completed list is dropped from the active one.
    pub fn from_parts(active: Vec<Job>, completed: Vec<Job>) -> Self {
        let mut seen = HashSet::new();
        let completed: Vec<Job> = completed
            .into_iter()
            .filter(|job| seen.insert(job.job_id.clone()))
            .collect();
        let active = active
            .into_iter()
            .filter(|job| seen.insert(job.job_id.clone()))
            .collect();
        Self { active, completed }
    }

    pub fn active(&self) -> &[Job] {
        &self.active
    }

    pub fn completed(&self) -> &[Job] {
        &self.completed
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.is_active(job_id) || self.is_completed(job_id)
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.iter().any(|j| j.job_id == job_id)
    }

    pub fn is_completed(&self, job_id: &str) -> bool {
        self.completed.iter().any(|j| j.job_id == job_id)
    }

    /// Append a freshly submitted job. Returns `false`, leaving the sets
    /// untouched, if the id is already tracked.
    pub fn insert_active(&mut self, job: Job) -> bool {
        if self.contains(&job.job_id) {
            return false;
        }
        self.active.push(job);
        true
    }

    /// Put a job at the front of the completed list unless it is already
    /// there.
    pub fn promote(&mut self, job: Job) -> Promotion {
        if self.is_completed(&job.job_id) {
            return Promotion::AlreadyCompleted;
        }
        self.completed.insert(0, job);
        Promotion::Inserted
    }

    pub fn remove_active(&mut self, job_id: &str) -> Option<Job> {
        let idx = self.active.iter().position(|j| j.job_id == job_id)?;
        Some(self.active.remove(idx))
    }

    pub fn remove_completed(&mut self, job_id: &str) -> Option<Job> {
        let idx = self.completed.iter().position(|j| j.job_id == job_id)?;
        Some(self.completed.remove(idx))
    }

    /// Swap in the active list rebuilt by a reconciliation cycle.
    ///
    /// `polled` holds one entry per job of the cycle's snapshot, in snapshot
    /// order. The current active list may have moved on while the cycle was
    /// polling:
    /// - a polled job no longer active was removed by the user; its result is
    ///   discarded,
    /// - an active job absent from `polled` was submitted mid-cycle; it is
    ///   appended after the polled jobs.
    pub fn commit_cycle(&mut self, polled: Vec<PolledJob>) -> CycleCommit {
        let current = std::mem::take(&mut self.active);
        let live: HashSet<&str> = current.iter().map(|j| j.job_id.as_str()).collect();
        let polled_ids: HashSet<String> = polled.iter().map(|p| p.job_id().to_string()).collect();

        let mut commit = CycleCommit::default();
        let mut next = Vec::with_capacity(current.len());

        for outcome in polled {
            if !live.contains(outcome.job_id()) {
                commit.discarded += 1;
                continue;
            }
            match outcome {
                PolledJob::Pending(job) => next.push(job),
                PolledJob::Completed(job) => {
                    if self.promote(job) == Promotion::Inserted {
                        commit.promoted += 1;
                    }
                }
            }
        }

        for job in current {
            if !polled_ids.contains(&job.job_id) {
                commit.carried_over += 1;
                next.push(job);
            }
        }

        self.active = next;
        commit
    }
}
