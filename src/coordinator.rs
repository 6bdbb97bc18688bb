use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::JobBackend;
use crate::config::Catalog;
use crate::error::CoordinatorError;
use crate::jobs::{Job, JobSets, JobStatus, PolledJob};
use crate::store::JobStore;
use crate::submission::GenerationForm;

/// Counts describing one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub polled: usize,
    /// Jobs whose record changed after merging the remote status.
    pub updated: usize,
    pub promoted: usize,
    pub poll_failures: usize,
    /// Results dropped because the job was removed while it was being polled.
    pub discarded: usize,
    /// Jobs submitted while the cycle was polling.
    pub carried_over: usize,
}

/// Poll results of a cycle that have not been committed yet.
#[derive(Debug)]
pub struct PendingCycle {
    polled: Vec<PolledJob>,
    report: CycleReport,
}

impl PendingCycle {
    pub fn report(&self) -> CycleReport {
        self.report
    }
}

// Last state read from or written to the store. `unsaved` is set when a
// write failed, so the file is older than `sets` and must not be reloaded.
#[derive(Debug)]
struct Tracked {
    sets: JobSets,
    unsaved: bool,
}

/// Owns the active and completed job sets and every operation that
/// mutates them: submission, reconciliation and user removal.
///
/// The store file is the shared source of truth. Every mutation reloads it
/// under the store lock, applies its change and writes it back, so jobs
/// submitted or removed by another process using the same store survive.
/// Neither lock is held across a backend call.
pub struct Coordinator<B> {
    backend: Arc<B>,
    catalog: Catalog,
    store: JobStore,
    state: Mutex<Tracked>,
}

impl<B: JobBackend> Coordinator<B> {
    /// Create a coordinator, restoring whatever the store holds.
    pub fn new(backend: Arc<B>, catalog: Catalog, store: JobStore) -> Self {
        let sets = store.load();
        debug!(
            active = sets.active().len(),
            completed = sets.completed().len(),
            path = %store.path().display(),
            "restored job store"
        );
        Self {
            backend,
            catalog,
            store,
            state: Mutex::new(Tracked {
                sets,
                unsaved: false,
            }),
        }
    }

    /// A consistent copy of both sets, as currently stored.
    pub async fn snapshot(&self) -> JobSets {
        let mut state = self.state.lock().await;
        self.refresh(&mut state);
        state.sets.clone()
    }

    /// Validate a form, submit it and start tracking the resulting job.
    ///
    /// Nothing is recorded unless the backend accepted the job.
    pub async fn submit(&self, form: &GenerationForm) -> Result<Job, CoordinatorError> {
        let submission = form.validate(&self.catalog)?;
        let handle = self
            .backend
            .submit(&submission.model, &submission.request)
            .await?;

        let model_name = self.catalog.display_name(&submission.model);
        let job = Job::from_submission(handle, &submission, model_name, Utc::now());

        let mut state = self.state.lock().await;
        self.mutate(&mut state, |sets| {
            if sets.insert_active(job.clone()) {
                Ok(())
            } else {
                Err(CoordinatorError::DuplicateJob(job.job_id.clone()))
            }
        })?;

        info!(job_id = %job.job_id, model = %job.model, status = %job.status, "job submitted");
        Ok(job)
    }

    /// Poll every active job once, in submission order, without touching
    /// the sets.
    pub async fn poll_active(&self) -> PendingCycle {
        let snapshot = {
            let mut state = self.state.lock().await;
            self.refresh(&mut state);
            state.sets.active().to_vec()
        };
        let mut report = CycleReport {
            polled: snapshot.len(),
            ..CycleReport::default()
        };
        let mut polled = Vec::with_capacity(snapshot.len());

        for job in snapshot {
            match self.backend.fetch_status(&job.model, &job.job_id).await {
                Ok(update) => {
                    let mut merged = job.clone();
                    merged.merge(&update);
                    if merged != job {
                        report.updated += 1;
                        debug!(job_id = %merged.job_id, status = %merged.status, progress = ?merged.progress, "job updated");
                    }
                    if merged.status == JobStatus::Completed {
                        polled.push(PolledJob::Completed(merged));
                    } else {
                        polled.push(PolledJob::Pending(merged));
                    }
                }
                Err(e) => {
                    report.poll_failures += 1;
                    warn!(job_id = %job.job_id, model = %job.model, error = %e, "status poll failed, keeping last known state");
                    polled.push(PolledJob::Pending(job));
                }
            }
        }

        PendingCycle { polled, report }
    }

    /// Swap the polled results into the sets and persist.
    pub async fn commit(&self, cycle: PendingCycle) -> CycleReport {
        let PendingCycle { polled, mut report } = cycle;
        let mut state = self.state.lock().await;
        let Ok(commit) =
            self.mutate::<_, Infallible>(&mut state, |sets| Ok(sets.commit_cycle(polled)));

        report.promoted = commit.promoted;
        report.discarded = commit.discarded;
        report.carried_over = commit.carried_over;
        if report.promoted > 0 {
            info!(promoted = report.promoted, "jobs completed");
        }
        report
    }

    /// One full reconciliation cycle.
    pub async fn reconcile_once(&self) -> CycleReport {
        let cycle = self.poll_active().await;
        self.commit(cycle).await
    }

    pub async fn remove_active(&self, job_id: &str) -> Result<Job, CoordinatorError> {
        let mut state = self.state.lock().await;
        let job = self.mutate(&mut state, |sets| {
            sets.remove_active(job_id)
                .ok_or_else(|| CoordinatorError::JobNotFound(job_id.to_string()))
        })?;
        info!(job_id, "removed active job");
        Ok(job)
    }

    pub async fn remove_completed(&self, job_id: &str) -> Result<Job, CoordinatorError> {
        let mut state = self.state.lock().await;
        let job = self.mutate(&mut state, |sets| {
            sets.remove_completed(job_id)
                .ok_or_else(|| CoordinatorError::JobNotFound(job_id.to_string()))
        })?;
        info!(job_id, "removed completed job");
        Ok(job)
    }

    fn refresh(&self, state: &mut Tracked) {
        if !state.unsaved {
            state.sets = self.store.load();
        }
    }

    // Reload, apply `change` and write back while holding the store lock.
    // Nothing is written when `change` fails. A failed lock or save is
    // logged and the in-memory sets carry on.
    fn mutate<T, E>(
        &self,
        state: &mut Tracked,
        change: impl FnOnce(&mut JobSets) -> Result<T, E>,
    ) -> Result<T, E> {
        let lock = match self.store.lock() {
            Ok(lock) => Some(lock),
            Err(e) => {
                warn!(path = %self.store.path().display(), error = %e, "failed to lock job store");
                None
            }
        };
        if lock.is_some() {
            self.refresh(state);
        }

        let out = change(&mut state.sets)?;
        state.unsaved = match self.store.save(&state.sets) {
            Ok(()) => false,
            Err(e) => {
                warn!(path = %self.store.path().display(), error = %e, "failed to persist job sets");
                true
            }
        };
        drop(lock);
        Ok(out)
    }
}
