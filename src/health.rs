//! Backend health monitoring.
//!
//! Every pass asks each catalogued backend for `/info` and rebuilds the whole
//! report from scratch: a backend that fails is `Offline` with no snapshot,
//! whatever it reported before. Reports are published on a
//! [`tokio::sync::watch`] channel. Job state is never touched here.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{HealthSnapshot, JobBackend};
use crate::config::Catalog;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendState {
    /// Not checked yet.
    Unknown,
    Online(HealthSnapshot),
    Offline { reason: String },
}

impl BackendState {
    pub fn is_reachable(&self) -> bool {
        matches!(self, BackendState::Online(_))
    }

    pub fn snapshot(&self) -> Option<&HealthSnapshot> {
        match self {
            BackendState::Online(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Health of every catalogued backend, keyed by model.
pub type HealthReport = BTreeMap<String, BackendState>;

pub struct HealthMonitor<B> {
    backend: Arc<B>,
    catalog: Catalog,
    tx: watch::Sender<HealthReport>,
}

impl<B: JobBackend> HealthMonitor<B> {
    pub fn new(backend: Arc<B>, catalog: Catalog) -> Self {
        let initial = catalog
            .keys()
            .map(|k| (k.to_string(), BackendState::Unknown))
            .collect();
        let (tx, _) = watch::channel(initial);
        Self {
            backend,
            catalog,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthReport> {
        self.tx.subscribe()
    }

    /// The last published report.
    pub fn current(&self) -> HealthReport {
        self.tx.borrow().clone()
    }

    /// Query every backend once, in catalog order, without publishing.
    pub async fn poll_all(&self) -> HealthReport {
        let mut report = HealthReport::new();
        for model in self.catalog.keys() {
            let state = match self.backend.fetch_health(model).await {
                Ok(snapshot) => BackendState::Online(snapshot),
                Err(e) => {
                    debug!(model, error = %e, "health check failed");
                    BackendState::Offline {
                        reason: e.to_string(),
                    }
                }
            };
            report.insert(model.to_string(), state);
        }
        report
    }

    /// Replace the published report, logging backends that changed
    /// reachability.
    pub fn publish(&self, report: HealthReport) {
        let previous = self.tx.send_replace(report.clone());
        for (model, state) in &report {
            let unchanged = matches!(
                (previous.get(model), state),
                (Some(BackendState::Online(_)), BackendState::Online(_))
                    | (Some(BackendState::Offline { .. }), BackendState::Offline { .. })
            );
            if unchanged {
                continue;
            }
            match state {
                BackendState::Online(snapshot) => {
                    info!(model = %model, model_loaded = snapshot.model_loaded, "backend online");
                }
                BackendState::Offline { reason } => {
                    warn!(model = %model, %reason, "backend offline");
                }
                BackendState::Unknown => {}
            }
        }
    }

    /// One full pass: poll every backend and publish the result.
    pub async fn check_all(&self) -> HealthReport {
        let report = self.poll_all().await;
        self.publish(report.clone());
        report
    }
}
