//! Periodic drivers for reconciliation and health checks.
//!
//! Each loop runs one cycle per tick and waits for it to settle before the
//! next one, so cycles of the same kind never overlap. Cancelling the token
//! stops both loops. A cycle whose polls were in flight at cancellation is
//! still awaited but its results are dropped. Every committed cycle is
//! published as a [`CycleReport`] on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::JobBackend;
use crate::coordinator::{Coordinator, CycleReport};
use crate::health::HealthMonitor;

pub struct Scheduler {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    cycles: watch::Receiver<CycleReport>,
}

impl Scheduler {
    /// Spawn both loops. The first cycle of each runs immediately.
    pub fn start<B: JobBackend + 'static>(
        coordinator: Arc<Coordinator<B>>,
        monitor: Arc<HealthMonitor<B>>,
        poll_every: Duration,
        health_every: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let (cycle_tx, cycles) = watch::channel(CycleReport::default());
        let handles = vec![
            tokio::spawn(run_reconciliation(
                coordinator,
                poll_every,
                cycle_tx,
                token.clone(),
            )),
            tokio::spawn(run_health_checks(monitor, health_every, token.clone())),
        ];
        info!(
            poll_every = ?poll_every,
            health_every = ?health_every,
            "scheduler started"
        );
        Self {
            token,
            handles,
            cycles,
        }
    }

    /// Reports of committed reconciliation cycles, latest first.
    pub fn cycles(&self) -> watch::Receiver<CycleReport> {
        self.cycles.clone()
    }

    /// A token that is cancelled when the scheduler stops.
    #[cfg(test)]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop both loops and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduler task ended abnormally");
            }
        }
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn ticker(every: Duration) -> Interval {
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run_reconciliation<B: JobBackend>(
    coordinator: Arc<Coordinator<B>>,
    every: Duration,
    cycles: watch::Sender<CycleReport>,
    token: CancellationToken,
) {
    let mut ticker = ticker(every);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let cycle = coordinator.poll_active().await;
        if token.is_cancelled() {
            debug!(polled = cycle.report().polled, "shutdown during cycle, discarding results");
            break;
        }

        let report = coordinator.commit(cycle).await;
        if report.polled > 0 {
            debug!(
                polled = report.polled,
                updated = report.updated,
                promoted = report.promoted,
                poll_failures = report.poll_failures,
                discarded = report.discarded,
                carried_over = report.carried_over,
                "reconciliation cycle"
            );
        }
        cycles.send_replace(report);
    }
    debug!("reconciliation loop stopped");
}

async fn run_health_checks<B: JobBackend>(
    monitor: Arc<HealthMonitor<B>>,
    every: Duration,
    token: CancellationToken,
) {
    let mut ticker = ticker(every);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let report = monitor.poll_all().await;
        if token.is_cancelled() {
            break;
        }
        monitor.publish(report);
    }
    debug!("health loop stopped");
}
