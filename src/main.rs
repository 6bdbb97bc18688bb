mod backend;
mod cli;
mod config;
mod coordinator;
mod error;
mod health;
mod jobs;
mod scheduler;
mod store;
mod submission;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use backend::RemoteJobClient;
use cli::{Cli, Command};
use config::CoordinatorConfig;
use coordinator::Coordinator;
use health::HealthMonitor;
use scheduler::Scheduler;
use store::JobStore;
use submission::GenerationForm;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = CoordinatorConfig::load(cli.config.as_deref())?;
    let client = RemoteJobClient::new(
        config.backends.clone(),
        config.connect_timeout(),
        config.request_timeout(),
    )
    .context("failed to build HTTP client")?;
    let backend = Arc::new(client);
    let catalog = config.backends.clone();

    match cli.command {
        Command::Models => {
            ui::print_models(&catalog);
        }
        Command::Health => {
            let monitor = HealthMonitor::new(backend, catalog.clone());
            let report = monitor.check_all().await;
            ui::print_health(&report, &catalog);
        }
        Command::Status => {
            let sets = JobStore::new(&config.store_path).load();
            ui::print_jobs(&sets, &backend);
        }
        Command::Submit(args) => {
            let coordinator = open_coordinator(backend, &config);
            let form = GenerationForm::from(args);
            let label = form
                .model
                .as_deref()
                .map(|m| catalog.display_name(m))
                .unwrap_or_else(|| "backend".to_string());

            let progress = ui::SubmitProgress::start(&label);
            match coordinator.submit(&form).await {
                Ok(job) => progress.accepted(&job),
                Err(e) => {
                    progress.failed();
                    return Err(e.into());
                }
            }
        }
        Command::Poll => {
            let coordinator = open_coordinator(Arc::clone(&backend), &config);
            let report = coordinator.reconcile_once().await;
            ui::print_cycle(&report);
            ui::print_jobs(&coordinator.snapshot().await, &backend);
        }
        Command::Remove { job_id, completed } => {
            let coordinator = open_coordinator(backend, &config);
            let job = if completed {
                coordinator.remove_completed(&job_id).await?
            } else {
                coordinator.remove_active(&job_id).await?
            };
            println!("Removed {} ({})", job.job_id, job.status);
        }
        Command::Watch => {
            watch(backend, &config).await?;
        }
    }

    Ok(())
}

// RUST_LOG wins; otherwise info, or debug with --verbose. Logs go to stderr.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "videosdgx=debug"
    } else {
        "videosdgx=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_coordinator(
    backend: Arc<RemoteJobClient>,
    config: &CoordinatorConfig,
) -> Coordinator<RemoteJobClient> {
    Coordinator::new(
        backend,
        config.backends.clone(),
        JobStore::new(&config.store_path),
    )
}

async fn watch(backend: Arc<RemoteJobClient>, config: &CoordinatorConfig) -> Result<()> {
    let catalog = config.backends.clone();
    let coordinator = Arc::new(open_coordinator(Arc::clone(&backend), config));
    let monitor = Arc::new(HealthMonitor::new(Arc::clone(&backend), catalog.clone()));
    let mut health = monitor.subscribe();

    let mut shown = coordinator.snapshot().await;
    ui::print_jobs(&shown, &backend);
    println!();

    let scheduler = Scheduler::start(
        Arc::clone(&coordinator),
        Arc::clone(&monitor),
        config.poll_interval(),
        config.health_interval(),
    );
    let mut cycles = scheduler.cycles();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = health.borrow_and_update().clone();
                ui::print_health(&report, &catalog);
            }
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = *cycles.borrow_and_update();
                // Re-render only when a cycle changed what the lists show.
                let sets = coordinator.snapshot().await;
                if sets != shown {
                    println!();
                    ui::print_cycle(&report);
                    ui::print_jobs(&sets, &backend);
                    shown = sets;
                }
            }
        }
    }

    scheduler.shutdown().await;
    println!();
    ui::print_health(&monitor.current(), &catalog);
    println!();
    ui::print_jobs(&coordinator.snapshot().await, &backend);
    Ok(())
}
