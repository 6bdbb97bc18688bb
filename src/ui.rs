//! Interface de terminal do videosdgx: spinner e listagens coloridas.
//!
//! Usa `indicatif` para o spinner de envio e `console` para estilizar as
//! listagens de jobs e de saúde dos backends. Tudo vai para stdout; os logs
//! ficam em stderr.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::backend::RemoteJobClient;
use crate::config::Catalog;
use crate::coordinator::CycleReport;
use crate::health::{BackendState, HealthReport};
use crate::jobs::{Job, JobSets, JobStatus};

/// Spinner exibido enquanto um pedido de geração está em voo.
pub struct SubmitProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl SubmitProgress {
    pub fn start(model_name: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Submitting to {model_name}..."));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Finaliza o spinner com o job aceito pelo backend.
    pub fn accepted(&self, job: &Job) {
        self.pb.finish_and_clear();
        println!(
            "  {} Job {} {}",
            self.green.apply_to("✓"),
            job.job_id,
            status_style(job.status).apply_to(job.status)
        );
        if let Some(position) = job.queue_position {
            println!("    queue position {position}");
        }
        if let Some(eta) = job.estimated_time_seconds {
            println!("    estimated {eta}s");
        }
    }

    /// Finaliza o spinner sinalizando falha; o detalhe vem do erro propagado.
    pub fn failed(&self) {
        self.pb.finish_and_clear();
        println!("  {} Submission failed", self.red.apply_to("✗"));
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Queued => Style::new().dim(),
        JobStatus::Processing => Style::new().cyan(),
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Failed => Style::new().red().bold(),
    }
}

/// Uma linha por job: id, modelo, status e progresso ou erro.
pub fn job_line(job: &Job) -> String {
    let mut line = format!(
        "{}  {:<10} {}",
        job.job_id,
        job.model_name,
        status_style(job.status).apply_to(job.status)
    );
    if let Some(progress) = job.visible_progress() {
        line.push_str(&format!(" {progress}%"));
    }
    if let Some(error) = &job.error {
        line.push_str(&format!(" ({error})"));
    }
    line
}

/// Imprime as duas listas. Jobs concluídos trazem a URL de download.
pub fn print_jobs(sets: &JobSets, client: &RemoteJobClient) {
    let header = Style::new().bold();

    println!("{}", header.apply_to(format!("Active ({})", sets.active().len())));
    if sets.active().is_empty() {
        println!("  {}", Style::new().dim().apply_to("no active jobs"));
    }
    for job in sets.active() {
        println!("  {}", job_line(job));
        println!("    {}", Style::new().dim().apply_to(&job.prompt));
    }

    println!();
    println!(
        "{}",
        header.apply_to(format!("Completed ({})", sets.completed().len()))
    );
    if sets.completed().is_empty() {
        println!("  {}", Style::new().dim().apply_to("no completed jobs"));
    }
    for job in sets.completed() {
        println!("  {}", job_line(job));
        if let Ok(url) = client.download_url(&job.model, &job.job_id) {
            println!("    {url}");
        }
    }
}

/// Uma linha de saúde para um backend.
pub fn health_line(model: &str, state: &BackendState, catalog: &Catalog) -> String {
    let name = catalog.display_name(model);
    match state {
        BackendState::Unknown => format!("{name:<10} {}", Style::new().dim().apply_to("unknown")),
        BackendState::Offline { reason } => format!(
            "{name:<10} {} {reason}",
            Style::new().red().bold().apply_to("offline")
        ),
        BackendState::Online(snapshot) => {
            let mut line = format!("{name:<10} {}", Style::new().green().bold().apply_to("online"));
            line.push_str(if snapshot.model_loaded {
                " model loaded"
            } else {
                " model not loaded"
            });
            if let (Some(used), Some(total)) = (snapshot.memory_used_gb, snapshot.memory_total_gb) {
                line.push_str(&format!(" | GPU {used:.1}/{total:.1} GB"));
            }
            if let Some(quantization) = &snapshot.quantization {
                line.push_str(&format!(" | {quantization}"));
            }
            if let Some(queue) = snapshot.queue_size {
                line.push_str(&format!(" | queue {queue}"));
            }
            line
        }
    }
}

pub fn print_health(report: &HealthReport, catalog: &Catalog) {
    let online = report.values().filter(|s| s.is_reachable()).count();
    let loaded = report
        .values()
        .filter_map(BackendState::snapshot)
        .filter(|s| s.model_loaded)
        .count();
    println!(
        "{}",
        Style::new()
            .bold()
            .apply_to(format!("Backends: {online}/{} online, {loaded} loaded", report.len()))
    );
    for (model, state) in report {
        println!("  {}", health_line(model, state, catalog));
    }
}

pub fn print_models(catalog: &Catalog) {
    println!("{}", Style::new().bold().apply_to(format!("Models ({})", catalog.len())));
    if catalog.is_empty() {
        println!("  {}", Style::new().dim().apply_to("no backends configured"));
    }
    for (key, entry) in catalog.iter() {
        println!("  {key:<8} {:<10} {}", entry.name, entry.base_url);
    }
}

pub fn print_cycle(report: &CycleReport) {
    println!(
        "  polled {}, updated {}, completed {}, failed polls {}",
        report.polled, report.updated, report.promoted, report.poll_failures
    );
}
