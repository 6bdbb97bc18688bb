//! Interface de linha de comando do videosdgx baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (watch, submit, poll,
//! health, status, remove, models) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::submission::{
    DEFAULT_DURATION, DEFAULT_FPS, DEFAULT_GUIDANCE_SCALE, DEFAULT_RESOLUTION, GenerationForm,
};

/// videosdgx: acompanha jobs de geração de vídeo em backends remotos.
#[derive(Debug, Parser)]
#[command(name = "videosdgx", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./videosdgx.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcilia jobs e verifica backends periodicamente até Ctrl-C.
    Watch,

    /// Envia um novo pedido de geração.
    Submit(SubmitArgs),

    /// Executa um único ciclo de reconciliação.
    Poll,

    /// Verifica cada backend uma vez.
    Health,

    /// Lista os jobs ativos e concluídos.
    Status,

    /// Remove um job da lista ativa (ou da concluída com --completed).
    Remove {
        job_id: String,

        #[arg(long)]
        completed: bool,
    },

    /// Lista os modelos configurados.
    Models,
}

/// Campos do formulário de geração. Os números chegam como texto e só são
/// validados em [`GenerationForm::validate`].
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Chave do modelo (ltx2, wan21, magi1, waver...).
    #[arg(long, short)]
    pub model: Option<String>,

    /// Descrição do vídeo a gerar.
    pub prompt: String,

    /// Duração em segundos.
    #[arg(long, default_value = DEFAULT_DURATION)]
    pub duration: String,

    #[arg(long, default_value = DEFAULT_FPS)]
    pub fps: String,

    /// Resolução no formato LARGURAxALTURA.
    #[arg(long, default_value = DEFAULT_RESOLUTION)]
    pub resolution: String,

    #[arg(long, default_value = DEFAULT_GUIDANCE_SCALE)]
    pub guidance_scale: String,

    /// Semente opcional; vazia deixa o backend escolher.
    #[arg(long)]
    pub seed: Option<String>,
}

impl From<SubmitArgs> for GenerationForm {
    fn from(args: SubmitArgs) -> Self {
        GenerationForm {
            model: args.model,
            prompt: args.prompt,
            duration: args.duration,
            fps: args.fps,
            resolution: args.resolution,
            guidance_scale: args.guidance_scale,
            seed: args.seed,
        }
    }
}
