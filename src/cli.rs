//! Interface de linha de comando do prepflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (process, status,
//! artifacts) e flags globais que sobrescrevem `prepflow.toml`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::PrepflowConfig;
use crate::transport::SourceKind;

/// prepflow: orquestrador de jobs de ingestão e geração de material de estudo.
#[derive(Debug, Parser)]
#[command(name = "prepflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// URL base da API de jobs (sobrescreve o arquivo e o ambiente).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Projeto dos jobs e artefatos.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Intervalo de polling em milissegundos.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Tipo de fonte aceito pela CLI, mapeado para [`SourceKind`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Vídeo do YouTube (URL).
    Youtube,
    /// Arquivo de áudio.
    Audio,
    /// Arquivo de vídeo.
    Video,
    /// Documento PDF.
    Pdf,
    /// Apresentação PowerPoint.
    Pptx,
    /// Documento Markdown.
    Md,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Youtube => SourceKind::Youtube,
            SourceArg::Audio => SourceKind::Audio,
            SourceArg::Video => SourceKind::Video,
            SourceArg::Pdf => SourceKind::Pdf,
            SourceArg::Pptx => SourceKind::Pptx,
            SourceArg::Md => SourceKind::Md,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingere uma fonte e gera todos os materiais a partir dela.
    Process {
        /// Tipo da fonte.
        #[arg(long, value_enum)]
        kind: SourceArg,

        /// URL ou caminho do arquivo.
        source: String,

        /// Nome exibido da fonte.
        #[arg(long, default_value = "Untitled")]
        name: String,
    },

    /// Mostra o status atual de um job.
    Status {
        /// Identificador do job.
        job_id: String,
    },

    /// Lista os artefatos do projeto.
    Artifacts,
}

impl Cli {
    /// Aplica as flags globais sobre a configuração carregada.
    pub fn apply_overrides(&self, config: &mut PrepflowConfig) {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(project) = &self.project {
            config.project_id = project.clone();
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
    }
}
