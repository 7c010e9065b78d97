//! Configuração do prepflow carregada a partir de `prepflow.toml`.
//!
//! A struct [`PrepflowConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `PREPFLOW_API_URL` e `PREPFLOW_PROJECT_ID` têm
//! precedência sobre o arquivo; flags da CLI têm precedência sobre ambas.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::PrepflowError;
use crate::orchestrator::OrchestratorSettings;
use crate::poller::PollConfig;
use crate::transport::{DEFAULT_BASE_URL, HttpJobClient};

pub const CONFIG_FILE: &str = "prepflow.toml";

/// Configuração de nível superior carregada de `prepflow.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrepflowConfig {
    /// URL base da API de jobs (inclui o prefixo `/api`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Projeto ao qual os jobs e artefatos pertencem.
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Intervalo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tempo máximo de polling por job, em segundos. `0` desativa o limite.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Timeout de conexão HTTP, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Valor padrão da URL base: backend local.
fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

// Projeto padrão usado pelo backend em desenvolvimento.
fn default_project_id() -> String {
    "00000000-0000-0000-0000-000000000001".to_string()
}

// Valor padrão do intervalo de polling: 2000ms.
fn default_poll_interval_ms() -> u64 {
    2000
}

// Valor padrão do timeout de polling: 10 minutos.
fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for PrepflowConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            project_id: default_project_id(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PrepflowConfig {
    /// Carrega a configuração de `prepflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de `path`, aplicando as variáveis de ambiente.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse(&contents).with_context(|| format!("invalid {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, PrepflowError> {
        Ok(toml::from_str::<PrepflowConfig>(contents)?)
    }

    // Variáveis de ambiente não vazias sobrescrevem o arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PREPFLOW_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(project) = lookup("PREPFLOW_PROJECT_ID").filter(|v| !v.is_empty()) {
            self.project_id = project;
        }
    }

    pub fn validate(&self) -> Result<(), PrepflowError> {
        if self.api_base_url.trim().is_empty() {
            return Err(PrepflowError::Config("api_base_url must not be empty".into()));
        }
        if self.project_id.trim().is_empty() {
            return Err(PrepflowError::Config("project_id must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(PrepflowError::Config("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs)),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            project_id: self.project_id.clone(),
            poll: self.poll_config(),
        }
    }

    /// Constrói o cliente HTTP com os timeouts configurados.
    pub fn http_client(&self) -> Result<HttpJobClient, PrepflowError> {
        Ok(HttpJobClient::with_timeouts(
            self.api_base_url.clone(),
            Duration::from_secs(self.connect_timeout_secs),
            Duration::from_secs(self.request_timeout_secs),
        )?)
    }
}
