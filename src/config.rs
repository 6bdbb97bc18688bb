//! Configuração do coordenador carregada a partir de `videosdgx.toml`.
//!
//! A struct [`CoordinatorConfig`] contém o catálogo de backends, as
//! cadências dos dois laços periódicos, os timeouts HTTP e o caminho do
//! armazenamento local. Valores não presentes no arquivo usam defaults.
//! A variável de ambiente `VIDEOSDGX_STORE` tem precedência sobre
//! `store_path`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::Deserialize;

/// Arquivo de configuração procurado no diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "videosdgx.toml";

/// Um backend de geração endereçável por chave de modelo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendEntry {
    /// Nome de exibição (ex.: "Waver 1.0").
    pub name: String,
    /// URL base, sem barra final obrigatória (ex.: "http://localhost:8004").
    pub base_url: String,
}

/// Mapeamento fixo de chave de modelo para backend.
///
/// Iterado em ordem alfabética das chaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Catalog(BTreeMap<String, BackendEntry>);

impl Catalog {
    pub fn get(&self, model: &str) -> Option<&BackendEntry> {
        self.0.get(model)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.0.contains_key(model)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BackendEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Nome de exibição do modelo, ou a própria chave se não catalogado.
    pub fn display_name(&self, model: &str) -> String {
        self.get(model)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| model.to_string())
    }

    /// Monta `{base}/{seg1}/{seg2}...` para um modelo catalogado.
    ///
    /// Cada segmento é codificado por inteiro: um `job_id` contendo `/`, `?`
    /// ou `#` continua sendo um único segmento. `None` se o modelo não está
    /// no catálogo ou a URL base não é válida.
    pub fn endpoint(&self, model: &str, segments: &[&str]) -> Option<String> {
        let entry = self.get(model)?;
        let mut url = Url::parse(&entry.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments);
        Some(url.into())
    }

    /// URL do artefato gerado; apenas referenciada, nunca baixada aqui.
    pub fn download_url(&self, model: &str, job_id: &str) -> Option<String> {
        self.endpoint(model, &["jobs", job_id, "download"])
    }
}

impl<K: Into<String>> FromIterator<(K, BackendEntry)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (K, BackendEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Configuração de nível superior carregada de `videosdgx.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Intervalo entre ciclos de reconciliação de jobs, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Intervalo entre verificações de saúde dos backends, em segundos.
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,

    /// Timeout total de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout de conexão de cada requisição HTTP, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Arquivo JSON onde as listas de jobs são persistidas.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Catálogo de backends por chave de modelo.
    #[serde(default = "default_backends")]
    pub backends: Catalog,
}

// Valor padrão para o intervalo de reconciliação: 3s.
fn default_poll_interval_secs() -> u64 {
    3
}

// Valor padrão para o intervalo de saúde: 10s.
fn default_health_interval_secs() -> u64 {
    10
}

// Valor padrão para o timeout de requisição: 5s.
fn default_request_timeout_secs() -> u64 {
    5
}

// Valor padrão para o timeout de conexão: 3s.
fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_store_path() -> PathBuf {
    PathBuf::from("videosdgx_jobs.json")
}

// Os quatro backends da instalação padrão, um por porta.
fn default_backends() -> Catalog {
    [
        ("ltx2", "LTX-2", "http://localhost:8001"),
        ("wan21", "Wan 2.1", "http://localhost:8002"),
        ("magi1", "MAGI-1", "http://localhost:8003"),
        ("waver", "Waver 1.0", "http://localhost:8004"),
    ]
    .into_iter()
    .map(|(key, name, url)| {
        (
            key,
            BackendEntry {
                name: name.to_string(),
                base_url: url.to_string(),
            },
        )
    })
    .collect()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            health_interval_secs: default_health_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            store_path: default_store_path(),
            backends: default_backends(),
        }
    }
}

impl CoordinatorConfig {
    /// Carrega a configuração.
    ///
    /// Com `path`, o arquivo precisa existir. Sem `path`, usa
    /// `videosdgx.toml` no diretório atual ou os defaults se ele não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        // Variável de ambiente tem precedência sobre o arquivo para o caminho do armazenamento.
        if let Ok(store) = std::env::var("VIDEOSDGX_STORE") {
            if !store.is_empty() {
                config.store_path = PathBuf::from(store);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<CoordinatorConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Rejeita intervalos e timeouts nulos, que travariam os laços periódicos.
    /// Também rejeita URLs base que não servem de base para caminhos.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("health_interval_secs", self.health_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        for (model, entry) in self.backends.iter() {
            let url = Url::parse(&entry.base_url)
                .with_context(|| format!("invalid base_url for backend `{model}`"))?;
            if url.cannot_be_a_base() {
                bail!("base_url for backend `{model}` cannot hold a path");
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
