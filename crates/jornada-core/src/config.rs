//! Application configuration.
//!
//! Backend credentials come from the environment (a `.env` file is loaded
//! by the binary before this runs). User preferences live in a JSON file
//! at `~/.config/jornada/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{QueryOptions, DEFAULT_TTL_MINUTES};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "jornada";

const CONFIG_FILE: &str = "config.json";

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const ACCESS_TOKEN_VAR: &str = "JORNADA_ACCESS_TOKEN";
pub const USER_ID_VAR: &str = "JORNADA_USER_ID";

/// First day of week 1 when no start date is configured.
pub fn default_journey_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} não definido: adicione ao ambiente ou a um arquivo .env")]
    MissingVar(&'static str),

    #[error("{0} não pode ficar vazio")]
    EmptyVar(&'static str),
}

/// Backend connection settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank optional values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            let value = lookup(name).ok_or(ConfigError::MissingVar(name))?;
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyVar(name));
            }
            Ok(value.trim().to_string())
        };
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            url: required(URL_VAR)?,
            anon_key: required(ANON_KEY_VAR)?,
            access_token: optional(ACCESS_TOKEN_VAR),
            user_id: optional(USER_ID_VAR),
        })
    }
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_TTL_MINUTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_ttl_minutes")]
    pub cache_ttl_minutes: i64,
    #[serde(default)]
    pub journey_start: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            journey_start: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Falha ao ler {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Configuração inválida em {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).with_context(|| format!("Falha ao gravar {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Diretório de configuração não encontrado"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the binary writes its log file.
    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Diretório de cache não encontrado"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn journey_start(&self) -> NaiveDate {
        self.journey_start.unwrap_or_else(default_journey_start)
    }

    /// Query options using the configured TTL; non-positive values fall
    /// back to the default.
    pub fn query_options(&self) -> QueryOptions {
        let minutes = if self.cache_ttl_minutes > 0 {
            self.cache_ttl_minutes
        } else {
            DEFAULT_TTL_MINUTES
        };
        QueryOptions::default().ttl(Duration::minutes(minutes))
    }

    /// The environment's user id wins over the saved one.
    pub fn resolve_user_id(&self, credentials: &Credentials) -> Option<String> {
        credentials.user_id.clone().or_else(|| self.user_id.clone())
    }
}
