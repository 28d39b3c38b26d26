use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::domain::sort::SortMode;

const DEFAULT_PROVIDER_URL: &str = "https://code.gouv.fr/sill/api/getSoftwares";
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROVIDER_URL.to_string(),
            timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub sort: SortMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: ProviderConfig,
    pub defaults: DefaultsConfig,
}

impl RuntimeConfig {
    pub fn default_path() -> PathBuf {
        env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config/sill-catalog/config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed parsing config TOML: {}", path.display()))
    }

    fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| anyhow!("{err}"))
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("SILL_CATALOG_PROVIDER_URL") {
            self.provider.url = url;
        }
        if let Ok(timeout_ms) = env::var("SILL_CATALOG_PROVIDER_TIMEOUT_MS") {
            self.provider.timeout_ms = timeout_ms
                .parse::<u64>()
                .with_context(|| "invalid SILL_CATALOG_PROVIDER_TIMEOUT_MS".to_string())?;
        }
        if let Ok(sort) = env::var("SILL_CATALOG_DEFAULT_SORT") {
            self.defaults.sort = sort
                .parse()
                .with_context(|| "invalid SILL_CATALOG_DEFAULT_SORT".to_string())?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.defaults.sort == SortMode::BestMatch {
            return Err(anyhow!(
                "invalid default sort 'best_match' (only available while searching)"
            ));
        }
        if self.provider.url.trim().is_empty() {
            return Err(anyhow!("provider url cannot be empty"));
        }
        Ok(())
    }
}
