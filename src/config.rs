use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

use crate::assemble::ImportOptions;
use crate::proxy::DEFAULT_ALLOWED_HOSTS;
use crate::transcript::{ModeOverride, Role, SplitMode};

/// Variables read from the process environment (and `.env`).
#[derive(Deserialize, Debug, Default)]
pub struct Environment {
    /// Base URL of a running proxy, e.g. `http://127.0.0.1:4173`.
    pub chat_import_proxy: Option<String>,
    #[serde(default)]
    pub chat_import_no_cache: bool,
}

impl Environment {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::from_env::<Environment>().context("Failed to read environment")
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub import: ImportDefaults,
    pub proxy: ProxyConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ImportDefaults {
    pub mode: ModeOverride,
    pub split: SplitMode,
    pub first_role: Role,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            mode: ModeOverride::Auto,
            split: SplitMode::Line,
            first_role: Role::User,
        }
    }
}

impl ImportDefaults {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            mode: self.mode,
            split: self.split,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub allowed_hosts: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 4173)),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl Config {
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config TOML")
    }
}
