use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOKEN_ENV: &str = "API_TOKEN";
/// Shortest long-poll wait; a zero wait would spin the relay loop.
const MIN_POLL_SECS: u64 = 1;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub api_token: String,
    pub api_base: String,
    pub db_path: Option<String>,
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub imap_port: u16,
    /// Mail domain -> IMAP host, on top of the built-in ones.
    pub imap_servers: HashMap<String, String>,
    pub error_backoff_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            db_path: None,
            poll_timeout_secs: 10,
            request_timeout_secs: 30,
            imap_port: 993,
            imap_servers: HashMap::new(),
            error_backoff_secs: 1,
        }
    }
}

impl Config {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs.max(MIN_POLL_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("emails2telegram"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("sessions.db");
    Ok(p)
}

/// Read the TOML file if there is one, then let the environment
/// (including a `.env` file) supply the bot token.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let _ = dotenvy::dotenv();

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    let mut cfg = if path.exists() {
        let s = fs::read_to_string(&path)?;
        toml::from_str::<Config>(&s).map_err(|e| anyhow!("{}: {e}", path.display()))?
    } else {
        Config::default()
    };

    apply_env(&mut cfg, std::env::var(TOKEN_ENV).ok());
    if cfg.api_token.trim().is_empty() {
        return Err(anyhow!(
            "bot token missing: set {TOKEN_ENV} or api_token in {}",
            path.display()
        ));
    }
    Ok(cfg)
}

fn apply_env(cfg: &mut Config, token: Option<String>) {
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        cfg.api_token = token.trim().to_string();
    }
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}
