use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_root: PathBuf,
    pub api_token: String,
    /// Optional JSON file seeding the in-memory contact directory.
    pub contacts_path: Option<PathBuf>,
    /// Optional directory of `<job_id>.json` map files loaded at startup for
    /// jobs that have no stored map yet.
    pub seed_jobs_dir: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            storage_root: PathBuf::from(require_env("STORAGE_ROOT")?),
            api_token: require_env("API_TOKEN")?,
            contacts_path: std::env::var("CONTACTS_PATH").ok().map(PathBuf::from),
            seed_jobs_dir: std::env::var("SEED_JOBS_DIR").ok().map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
