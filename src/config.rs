use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Where raw records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Postgres(String),
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub source_timeout: Duration,
    pub alert_limit: usize,
}

impl Config {
    /// A data directory wins over `DATABASE_URL`.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        database_url: Option<String>,
        source_timeout_ms: u64,
        alert_limit: usize,
    ) -> anyhow::Result<Self> {
        let backend = match data_dir {
            Some(dir) => Backend::Directory(dir),
            None => Backend::Postgres(
                database_url.context("DATABASE_URL must be set when --data-dir is not given")?,
            ),
        };

        Ok(Self {
            backend,
            source_timeout: Duration::from_millis(source_timeout_ms),
            alert_limit,
        })
    }

    pub fn database_url() -> anyhow::Result<String> {
        std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}
