//! Server configuration from environment variables.

use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SERVER_ADDR`, default `0.0.0.0:8080`
    pub addr: SocketAddr,
    /// `SAVE_DIR`, default `saves`
    pub save_dir: PathBuf,
    /// `REGEN_INTERVAL_MS`, default 1000
    pub regen_interval: Duration,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".into())
            .parse()
            .context("invalid SERVER_ADDR")?;

        let save_dir = lookup("SAVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("saves"));

        let regen_ms: u64 = match lookup("REGEN_INTERVAL_MS") {
            Some(raw) => raw.parse().context("invalid REGEN_INTERVAL_MS")?,
            None => 1000,
        };
        if regen_ms == 0 {
            anyhow::bail!("REGEN_INTERVAL_MS must be positive");
        }

        Ok(Self {
            addr,
            save_dir,
            regen_interval: Duration::from_millis(regen_ms),
        })
    }
}
