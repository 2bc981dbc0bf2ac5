use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::services::crosstab::DEFAULT_SIGNIFICANCE_THRESHOLD;

fn default_max_file_size() -> usize {
    // 200 MB in bytes
    200 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_file_size: usize,
    pub significance_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 5000,
            max_file_size: default_max_file_size(),
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        let host = env_or("HOST", defaults.host)?;
        let port = env_or("PORT", defaults.port)?;
        let max_file_size = match std::env::var("MAX_UPLOAD_MB") {
            Ok(raw) => {
                let mb: usize = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("MAX_UPLOAD_MB must be a whole number, got {raw:?}"))?;
                mb * 1024 * 1024
            }
            Err(_) => defaults.max_file_size,
        };
        let significance_threshold: f64 =
            env_or("CROSSTAB_SIGNIFICANCE_THRESHOLD", defaults.significance_threshold)?;
        if !significance_threshold.is_finite() || significance_threshold < 0.0 {
            anyhow::bail!(
                "CROSSTAB_SIGNIFICANCE_THRESHOLD must be a non-negative number, got {}",
                significance_threshold
            );
        }

        Ok(Config {
            host,
            port,
            max_file_size,
            significance_threshold,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {key}={raw:?}")),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    Config::from_env()
}
