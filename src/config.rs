use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::fetcher::{ApiCredentials, DEFAULT_BASE_URL};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub limits_file: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// `CACHE_DIR` was set, so the cache does not follow the output directory
    cache_dir_explicit: bool,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let output_dir =
            PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| "./output".to_string()));

        let cache_dir = env::var("CACHE_DIR").ok().map(PathBuf::from);

        Ok(Config {
            api_key: required("MONNIT_API_KEY")?,
            api_secret: required("MONNIT_API_SECRET")?,
            base_url: env::var("MONNIT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            limits_file: PathBuf::from(
                env::var("LIMITS_FILE").unwrap_or_else(|_| "./data/limits.csv".to_string()),
            ),
            cache_dir_explicit: cache_dir.is_some(),
            cache_dir: cache_dir.unwrap_or_else(|| output_dir.clone()),
            output_dir,
        })
    }

    /// Apply command-line path overrides on top of the environment
    ///
    /// Without an explicit cache directory, the cache stays next to the reports.
    pub fn override_paths(
        &mut self,
        limits_file: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
    ) {
        if let Some(path) = limits_file {
            self.limits_file = path;
        }
        if let Some(path) = output_dir {
            if !self.cache_dir_explicit {
                self.cache_dir = path.clone();
            }
            self.output_dir = path;
        }
        if let Some(path) = cache_dir {
            self.cache_dir = path;
            self.cache_dir_explicit = true;
        }
    }

    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            api_key: self.api_key.clone(),
            secret_key: self.api_secret.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("limits_file", &self.limits_file)
            .field("output_dir", &self.output_dir)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}
