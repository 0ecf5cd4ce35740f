//! Configuration for fetching pods
//!
//! Values come from built-in defaults, overridden by environment variables
//! when `use_environment` is set:
//!
//! - `CP_CACHE_DIR`: directory holding the `Pods` cache root
//! - `COCOAPODS_SKIP_CACHE`: bypass the download cache
//! - `CP_DOWNLOAD_JOBS`: number of concurrent downloads

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{FetchError, Result};

const DEFAULT_DOWNLOAD_JOBS: usize = 4;

/// Settings shared by the cache and the downloader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root of the download cache (`…/Pods`)
    pub cache_root: PathBuf,

    /// Fetch straight into the target without touching the cache
    #[serde(default)]
    pub skip_download_cache: bool,

    #[serde(default = "default_download_jobs")]
    pub max_concurrent_downloads: usize,

    /// Stamp written to the cache root; a different stamp wipes the cache
    pub version: String,
}

fn default_download_jobs() -> usize {
    DEFAULT_DOWNLOAD_JOBS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_root: ConfigLoader::new(false).get_cache_dir().join("Pods"),
            skip_download_cache: false,
            max_concurrent_downloads: DEFAULT_DOWNLOAD_JOBS,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Defaults plus environment overrides
    pub fn build(use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);

        let mut config = Self {
            cache_root: loader.get_cache_dir().join("Pods"),
            ..Self::default()
        };

        if let Some(skip) = loader.get_env_bool("COCOAPODS_SKIP_CACHE") {
            config.skip_download_cache = skip;
        }

        if let Some(jobs) = loader.get_env("CP_DOWNLOAD_JOBS") {
            config.max_concurrent_downloads = jobs
                .parse()
                .ok()
                .filter(|jobs| *jobs > 0)
                .ok_or_else(|| {
                    FetchError::Config(format!("CP_DOWNLOAD_JOBS must be a positive integer, got {jobs:?}"))
                })?;
        }

        Ok(config)
    }

    /// Same configuration rooted at another cache directory
    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }
}

/// Reads settings from the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Non-empty environment variable, when the environment is consulted
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    pub fn get_env_bool(&self, var: &str) -> Option<bool> {
        self.get_env(var)
            .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no"))
    }

    /// Directory that holds the `Pods` cache root
    pub fn get_cache_dir(&self) -> PathBuf {
        if let Some(cache) = self.get_env("CP_CACHE_DIR") {
            return PathBuf::from(cache);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pods") {
            proj_dirs.cache_dir().to_path_buf()
        } else if let Some(base_dirs) = directories::BaseDirs::new() {
            base_dirs.home_dir().join(".pods").join("cache")
        } else {
            PathBuf::from(".pods").join("cache")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.cache_root.ends_with("Pods"));
        assert!(!config.skip_download_cache);
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_loader_without_environment_ignores_variables() {
        let loader = ConfigLoader::new(false);
        assert_eq!(loader.get_env("PATH"), None);
        assert_eq!(loader.get_env_bool("COCOAPODS_SKIP_CACHE"), None);
    }

    #[test]
    fn test_build_without_environment_matches_default() {
        assert_eq!(Config::build(false).unwrap(), Config::default());
    }

    #[test]
    fn test_with_cache_root() {
        let config = Config::default().with_cache_root("/tmp/pods-cache");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/pods-cache"));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = r#"{"cache-root": "/c", "version": "1.0.0"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.cache_root, PathBuf::from("/c"));
        assert_eq!(config.max_concurrent_downloads, 4);
        assert!(!config.skip_download_cache);
    }
}
