// ABOUTME: Configuration management for saladplate
// ABOUTME: Handles loading configuration from YAML files and environment variable overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// Shell interpreter for `$(( ))` commands; the platform default when unset
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default = "default_true")]
    pub detect_include_cycles: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_max_concurrent_files() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_files: default_max_concurrent_files(),
            shell: None,
            detect_include_cycles: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let explicit = path.is_some();
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid config {}", config_path.display()))?
        } else if explicit {
            anyhow::bail!("Config file not found: {}", config_path.display());
        } else {
            Config::default()
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = vec![
            PathBuf::from("saladplate.yaml"),
            PathBuf::from("saladplate.yml"),
            PathBuf::from(".saladplate.yaml"),
            PathBuf::from(".saladplate.yml"),
        ];

        // Check current directory
        for path in possible_paths {
            if path.exists() {
                return path;
            }
        }

        // Check home directory
        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".saladplate").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Return default path (may not exist)
        PathBuf::from("saladplate.yaml")
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("SALADPLATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SALADPLATE_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(shell) = std::env::var("SALADPLATE_SHELL") {
            self.shell = Some(shell);
        }
        if let Ok(max_files) = std::env::var("SALADPLATE_MAX_CONCURRENT") {
            self.max_concurrent_files = max_files
                .parse()
                .with_context(|| format!("Invalid SALADPLATE_MAX_CONCURRENT '{}'", max_files))?;
        }

        Ok(())
    }
}
