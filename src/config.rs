use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::builder::DEFAULT_WEIGHT_FACTOR;
use crate::graph::paths::{DEFAULT_CUTOFF, MAX_CUTOFF};
use crate::graph::EdgeSourceConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub relgraph: RelgraphConfig,
    #[serde(default)]
    pub graph: GraphSettings,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    /// Edge sources merged into every graph, in order.
    #[serde(default)]
    pub sources: Vec<EdgeSourceConfig>,
}

/// Database and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelgraphConfig {
    /// SQLite database holding the entity and relation tables.
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Request defaults and limits for graph queries
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphSettings {
    #[serde(default = "default_weight_factor")]
    pub default_weight_factor: f64,
    #[serde(default = "default_cutoff")]
    pub default_cutoff: usize,
    /// Upper bound for the simple-path cutoff. Can only lower the built-in limit.
    #[serde(default = "default_max_cutoff")]
    pub max_cutoff: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            default_weight_factor: default_weight_factor(),
            default_cutoff: default_cutoff(),
            max_cutoff: default_max_cutoff(),
        }
    }
}

fn default_weight_factor() -> f64 {
    DEFAULT_WEIGHT_FACTOR
}

fn default_cutoff() -> usize {
    DEFAULT_CUTOFF
}

fn default_max_cutoff() -> usize {
    MAX_CUTOFF
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RELGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("at least one [[sources]] entry is required");
        }

        for source in &self.sources {
            source.validate()?;
        }

        let mut tables: Vec<&str> = self.sources.iter().map(|s| s.table.as_str()).collect();
        tables.sort_unstable();
        if let Some(dup) = tables.windows(2).find(|w| w[0] == w[1]) {
            log::warn!(
                "Several sources use table '{}'; ignore_ttype will skip all of them together",
                dup[0]
            );
        }

        let factor = self.graph.default_weight_factor;
        if !(factor.is_finite() && factor > 0.0) {
            anyhow::bail!("graph.default_weight_factor must be a positive finite number");
        }

        if self.graph.max_cutoff == 0 || self.graph.max_cutoff > MAX_CUTOFF {
            anyhow::bail!("graph.max_cutoff must be between 1 and {}", MAX_CUTOFF);
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.relgraph.db_path
    }
}
