//! Configuration Management
//!
//! Handles file-based configuration for crudboard. Values come from the
//! config file; command-line flags override them (CLI > config > default).

use crate::card::CardSettings;
use crate::query::PageLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Address the HTTP server listens on
    #[serde(default)]
    pub bind_addr: Option<String>,
    /// Resource definition files (.json, .yaml, .yml)
    #[serde(default)]
    pub definitions: Vec<PathBuf>,
    /// Seed data for the in-memory store
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Remote JSON store; wins over `data` when set
    #[serde(default)]
    pub store_url: Option<String>,
    #[serde(default)]
    pub default_per_page: Option<u64>,
    #[serde(default)]
    pub max_per_page: Option<u64>,
    /// Maximum cards resolving at once
    #[serde(default)]
    pub card_concurrency: Option<usize>,
    /// Per-card deadline in milliseconds
    #[serde(default)]
    pub card_timeout_ms: Option<u64>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Get the default config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("crudboard").join("config.json"))
    }

    /// Load configuration from `path`, or from the default location
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error, reported by the caller once logging is up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::config_path) else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::read(&path).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Get effective bind address (CLI > config > default)
    pub fn effective_bind_addr(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
    }

    /// Get effective definition files (CLI replaces config)
    pub fn effective_definitions(&self, cli: &[PathBuf]) -> Vec<PathBuf> {
        if cli.is_empty() {
            self.definitions.clone()
        } else {
            cli.to_vec()
        }
    }

    pub fn effective_data(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf).or_else(|| self.data.clone())
    }

    pub fn effective_store_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.store_url.clone())
    }

    pub fn effective_log_file(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf).or_else(|| self.log_file.clone())
    }

    /// Page size bounds; a default above the maximum is clamped
    pub fn page_limits(&self) -> PageLimits {
        let defaults = PageLimits::default();
        let max_per_page = self.max_per_page.unwrap_or(defaults.max_per_page).max(1);
        let default_per_page = self
            .default_per_page
            .unwrap_or(defaults.default_per_page)
            .clamp(1, max_per_page);
        PageLimits {
            default_per_page,
            max_per_page,
        }
    }

    pub fn card_settings(&self) -> CardSettings {
        CardSettings {
            concurrency: self.card_concurrency.filter(|n| *n > 0),
            timeout: self.card_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
        }
    }
}
