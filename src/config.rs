//! Compiler configuration.
//!
//! Read from `config.toml` under the user config directory unless a path is
//! given. Every field has a default, so a missing file or a partial one is
//! fine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dialect::{DialectKind, SqlDialect};
use crate::optimizer::{Optimizer, DEFAULT_MAX_ITERATIONS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub dialect: DialectKind,
    pub plan_cache_capacity: usize,
    pub command_cache_capacity: usize,
    pub max_optimizer_iterations: usize,
    /// Optimization passes to leave out, by name.
    pub disabled_passes: Vec<String>,
    /// Use `OFFSET .. FETCH` on SQL Server instead of `ROW_NUMBER()` paging.
    pub sql_server_offset_fetch: bool,
    /// Log every command at debug level.
    pub log_sql: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            plan_cache_capacity: Self::DEFAULT_PLAN_CACHE_CAPACITY,
            command_cache_capacity: Self::DEFAULT_COMMAND_CACHE_CAPACITY,
            max_optimizer_iterations: DEFAULT_MAX_ITERATIONS,
            disabled_passes: Vec::new(),
            sql_server_offset_fetch: false,
            log_sql: false,
        }
    }
}

impl CompilerConfig {
    pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 1024;
    pub const DEFAULT_COMMAND_CACHE_CAPACITY: usize = 512;

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlweave")
            .join("config.toml")
    }

    /// Load from `path`, or from [`Self::default_path`]. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn dialect(&self) -> Arc<dyn SqlDialect> {
        self.dialect.build(self.sql_server_offset_fetch)
    }

    /// The default pipeline minus the disabled passes.
    pub fn optimizer(&self) -> Optimizer {
        let mut optimizer = Optimizer::with_defaults().with_max_iterations(self.max_optimizer_iterations);
        for name in &self.disabled_passes {
            if !optimizer.remove_pass(name) {
                warn!(pass = %name, "disabled pass is not in the pipeline");
            }
        }
        optimizer
    }
}
