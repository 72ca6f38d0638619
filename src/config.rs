//! Engine configuration

use crate::error::{Result, RuleError};
use crate::registry::RuleFilter;
use crate::rule::Priority;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_worker_threads() -> usize {
    num_cpus::get()
}

/// Configuration for an [`Engine`](crate::engine::Engine).
///
/// Can be read from YAML; missing keys take their defaults.
///
/// ```yaml
/// rules_files:
///   - /etc/sysrules/rules.yaml
///   - /etc/sysrules/rules.d
/// min_priority: warning
/// disabled_tags: [noisy]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rule files or directories, loaded in order
    pub rules_files: Vec<PathBuf>,
    /// Abort loading when any declaration fails
    pub fail_on_load_error: bool,
    /// Rules below this priority are not evaluated
    pub min_priority: Priority,
    /// When not empty, only rules with one of these tags are evaluated
    pub enabled_tags: Vec<String>,
    /// Rules with any of these tags are not evaluated
    pub disabled_tags: Vec<String>,
    /// Threads used for batch evaluation
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Print alerts as JSON
    pub json_output: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_files: vec![],
            fail_on_load_error: false,
            min_priority: Priority::Debug,
            enabled_tags: vec![],
            disabled_tags: vec![],
            worker_threads: default_worker_threads(),
            json_output: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML configuration
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(data)?)
    }

    /// Read a YAML configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| RuleError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&data)
    }

    /// Add a rule file or directory
    pub fn add_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_files.push(path.into());
        self
    }

    /// Set whether any load failure aborts loading
    pub fn fail_on_load_error(mut self, fail: bool) -> Self {
        self.fail_on_load_error = fail;
        self
    }

    /// Set the minimum evaluated priority
    pub fn min_priority(mut self, priority: Priority) -> Self {
        self.min_priority = priority;
        self
    }

    /// Only evaluate rules with this tag
    pub fn enable_tag(mut self, tag: impl Into<String>) -> Self {
        self.enabled_tags.push(tag.into());
        self
    }

    /// Skip rules with this tag
    pub fn disable_tag(mut self, tag: impl Into<String>) -> Self {
        self.disabled_tags.push(tag.into());
        self
    }

    /// Set the number of batch worker threads
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set JSON alert output
    pub fn json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Rule selection derived from this configuration
    pub fn rule_filter(&self) -> RuleFilter {
        RuleFilter {
            min_priority: self.min_priority,
            enabled_tags: self.enabled_tags.clone(),
            disabled_tags: self.disabled_tags.clone(),
        }
    }
}
