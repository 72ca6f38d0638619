//! Rule engine: loading, reloading and dispatch

use crate::config::EngineConfig;
use crate::error::{LoadErrors, RuleError};
use crate::event::FieldAccessor;
use crate::registry::{Alert, RuleRegistry, SharedRegistry};
use crate::rule::{parse_rule_file, Declaration};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Declarations read from rule files, with the items that could not be read
#[derive(Debug, Default)]
pub struct LoadedFiles {
    /// Declarations in load order
    pub declarations: Vec<Declaration>,
    /// Items that failed to parse
    pub errors: LoadErrors,
    /// Files read
    pub files: Vec<PathBuf>,
}

fn is_rule_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Expand directories into their rule files, sorted by path
fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_rule_file(p))
                .collect();
            found.sort();
            debug!("Found {} rule files in {}", found.len(), path.display());
            files.extend(found);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            anyhow::bail!("Rules path not found: {}", path.display());
        }
    }
    Ok(files)
}

/// Read and parse rule files in order.
///
/// A file requiring a newer engine always fails the whole load. Other
/// file-level failures fail it only when `fail_on_error` is set, and are
/// otherwise logged and the file skipped.
pub async fn load_rule_files(paths: &[PathBuf], fail_on_error: bool) -> Result<LoadedFiles> {
    let mut loaded = LoadedFiles::default();
    for path in expand_paths(paths)? {
        debug!("Loading rules from {}", path.display());
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;

        let file = match parse_rule_file(&data) {
            Ok(file) => file,
            Err(e @ RuleError::VersionMismatch { .. }) => {
                return Err(e).with_context(|| format!("Incompatible rule file {}", path.display()));
            }
            Err(e) if fail_on_error => {
                return Err(e).with_context(|| format!("Failed to parse rule file {}", path.display()));
            }
            Err(e) => {
                warn!("Skipping rule file {}: {}", path.display(), e);
                continue;
            }
        };
        loaded.declarations.extend(file.declarations);
        file.errors.into_iter().for_each(|e| loaded.errors.push(e));
        loaded.files.push(path);
    }
    Ok(loaded)
}

/// Loads rules per an [`EngineConfig`] and evaluates events against them.
///
/// The registry sits behind a [`SharedRegistry`], so [`reload`](Self::reload)
/// can run while other threads evaluate.
pub struct Engine {
    config: EngineConfig,
    registry: SharedRegistry,
    load_errors: RwLock<LoadErrors>,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("rules", &self.registry.snapshot().len())
            .finish()
    }
}

impl Engine {
    /// Create an engine and load the configured rule files
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let (registry, errors) = build_registry(&config).await?;
        Self::with_registry(config, registry, errors)
    }

    /// Create an engine from declarations already in memory
    pub fn from_declarations(config: EngineConfig, decls: Vec<Declaration>) -> Result<Self> {
        let (registry, errors) = RuleRegistry::load_with(decls, &config.rule_filter());
        if config.fail_on_load_error && !errors.is_empty() {
            return Err(anyhow::Error::new(errors));
        }
        Self::with_registry(config, registry, errors)
    }

    fn with_registry(config: EngineConfig, registry: RuleRegistry, errors: LoadErrors) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("sysrules-worker-{i}"))
            .build()
            .context("Failed to build worker pool")?;
        Ok(Self {
            config,
            registry: SharedRegistry::new(registry),
            load_errors: RwLock::new(errors),
            pool,
        })
    }

    /// Reload the configured rule files and swap the new registry in.
    ///
    /// On failure the current registry stays in effect.
    pub async fn reload(&self) -> Result<LoadErrors> {
        let (registry, errors) = build_registry(&self.config).await?;
        let rules = registry.len();
        self.registry.swap(registry);
        *self.load_errors.write() = errors.clone();
        info!(rules, failed = errors.len(), "Rules reloaded");
        Ok(errors)
    }

    /// Registry in effect now
    pub fn registry(&self) -> Arc<RuleRegistry> {
        self.registry.snapshot()
    }

    /// Declarations that failed during the last load
    pub fn load_errors(&self) -> LoadErrors {
        self.load_errors.read().clone()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one event
    pub fn process_event<E: ?Sized, A: FieldAccessor<E> + ?Sized>(&self, accessor: &A, event: &E) -> Vec<Alert> {
        self.registry.snapshot().evaluate_all(accessor, event)
    }

    /// Evaluate a batch of events in parallel against one registry
    /// snapshot. Results are in input order.
    pub fn process_batch<E: Sync, A: FieldAccessor<E> + ?Sized>(&self, accessor: &A, events: &[E]) -> Vec<Vec<Alert>> {
        let registry = self.registry.snapshot();
        self.pool.install(|| {
            events
                .par_iter()
                .map(|event| registry.evaluate_all(accessor, event))
                .collect()
        })
    }
}

async fn build_registry(config: &EngineConfig) -> Result<(RuleRegistry, LoadErrors)> {
    let loaded = load_rule_files(&config.rules_files, config.fail_on_load_error).await?;
    let (registry, compile_errors) = RuleRegistry::load_with(loaded.declarations, &config.rule_filter());

    let mut errors = loaded.errors;
    compile_errors.errors.into_iter().for_each(|e| errors.push(e));
    if config.fail_on_load_error && !errors.is_empty() {
        return Err(anyhow::Error::new(errors));
    }
    info!(
        files = loaded.files.len(),
        rules = registry.len(),
        failed = errors.len(),
        "Rule files loaded"
    );
    Ok((registry, errors))
}
