//! Registry handle shared between evaluators and the reloader

use super::RuleRegistry;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Atomically replaceable registry.
///
/// Evaluators take a [`snapshot`](Self::snapshot) per event or batch and
/// keep using it even if a reload swaps in a new registry meanwhile.
#[derive(Debug)]
pub struct SharedRegistry {
    current: ArcSwap<RuleRegistry>,
}

impl SharedRegistry {
    /// Wrap a built registry
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            current: ArcSwap::from_pointee(registry),
        }
    }

    /// The registry in effect now
    pub fn snapshot(&self) -> Arc<RuleRegistry> {
        self.current.load_full()
    }

    /// Install a new registry, returning the one it replaced
    pub fn swap(&self, registry: RuleRegistry) -> Arc<RuleRegistry> {
        self.current.swap(Arc::new(registry))
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new(RuleRegistry::default())
    }
}
