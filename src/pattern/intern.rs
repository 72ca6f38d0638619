//! Field-name interning
//!
//! Rules reference the same handful of fields over and over (`proc.name`,
//! `fd.name`, `evt.type`). Compiled comparisons share one allocation per
//! distinct name.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Global interner for field names
static FIELD_INTERNER: Lazy<StringInterner> = Lazy::new(StringInterner::new);

/// Thread-safe string interner
#[derive(Default)]
pub struct StringInterner {
    strings: RwLock<HashSet<Arc<str>>>,
}

impl StringInterner {
    /// Create a new string interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a shared reference
    pub fn intern(&self, s: &str) -> Arc<str> {
        if let Some(interned) = self.strings.read().get(s) {
            return Arc::clone(interned);
        }

        let mut strings = self.strings.write();
        // another writer may have won the race
        if let Some(interned) = strings.get(s) {
            return Arc::clone(interned);
        }
        let interned: Arc<str> = Arc::from(s);
        strings.insert(Arc::clone(&interned));
        interned
    }

    /// Number of distinct strings held
    pub fn len(&self) -> usize {
        self.strings.read().len()
    }

    /// Whether nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.strings.read().is_empty()
    }
}

/// Intern a field name using the global interner
pub fn intern_field(s: &str) -> Arc<str> {
    FIELD_INTERNER.intern(s)
}
