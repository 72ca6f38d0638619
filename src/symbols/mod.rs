//! Named lists and macros
//!
//! The table keeps declarations in first-declaration order with a name
//! index, so iteration and error reporting are deterministic.

use crate::error::{DeclKind, RuleError};
use std::collections::HashMap;

/// Resolution of lists and macros
pub mod resolver;

pub use resolver::{Resolver, MAX_NESTING_DEPTH, MAX_RESOLVE_DEPTH};

/// A named list of literal items; an item may name another list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDef {
    /// List name
    pub name: String,
    /// Items in declaration order
    pub items: Vec<String>,
}

/// A named condition fragment, kept as source text until resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    /// Macro name
    pub name: String,
    /// Condition texts; more than one after appends, joined with `or`
    pub conditions: Vec<String>,
}

/// Lists and macros by name
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    lists: Vec<ListDef>,
    list_index: HashMap<String, usize>,
    macros: Vec<MacroDef>,
    macro_index: HashMap<String, usize>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a list, replacing any earlier list of the same name
    pub fn define_list(&mut self, name: impl Into<String>, items: Vec<String>) {
        let name = name.into();
        match self.list_index.get(&name) {
            Some(&idx) => self.lists[idx].items = items,
            None => {
                self.list_index.insert(name.clone(), self.lists.len());
                self.lists.push(ListDef { name, items });
            }
        }
    }

    /// Append items to an existing list
    pub fn append_list(&mut self, name: &str, items: Vec<String>) -> Result<(), RuleError> {
        let idx = *self
            .list_index
            .get(name)
            .ok_or_else(|| RuleError::AppendWithoutBase {
                kind: DeclKind::List,
                name: name.to_string(),
            })?;
        self.lists[idx].items.extend(items);
        Ok(())
    }

    /// Define a macro, replacing any earlier macro of the same name
    pub fn define_macro(&mut self, name: impl Into<String>, condition: impl Into<String>) {
        let name = name.into();
        let conditions = vec![condition.into()];
        match self.macro_index.get(&name) {
            Some(&idx) => self.macros[idx].conditions = conditions,
            None => {
                self.macro_index.insert(name.clone(), self.macros.len());
                self.macros.push(MacroDef { name, conditions });
            }
        }
    }

    /// OR a condition onto an existing macro
    pub fn append_macro(&mut self, name: &str, condition: impl Into<String>) -> Result<(), RuleError> {
        let idx = *self
            .macro_index
            .get(name)
            .ok_or_else(|| RuleError::AppendWithoutBase {
                kind: DeclKind::Macro,
                name: name.to_string(),
            })?;
        self.macros[idx].conditions.push(condition.into());
        Ok(())
    }

    /// Look up a list
    pub fn list(&self, name: &str) -> Option<&ListDef> {
        self.list_index.get(name).map(|&idx| &self.lists[idx])
    }

    /// Look up a macro
    pub fn macro_def(&self, name: &str) -> Option<&MacroDef> {
        self.macro_index.get(name).map(|&idx| &self.macros[idx])
    }

    /// All lists, in first-declaration order
    pub fn lists(&self) -> &[ListDef] {
        &self.lists
    }

    /// All macros, in first-declaration order
    pub fn macros(&self) -> &[MacroDef] {
        &self.macros
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_define_replaces_in_place() {
        let mut table = SymbolTable::new();
        table.define_list("shells", items(&["bash"]));
        table.define_list("editors", items(&["vi"]));
        table.define_list("shells", items(&["zsh"]));

        let names: Vec<&str> = table.lists().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["shells", "editors"]);
        assert_eq!(table.list("shells").unwrap().items, items(&["zsh"]));
    }

    #[test]
    fn test_append() {
        let mut table = SymbolTable::new();
        table.define_list("shells", items(&["bash"]));
        table.append_list("shells", items(&["sh"])).unwrap();
        assert_eq!(table.list("shells").unwrap().items, items(&["bash", "sh"]));

        table.define_macro("spawned", "evt.type = execve");
        table.append_macro("spawned", "evt.type = execveat").unwrap();
        assert_eq!(table.macro_def("spawned").unwrap().conditions.len(), 2);

        table.define_macro("spawned", "evt.type = clone");
        assert_eq!(table.macro_def("spawned").unwrap().conditions, items(&["evt.type = clone"]));
    }

    #[test]
    fn test_append_without_base() {
        let mut table = SymbolTable::new();
        let err = table.append_list("missing", vec![]).unwrap_err();
        assert_eq!(
            err,
            RuleError::AppendWithoutBase {
                kind: DeclKind::List,
                name: "missing".into()
            }
        );
        assert!(table.append_macro("missing", "a = b").is_err());
    }
}
