//! Ordered merge of declarations
//!
//! Declarations are applied strictly in the order given. A later list,
//! macro or rule with an existing name replaces it unless it appends; an
//! appended list gains items, an appended macro or rule has its condition
//! OR-ed onto the earlier one. Nothing is resolved here.

use crate::error::{DeclKind, LoadError, RuleError};
use crate::rule::{Declaration, Priority, RuleDecl};
use crate::symbols::SymbolTable;
use std::collections::HashMap;

/// A rule after merging, with its condition still as source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    /// Rule name
    pub name: String,
    /// Description
    pub desc: String,
    /// Condition texts; more than one after appends
    pub conditions: Vec<String>,
    /// Output template
    pub output: String,
    /// Severity
    pub priority: Priority,
    /// Whether the rule is evaluated
    pub enabled: bool,
    /// Selection tags
    pub tags: Vec<String>,
    /// Event source
    pub source: Option<String>,
}

impl RuleEntry {
    fn from_decl(decl: RuleDecl, condition: String) -> Self {
        Self {
            name: decl.name,
            desc: decl.desc.unwrap_or_default(),
            conditions: vec![condition],
            output: decl.output.unwrap_or_default(),
            priority: decl.priority.unwrap_or_default(),
            enabled: decl.enabled.unwrap_or(true),
            tags: decl.tags.unwrap_or_default(),
            source: decl.source,
        }
    }

    /// Apply the fields a later declaration names
    fn override_with(&mut self, decl: RuleDecl) {
        if let Some(desc) = decl.desc {
            self.desc = desc;
        }
        if let Some(output) = decl.output {
            self.output = output;
        }
        if let Some(priority) = decl.priority {
            self.priority = priority;
        }
        if let Some(enabled) = decl.enabled {
            self.enabled = enabled;
        }
        if let Some(tags) = decl.tags {
            self.tags = tags;
        }
        if decl.source.is_some() {
            self.source = decl.source;
        }
    }
}

/// Lists, macros and rules after all declarations were applied
#[derive(Debug, Clone, Default)]
pub struct MergedRules {
    /// Lists and macros
    pub symbols: SymbolTable,
    /// Rules in first-declaration order
    pub rules: Vec<RuleEntry>,
    rule_index: HashMap<String, usize>,
}

impl MergedRules {
    /// Create an empty merge state
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a merged rule
    pub fn rule(&self, name: &str) -> Option<&RuleEntry> {
        self.rule_index.get(name).map(|&idx| &self.rules[idx])
    }

    /// Apply one declaration
    pub fn apply(&mut self, decl: Declaration) -> Result<(), RuleError> {
        match decl {
            Declaration::List(list) if list.append => self.symbols.append_list(&list.name, list.items),
            Declaration::List(list) => {
                self.symbols.define_list(list.name, list.items);
                Ok(())
            }
            Declaration::Macro(m) if m.append => self.symbols.append_macro(&m.name, m.condition),
            Declaration::Macro(m) => {
                self.symbols.define_macro(m.name, m.condition);
                Ok(())
            }
            Declaration::Rule(rule) => self.apply_rule(rule),
        }
    }

    fn apply_rule(&mut self, mut decl: RuleDecl) -> Result<(), RuleError> {
        let existing = self.rule_index.get(&decl.name).copied();
        match (existing, decl.append) {
            (None, true) => Err(RuleError::AppendWithoutBase {
                kind: DeclKind::Rule,
                name: decl.name,
            }),
            (Some(idx), true) => {
                let entry = &mut self.rules[idx];
                if let Some(condition) = decl.condition.take() {
                    entry.conditions.push(condition);
                }
                entry.override_with(decl);
                Ok(())
            }
            (existing, false) => match (existing, decl.condition.take()) {
                (Some(idx), Some(condition)) => {
                    self.rules[idx] = RuleEntry::from_decl(decl, condition);
                    Ok(())
                }
                (Some(idx), None) => {
                    self.rules[idx].override_with(decl);
                    Ok(())
                }
                (None, Some(condition)) => {
                    self.rule_index.insert(decl.name.clone(), self.rules.len());
                    self.rules.push(RuleEntry::from_decl(decl, condition));
                    Ok(())
                }
                (None, None) => Err(RuleError::MissingCondition { name: decl.name }),
            },
        }
    }
}

/// Apply declarations in order. A declaration that cannot be applied is
/// reported and skipped; later declarations still apply.
pub fn merge(decls: impl IntoIterator<Item = Declaration>) -> (MergedRules, Vec<LoadError>) {
    let mut merged = MergedRules::new();
    let mut errors = Vec::new();
    for decl in decls {
        let (kind, name) = (decl.kind(), decl.name().to_string());
        if let Err(e) = merged.apply(decl) {
            errors.push(LoadError::new(kind, name, e));
        }
    }
    (merged, errors)
}
