//! Rule registry
//!
//! A [`RuleRegistry`] is built once from an ordered sequence of
//! declarations and never changes afterwards. Building merges the
//! declarations, resolves every list and macro, then compiles all rules in a
//! single pass. A failing declaration is reported and left out; it does not
//! stop the others.
//!
//! # Example
//!
//! ```
//! use sysrules::event::{Field, Value};
//! use sysrules::registry::RuleRegistry;
//! use sysrules::rule::{Declaration, Priority, RuleDecl};
//!
//! let (registry, errors) = RuleRegistry::load(vec![
//!     Declaration::list("shell_binaries", &["bash", "sh"]),
//!     RuleDecl::new("Shell", "proc.name in (shell_binaries)")
//!         .with_output("shell %proc.name")
//!         .with_priority(Priority::Warning)
//!         .into(),
//! ]);
//! assert!(errors.is_empty());
//!
//! let accessor = |field: &Field, _: &()| (&*field.name == "proc.name").then(|| Value::from("bash"));
//! let alerts = registry.evaluate_all(&accessor, &());
//! assert_eq!(alerts[0].output, "shell bash");
//! ```

pub mod merge;
pub mod shared;

pub use merge::{merge, MergedRules, RuleEntry};
pub use shared::SharedRegistry;

use crate::ast::Expr;
use crate::compiler::{CompiledRule, Compiler};
use crate::error::{DeclKind, LoadError, LoadErrors, RuleError};
use crate::eval::evaluate;
use crate::event::FieldAccessor;
use crate::output::OutputTemplate;
use crate::rule::{Declaration, Priority, Tags};
use crate::symbols::SymbolTable;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One matched rule for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Rule name
    pub rule: String,
    /// Rule priority
    pub priority: Priority,
    /// Rendered output
    pub output: String,
}

/// Which compiled rules take part in evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    /// Rules below this priority are skipped
    pub min_priority: Priority,
    /// When not empty, only rules carrying one of these tags run
    pub enabled_tags: Vec<String>,
    /// Rules carrying any of these tags are skipped
    pub disabled_tags: Vec<String>,
}

impl RuleFilter {
    /// Whether a rule passes the filter. The rule's enabled flag is
    /// checked separately.
    pub fn selects(&self, rule: &CompiledRule) -> bool {
        rule.priority >= self.min_priority
            && (self.enabled_tags.is_empty() || rule.tags.has_any(&self.enabled_tags))
            && !rule.tags.has_any(&self.disabled_tags)
    }
}

/// Immutable set of compiled rules
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<CompiledRule>>,
    index: HashMap<String, usize>,
    /// Indices of enabled, selected rules; most severe first, then
    /// declaration order
    active: Vec<usize>,
    symbols: SymbolTable,
}

impl RuleRegistry {
    /// Build a registry from declarations, evaluating every enabled rule
    pub fn load(decls: impl IntoIterator<Item = Declaration>) -> (Self, LoadErrors) {
        Self::load_with(decls, &RuleFilter::default())
    }

    /// Build a registry from declarations, restricting evaluation to the
    /// rules the filter selects
    pub fn load_with(decls: impl IntoIterator<Item = Declaration>, filter: &RuleFilter) -> (Self, LoadErrors) {
        let (merged, merge_errors) = merge(decls);
        let mut errors = LoadErrors::default();
        merge_errors.into_iter().for_each(|e| errors.push(e));

        let MergedRules { symbols, rules: entries, .. } = merged;
        let mut compiler = Compiler::new(&symbols);

        // lists and macros are checked on their own so that an unused
        // broken declaration is still reported
        for list in symbols.lists() {
            if let Err(e) = compiler.resolver().resolve_list(&list.name) {
                errors.push(LoadError::new(DeclKind::List, &list.name, e));
            }
        }
        for m in symbols.macros() {
            if let Err(e) = compiler.resolver().resolve_macro(&m.name) {
                errors.push(LoadError::new(DeclKind::Macro, &m.name, e));
            }
        }

        let mut rules = Vec::with_capacity(entries.len());
        for entry in entries {
            match compile_entry(&mut compiler, entry) {
                Ok(rule) => rules.push(Arc::new(rule)),
                Err((name, e)) => errors.push(LoadError::new(DeclKind::Rule, name, e)),
            }
        }
        drop(compiler);

        for err in &errors.errors {
            warn!(kind = %err.kind, name = %err.name, error = %err.error, "Failed to load declaration");
        }

        let registry = Self::from_parts(rules, symbols, filter);
        info!(
            rules = registry.len(),
            active = registry.active_len(),
            disabled = registry.rules.iter().filter(|r| !r.enabled).count(),
            failed = errors.len(),
            "Rule registry built"
        );
        (registry, errors)
    }

    fn from_parts(rules: Vec<Arc<CompiledRule>>, symbols: SymbolTable, filter: &RuleFilter) -> Self {
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        let mut active: Vec<usize> = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.enabled && filter.selects(r))
            .map(|(i, _)| i)
            .collect();
        // stable sort keeps declaration order within a priority
        active.sort_by_key(|&i| std::cmp::Reverse(rules[i].priority));
        Self {
            rules,
            index,
            active,
            symbols,
        }
    }

    /// Evaluate every active rule against one event.
    ///
    /// Alerts come most severe first; rules of equal priority keep
    /// declaration order.
    pub fn evaluate_all<E: ?Sized, A: FieldAccessor<E> + ?Sized>(&self, accessor: &A, event: &E) -> Vec<Alert> {
        self.matching(accessor, event)
            .map(|rule| Alert {
                rule: rule.name.clone(),
                priority: rule.priority,
                output: rule.output.render(accessor, event),
            })
            .collect()
    }

    /// Active rules whose condition holds for the event, in alert order
    pub fn matching<'a, E: ?Sized, A: FieldAccessor<E> + ?Sized>(
        &'a self,
        accessor: &'a A,
        event: &'a E,
    ) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.active
            .iter()
            .map(move |&i| self.rules[i].as_ref())
            .filter(move |rule| evaluate(&rule.condition, accessor, event))
    }

    /// Look up a compiled rule
    pub fn rule(&self, name: &str) -> Option<&CompiledRule> {
        self.index.get(name).map(|&i| self.rules[i].as_ref())
    }

    /// All compiled rules in declaration order, including disabled ones
    pub fn rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Compiled rules carrying a tag
    pub fn rules_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules().filter(move |r| r.tags.contains(tag))
    }

    /// Rules that take part in evaluation, in alert order
    pub fn active_rules(&self) -> impl Iterator<Item = &CompiledRule> {
        self.active.iter().map(|&i| self.rules[i].as_ref())
    }

    /// Lists and macros the rules were compiled against
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule compiled
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules that take part in evaluation
    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

fn compile_entry(compiler: &mut Compiler<'_>, entry: RuleEntry) -> Result<CompiledRule, (String, RuleError)> {
    let mut parts = Vec::with_capacity(entry.conditions.len());
    for condition in &entry.conditions {
        match compiler.compile_condition(condition) {
            Ok(expr) => parts.push(expr),
            Err(e) => return Err((entry.name, e)),
        }
    }
    Ok(CompiledRule {
        condition: Expr::or(parts),
        enabled: entry.enabled,
        priority: entry.priority,
        output: OutputTemplate::compile(&entry.output),
        tags: Tags::from(entry.tags),
        source: entry.source,
        desc: entry.desc,
        name: entry.name,
    })
}
