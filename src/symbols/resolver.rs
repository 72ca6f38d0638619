use super::SymbolTable;
use crate::ast::{Expr, MacroExpr};
use crate::compiler::{lower, MAX_EXPANDED_LEAVES};
use crate::error::{DeclKind, RuleError};
use crate::parser::parse_condition;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maximum length of a list reference chain
pub const MAX_RESOLVE_DEPTH: usize = 128;

/// Maximum height of a compiled condition, counting every connective,
/// negation and macro reference along the path from the root, across all
/// macro bodies it passes through
pub const MAX_NESTING_DEPTH: usize = 256;

/// Resolves list and macro names against one symbol table.
///
/// Depth-first with an in-progress stack per kind: a name met again while
/// still on the stack is a cycle, reported as the path from its first
/// occurrence back to itself. Results are memoized so each declaration is
/// resolved at most once per pass, and an expanded macro body is shared by
/// every condition that references it. Nesting failures depend on where a
/// macro is referenced and are not memoized.
#[derive(Debug)]
pub struct Resolver<'t> {
    table: &'t SymbolTable,
    lists: HashMap<String, Result<Arc<[String]>, RuleError>>,
    macros: HashMap<String, Result<Arc<MacroExpr>, RuleError>>,
    list_stack: Vec<String>,
    macro_stack: Vec<String>,
    depth: usize,
}

fn cycle_from(stack: &[String], name: &str) -> Option<Vec<String>> {
    let start = stack.iter().position(|n| n == name)?;
    let mut cycle = stack[start..].to_vec();
    cycle.push(name.to_string());
    Some(cycle)
}

fn too_deep(kind: DeclKind, name: &str) -> RuleError {
    RuleError::NestingTooDeep {
        kind,
        name: name.to_string(),
        limit: MAX_NESTING_DEPTH,
    }
}

impl<'t> Resolver<'t> {
    /// Create a resolver with an empty memo
    pub fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            lists: HashMap::new(),
            macros: HashMap::new(),
            list_stack: Vec::new(),
            macro_stack: Vec::new(),
            depth: 0,
        }
    }

    /// Whether a list of this name exists
    pub fn has_list(&self, name: &str) -> bool {
        self.table.list(name).is_some()
    }

    /// Whether a macro of this name exists
    pub fn has_macro(&self, name: &str) -> bool {
        self.table.macro_def(name).is_some()
    }

    /// Enter one level of the condition being built. Every successful call
    /// is paired with [`Resolver::leave`].
    pub(crate) fn enter(&mut self) -> Result<(), RuleError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(match self.macro_stack.last() {
                Some(name) => too_deep(DeclKind::Macro, name),
                None => too_deep(DeclKind::Rule, "<condition>"),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Flatten a list: nested list names are expanded depth-first, left to
    /// right, keeping the first occurrence of each value.
    pub fn resolve_list(&mut self, name: &str) -> Result<Arc<[String]>, RuleError> {
        if let Some(done) = self.lists.get(name) {
            return done.clone();
        }
        if let Some(cycle) = cycle_from(&self.list_stack, name) {
            return Err(RuleError::CyclicReference {
                kind: DeclKind::List,
                cycle,
            });
        }
        if self.list_stack.len() >= MAX_RESOLVE_DEPTH {
            return Err(RuleError::NestingTooDeep {
                kind: DeclKind::List,
                name: name.to_string(),
                limit: MAX_RESOLVE_DEPTH,
            });
        }
        let table = self.table;
        let def = table
            .list(name)
            .ok_or_else(|| RuleError::UndefinedReference {
                kind: DeclKind::List,
                name: name.to_string(),
            })?;

        self.list_stack.push(name.to_string());
        let result = self.flatten(&def.items);
        self.list_stack.pop();

        let result: Result<Arc<[String]>, RuleError> = result.map(Arc::from);
        self.lists.insert(name.to_string(), result.clone());
        result
    }

    fn flatten(&mut self, items: &[String]) -> Result<Vec<String>, RuleError> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if self.has_list(item) {
                for value in self.resolve_list(item)?.iter() {
                    if seen.insert(value.clone()) {
                        out.push(value.clone());
                    }
                }
            } else if seen.insert(item.clone()) {
                out.push(item.clone());
            }
        }
        Ok(out)
    }

    /// Expand a macro into a self-contained condition tree.
    ///
    /// The caller's current nesting counts against [`MAX_NESTING_DEPTH`], so
    /// a macro that fits at the top of one condition may be too deep inside
    /// another.
    pub fn resolve_macro(&mut self, name: &str) -> Result<Arc<MacroExpr>, RuleError> {
        if let Some(done) = self.macros.get(name) {
            if let Ok(expanded) = done {
                if self.depth + expanded.height() > MAX_NESTING_DEPTH {
                    return Err(too_deep(DeclKind::Macro, name));
                }
            }
            return done.clone();
        }
        if let Some(cycle) = cycle_from(&self.macro_stack, name) {
            return Err(RuleError::CyclicReference {
                kind: DeclKind::Macro,
                cycle,
            });
        }
        let table = self.table;
        let def = table
            .macro_def(name)
            .ok_or_else(|| RuleError::UndefinedReference {
                kind: DeclKind::Macro,
                name: name.to_string(),
            })?;

        self.macro_stack.push(name.to_string());
        let result = self.expand(&def.conditions);
        self.macro_stack.pop();

        let result = result.and_then(|body| {
            let expanded = MacroExpr::new(name, body);
            if expanded.leaf_count() > MAX_EXPANDED_LEAVES {
                return Err(RuleError::ExpansionTooLarge {
                    limit: MAX_EXPANDED_LEAVES,
                });
            }
            Ok(Arc::new(expanded))
        });
        if !matches!(result, Err(RuleError::NestingTooDeep { .. })) {
            self.macros.insert(name.to_string(), result.clone());
        }
        result
    }

    /// Lower a macro's conditions; appended conditions are OR-ed together
    fn expand(&mut self, conditions: &[String]) -> Result<Expr, RuleError> {
        if let [condition] = conditions {
            return lower(&parse_condition(condition)?, self);
        }
        self.enter()?;
        let parts = conditions
            .iter()
            .map(|text| {
                let raw = parse_condition(text)?;
                lower(&raw, self)
            })
            .collect::<Result<Vec<Expr>, RuleError>>();
        self.leave();
        Ok(Expr::or(parts?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flatten_nested_lists() {
        let mut table = SymbolTable::new();
        table.define_list("shells", items(&["bash", "sh", "zsh"]));
        table.define_list("interpreters", items(&["python", "shells", "bash", "perl"]));

        let mut resolver = Resolver::new(&table);
        let resolved = resolver.resolve_list("interpreters").unwrap();
        assert_eq!(&*resolved, &items(&["python", "bash", "sh", "zsh", "perl"])[..]);
    }

    #[test]
    fn test_list_forward_reference() {
        let mut table = SymbolTable::new();
        table.define_list("all", items(&["later"]));
        table.define_list("later", items(&["x"]));
        let mut resolver = Resolver::new(&table);
        assert_eq!(&*resolver.resolve_list("all").unwrap(), &items(&["x"])[..]);
    }

    #[test]
    fn test_list_cycle() {
        let mut table = SymbolTable::new();
        table.define_list("a", items(&["b"]));
        table.define_list("b", items(&["c", "a"]));
        table.define_list("c", items(&["x"]));
        let mut resolver = Resolver::new(&table);
        assert_eq!(
            resolver.resolve_list("a").unwrap_err(),
            RuleError::CyclicReference {
                kind: DeclKind::List,
                cycle: items(&["a", "b", "a"]),
            }
        );
        // c is unaffected
        assert!(resolver.resolve_list("c").is_ok());
    }

    #[test]
    fn test_list_self_reference() {
        let mut table = SymbolTable::new();
        table.define_list("a", items(&["x", "a"]));
        let mut resolver = Resolver::new(&table);
        let err = resolver.resolve_list("a").unwrap_err();
        assert_eq!(err.to_string(), "cyclic list reference: a -> a");
    }

    #[test]
    fn test_undefined_list() {
        let table = SymbolTable::new();
        let mut resolver = Resolver::new(&table);
        assert_eq!(
            resolver.resolve_list("nope").unwrap_err(),
            RuleError::UndefinedReference {
                kind: DeclKind::List,
                name: "nope".into()
            }
        );
    }

    #[test]
    fn test_macro_cycle() {
        let mut table = SymbolTable::new();
        table.define_macro("a", "b and proc.name = x");
        table.define_macro("b", "a or proc.name = y");
        let mut resolver = Resolver::new(&table);
        assert_eq!(
            resolver.resolve_macro("a").unwrap_err(),
            RuleError::CyclicReference {
                kind: DeclKind::Macro,
                cycle: items(&["a", "b", "a"]),
            }
        );
        // memoized failure for the other participant
        assert!(matches!(
            resolver.resolve_macro("b"),
            Err(RuleError::CyclicReference { .. })
        ));
    }

    #[test]
    fn test_macro_resolved_once() {
        let mut table = SymbolTable::new();
        table.define_macro("leaf", "proc.name = bash");
        table.define_macro("mid", "leaf and leaf");
        let mut resolver = Resolver::new(&table);
        let first = resolver.resolve_macro("mid").unwrap();
        let second = resolver.resolve_macro("mid").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.to_string(), "proc.name = bash and proc.name = bash");

        // both references share the one expanded body of `leaf`
        let Expr::And(children) = &first.body else {
            panic!("expected and");
        };
        match (&children[0], &children[1]) {
            (Expr::Macro(a), Expr::Macro(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected macro references, got {other:?}"),
        }
    }

    #[test]
    fn test_long_chain_hits_limit() {
        let mut table = SymbolTable::new();
        let n = MAX_NESTING_DEPTH + 5;
        for i in 0..n {
            table.define_macro(format!("m{i}"), format!("m{}", i + 1));
        }
        table.define_macro(format!("m{n}"), "proc.name = bash");
        let mut resolver = Resolver::new(&table);
        assert!(matches!(
            resolver.resolve_macro("m0"),
            Err(RuleError::NestingTooDeep { kind: DeclKind::Macro, .. })
        ));
        // a shorter suffix of the same chain still fits
        assert!(resolver.resolve_macro("m100").is_ok());
    }

    #[test]
    fn test_memoized_macro_checked_against_caller_depth() {
        let nots = |body: &str| "not (".repeat(50) + body + &")".repeat(50);
        let mut table = SymbolTable::new();
        table.define_macro("inner", nots("proc.name = bash"));
        for i in 0..8 {
            let next = if i == 0 { "inner".to_string() } else { format!("wrap{}", i - 1) };
            table.define_macro(format!("wrap{i}"), nots(&next));
        }
        let mut resolver = Resolver::new(&table);
        assert_eq!(resolver.resolve_macro("inner").unwrap().height(), 51);
        assert!(matches!(
            resolver.resolve_macro("wrap7"),
            Err(RuleError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. })
        ));
        // wrap2 failed inside wrap7 but fits on its own
        assert_eq!(resolver.resolve_macro("wrap2").unwrap().height(), 204);
        assert_eq!(resolver.resolve_macro("wrap3").unwrap().height(), 255);
        assert_eq!(
            resolver.resolve_macro("wrap4").unwrap_err(),
            RuleError::NestingTooDeep {
                kind: DeclKind::Macro,
                name: "wrap3".into(),
                limit: MAX_NESTING_DEPTH,
            }
        );
        assert_eq!(resolver.depth, 0);
    }

    #[test]
    fn test_doubling_chain_shares_bodies() {
        let mut table = SymbolTable::new();
        table.define_macro("m0", "proc.name = bash");
        for i in 1..=40 {
            table.define_macro(format!("m{i}"), format!("m{0} and m{0}", i - 1));
        }
        let mut resolver = Resolver::new(&table);
        assert!(resolver.resolve_macro("m12").is_ok());
        assert!(matches!(
            resolver.resolve_macro("m40"),
            Err(RuleError::ExpansionTooLarge { limit: MAX_EXPANDED_LEAVES })
        ));
    }
}
