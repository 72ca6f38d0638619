//! Rule compilation
//!
//! Turns a parsed condition into a self-contained [`Expr`]: macro names are
//! replaced by their expanded trees, list names inside set operands are
//! replaced by their flattened items, and every literal is pre-parsed for
//! the operator it is used with.
//!
//! A macro is expanded once per pass and its body is shared by reference
//! between every condition that uses it. A comparison whose left side is an
//! integer literal (`1 = 1`) has no field to read and is folded into a
//! constant.

use crate::ast::{Comparison, Expr, Field, Literal, Operand, RawComparison, RawExpr, RawOperand, RawValue};
use crate::error::{DeclKind, RuleError};
use crate::eval::evaluate_comparison;
use crate::event::Value;
use crate::output::OutputTemplate;
use crate::parser::parse_condition;
use crate::pattern::{parse_hex, parse_int, Operator};
use crate::rule::{Priority, Tags};
use crate::symbols::{Resolver, SymbolTable};
use glob::Pattern as GlobPattern;
use std::collections::HashSet;

/// Maximum number of comparisons a condition may expand to
pub const MAX_EXPANDED_LEAVES: usize = 1 << 16;

/// A rule ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    /// Rule name
    pub name: String,
    /// Description
    pub desc: String,
    /// Resolved condition
    pub condition: Expr,
    /// Whether the rule is evaluated
    pub enabled: bool,
    /// Severity
    pub priority: Priority,
    /// Output template
    pub output: OutputTemplate,
    /// Selection tags
    pub tags: Tags,
    /// Event source the rule applies to, if declared
    pub source: Option<String>,
}

impl CompiledRule {
    /// Set the description
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Set the event source
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }
}

/// Compiles rules against one symbol table, sharing resolution work
/// between all rules of a pass.
#[derive(Debug)]
pub struct Compiler<'t> {
    resolver: Resolver<'t>,
}

impl<'t> Compiler<'t> {
    /// Create a compiler for a symbol table
    pub fn new(table: &'t SymbolTable) -> Self {
        Self {
            resolver: Resolver::new(table),
        }
    }

    /// Access the underlying resolver
    pub fn resolver(&mut self) -> &mut Resolver<'t> {
        &mut self.resolver
    }

    /// Parse and resolve a condition
    pub fn compile_condition(&mut self, condition: &str) -> Result<Expr, RuleError> {
        let raw = parse_condition(condition)?;
        let expr = lower(&raw, &mut self.resolver)?;
        if expr.leaf_count() > MAX_EXPANDED_LEAVES {
            return Err(RuleError::ExpansionTooLarge {
                limit: MAX_EXPANDED_LEAVES,
            });
        }
        Ok(expr)
    }

    /// Compile one rule
    pub fn compile_rule(
        &mut self,
        name: &str,
        raw_condition: &str,
        enabled: bool,
        priority: Priority,
        output: &str,
        tags: Tags,
    ) -> Result<CompiledRule, RuleError> {
        let condition = self.compile_condition(raw_condition)?;
        Ok(CompiledRule {
            name: name.to_string(),
            desc: String::new(),
            condition,
            enabled,
            priority,
            output: OutputTemplate::compile(output),
            tags,
            source: None,
        })
    }
}

/// Resolve a parsed tree. Bare names must be macros; list names are only
/// meaningful inside set operands. Every node counts one level of nesting,
/// including the levels of macro bodies it expands.
pub(crate) fn lower(raw: &RawExpr, resolver: &mut Resolver<'_>) -> Result<Expr, RuleError> {
    resolver.enter()?;
    let result = lower_node(raw, resolver);
    resolver.leave();
    result
}

fn lower_node(raw: &RawExpr, resolver: &mut Resolver<'_>) -> Result<Expr, RuleError> {
    match raw {
        RawExpr::And(children) => Ok(Expr::And(lower_all(children, resolver)?)),
        RawExpr::Or(children) => Ok(Expr::Or(lower_all(children, resolver)?)),
        RawExpr::Not(child) => Ok(Expr::not(lower(child, resolver)?)),
        RawExpr::Name { name, .. } => {
            if resolver.has_macro(name) {
                Ok(Expr::Macro(resolver.resolve_macro(name)?))
            } else {
                Err(RuleError::UndefinedReference {
                    kind: DeclKind::Macro,
                    name: name.clone(),
                })
            }
        }
        RawExpr::Compare(cmp) => {
            let comparison = lower_comparison(cmp, resolver)?;
            Ok(match constant_operand(&comparison.field) {
                Some(n) => fold_constant(&comparison, n),
                None => Expr::Leaf(comparison),
            })
        }
    }
}

/// An integer where a field name is expected, as in `1 = 1`
fn constant_operand(field: &Field) -> Option<i64> {
    match field.arg {
        Some(_) => None,
        None => parse_int(&field.name),
    }
}

fn fold_constant(comparison: &Comparison, n: i64) -> Expr {
    let constant = |_: &Field, _: &()| Some(Value::Int(n));
    Expr::Const(evaluate_comparison(comparison, &constant, &()))
}

fn lower_all(children: &[RawExpr], resolver: &mut Resolver<'_>) -> Result<Vec<Expr>, RuleError> {
    children.iter().map(|c| lower(c, resolver)).collect()
}

fn type_mismatch(cmp: &RawComparison, message: &str) -> RuleError {
    RuleError::TypeMismatch {
        field: cmp.field.to_string(),
        operator: cmp.operator.as_str().to_string(),
        message: message.to_string(),
    }
}

fn lower_comparison(cmp: &RawComparison, resolver: &mut Resolver<'_>) -> Result<Comparison, RuleError> {
    let op = cmp.operator;
    let operand = match (&cmp.operand, op) {
        (RawOperand::None, op) if op.is_unary() => Operand::Absent,
        (_, op) if op.is_unary() => return Err(type_mismatch(cmp, "takes no value")),
        (RawOperand::None, _) => return Err(type_mismatch(cmp, "needs a value")),

        (RawOperand::List(items), op) if op.takes_set() => Operand::Set(expand_set(items, resolver)?),
        (RawOperand::Value(_), op) if op.takes_set() => {
            return Err(type_mismatch(cmp, "expects a parenthesized list"))
        }
        (RawOperand::List(_), _) => return Err(type_mismatch(cmp, "takes a single value, not a list")),

        (RawOperand::Value(v), Operator::Glob | Operator::IGlob) => {
            let pattern = GlobPattern::new(&v.text).map_err(|e| RuleError::InvalidLiteral {
                value: v.text.clone(),
                message: e.to_string(),
            })?;
            Operand::Glob(pattern)
        }
        (RawOperand::Value(v), Operator::BContains | Operator::BStartsWith) => {
            let bytes = parse_hex(&v.text).map_err(|message| RuleError::InvalidLiteral {
                value: v.text.clone(),
                message,
            })?;
            Operand::Bytes(bytes)
        }
        (RawOperand::Value(v), _) => Operand::Scalar(Literal::new(v.text.clone())),
    };
    Ok(Comparison {
        field: cmp.field.clone(),
        operator: op,
        operand,
    })
}

/// Expand list names among unquoted items and drop duplicates, keeping the
/// first occurrence.
fn expand_set(items: &[RawValue], resolver: &mut Resolver<'_>) -> Result<Vec<Literal>, RuleError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !item.quoted && resolver.has_list(&item.text) {
            for value in resolver.resolve_list(&item.text)?.iter() {
                if seen.insert(value.clone()) {
                    out.push(Literal::new(value.clone()));
                }
            }
        } else if seen.insert(item.text.clone()) {
            out.push(Literal::new(item.text.clone()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.define_list("shell_binaries", vec!["bash".into(), "sh".into()]);
        table.define_macro("spawned_process", "evt.type = execve");
        table.define_macro("shell", "proc.name in (shell_binaries)");
        table
    }

    #[test]
    fn test_list_expansion() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let expr = compiler
            .compile_condition("proc.name in (shell_binaries, zsh, bash)")
            .unwrap();
        assert_eq!(expr.to_string(), "proc.name in (bash, sh, zsh)");
    }

    #[test]
    fn test_quoted_item_not_expanded() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let expr = compiler.compile_condition("proc.name in (\"shell_binaries\")").unwrap();
        let Expr::Leaf(cmp) = expr else {
            panic!("expected leaf");
        };
        assert_eq!(cmp.operand, Operand::Set(vec![Literal::new("shell_binaries")]));
    }

    #[test]
    fn test_macro_inlined_with_grouping() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let via_macro = compiler
            .compile_condition("spawned_process and shell or proc.name = x")
            .unwrap();
        let inline = compiler
            .compile_condition("(evt.type = execve) and (proc.name in (bash, sh)) or proc.name = x")
            .unwrap();
        assert_eq!(via_macro, inline);
    }

    #[test]
    fn test_undefined_name() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        assert_eq!(
            compiler.compile_condition("spawned_process and nope").unwrap_err(),
            RuleError::UndefinedReference {
                kind: DeclKind::Macro,
                name: "nope".into()
            }
        );
        // a list is not a condition
        assert!(matches!(
            compiler.compile_condition("shell_binaries"),
            Err(RuleError::UndefinedReference { kind: DeclKind::Macro, .. })
        ));
    }

    #[test]
    fn test_operand_shape_errors() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        for cond in ["proc.name in bash", "proc.name = (bash, sh)", "proc.name contains (a)"] {
            assert!(
                matches!(compiler.compile_condition(cond), Err(RuleError::TypeMismatch { .. })),
                "{cond}"
            );
        }
    }

    #[test]
    fn test_literal_errors() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        assert!(matches!(
            compiler.compile_condition("evt.buffer bcontains xyz"),
            Err(RuleError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            compiler.compile_condition("fd.name glob \"[a-\""),
            Err(RuleError::InvalidLiteral { .. })
        ));
        let expr = compiler.compile_condition("evt.buffer bstartswith 7f454c46").unwrap();
        assert_eq!(expr.to_string(), "evt.buffer bstartswith 7f454c46");
    }

    #[test]
    fn test_syntax_error_propagates() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let err = compiler.compile_condition("proc.name = ").unwrap_err();
        assert!(matches!(err, RuleError::Syntax(ref e) if e.position == 12));
    }

    #[rstest]
    #[case("1 = 1", true)]
    #[case("(1=1)", true)]
    #[case("1 = 0", false)]
    #[case("1 != 1", false)]
    #[case("2 > 1", true)]
    #[case("1 in (0, 1)", true)]
    #[case("1 exists", true)]
    fn test_constant_comparison_folds(#[case] condition: &str, #[case] expected: bool) {
        let table = table();
        let expr = Compiler::new(&table).compile_condition(condition).unwrap();
        assert_eq!(expr, Expr::Const(expected), "{condition}");
    }

    #[test]
    fn test_macro_body_shared_between_rules() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let first = compiler.compile_condition("spawned_process and shell").unwrap();
        let second = compiler.compile_condition("not shell").unwrap();
        let Expr::And(children) = &first else {
            panic!("expected and");
        };
        let Expr::Not(negated) = &second else {
            panic!("expected not");
        };
        match (&children[1], negated.as_ref()) {
            (Expr::Macro(a), Expr::Macro(b)) => assert!(std::sync::Arc::ptr_eq(a, b)),
            other => panic!("expected macro references, got {other:?}"),
        }
    }

    #[test]
    fn test_doubling_chain_compiles_without_expanding() {
        let mut table = SymbolTable::new();
        table.define_macro("m0", "proc.name = bash");
        for i in 1..=16 {
            table.define_macro(format!("m{i}"), format!("m{0} and m{0}", i - 1));
        }
        let mut compiler = Compiler::new(&table);
        let expr = compiler.compile_condition("m16").unwrap();
        assert_eq!(expr.leaf_count(), MAX_EXPANDED_LEAVES);
        assert_eq!(expr.height(), 34);

        assert_eq!(
            compiler.compile_condition("m16 or proc.name = sh").unwrap_err(),
            RuleError::ExpansionTooLarge {
                limit: MAX_EXPANDED_LEAVES
            }
        );
    }

    #[test]
    fn test_compile_rule() {
        let table = table();
        let mut compiler = Compiler::new(&table);
        let rule = compiler
            .compile_rule(
                "Shell spawned",
                "spawned_process and shell",
                true,
                Priority::Warning,
                "shell %proc.name",
                Tags::from(&["shell"][..]),
            )
            .unwrap()
            .with_desc("A shell ran");
        assert_eq!(rule.condition.leaf_count(), 2);
        assert_eq!(rule.output.source(), "shell %proc.name");
        assert_eq!(rule.desc, "A shell ran");
        assert!(rule.tags.contains("shell"));
    }
}
