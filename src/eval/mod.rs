//! Condition evaluation
//!
//! Evaluation is a pure walk over a compiled [`Expr`]. `and` stops at the
//! first false child and `or` at the first true one, so fields read only by
//! skipped children are never requested from the accessor.
//!
//! A field the accessor reports as not applicable makes every comparison on
//! it false, except `exists` and `!exists`. A value that cannot be read in
//! the domain an operator needs (text where an integer is expected, a
//! boolean compared with an address, ...) also yields false. Nothing here
//! can fail.

use crate::ast::{Comparison, Expr, Literal, Operand};
use crate::compiler::CompiledRule;
use crate::event::{FieldAccessor, Value};
use crate::pattern::{
    bytes_contains, bytes_starts_with, glob_match, num_compare, path_match, str_contains,
    str_ends_with, str_icontains, str_starts_with, Operator,
};

/// Evaluate a compiled condition against one event
pub fn evaluate<E: ?Sized, A: FieldAccessor<E> + ?Sized>(expr: &Expr, accessor: &A, event: &E) -> bool {
    match expr {
        Expr::And(children) => children.iter().all(|c| evaluate(c, accessor, event)),
        Expr::Or(children) => children.iter().any(|c| evaluate(c, accessor, event)),
        Expr::Not(child) => !evaluate(child, accessor, event),
        Expr::Leaf(cmp) => evaluate_comparison(cmp, accessor, event),
        Expr::Const(value) => *value,
        Expr::Macro(m) => evaluate(&m.body, accessor, event),
    }
}

/// Evaluate a rule's condition. The enabled flag is not consulted; callers
/// that dispatch many rules filter on it.
pub fn evaluate_rule<E: ?Sized, A: FieldAccessor<E> + ?Sized>(
    rule: &CompiledRule,
    accessor: &A,
    event: &E,
) -> bool {
    evaluate(&rule.condition, accessor, event)
}

/// Evaluate one leaf comparison
pub fn evaluate_comparison<E: ?Sized, A: FieldAccessor<E> + ?Sized>(
    cmp: &Comparison,
    accessor: &A,
    event: &E,
) -> bool {
    let value = accessor.get(&cmp.field, event);
    match cmp.operator {
        Operator::Exists => return value.is_some(),
        Operator::NotExists => return value.is_none(),
        _ => {}
    }
    let Some(value) = value else {
        return false;
    };
    match &cmp.operand {
        Operand::Absent => false,
        Operand::Scalar(lit) => match_scalar(cmp.operator, &value, lit),
        Operand::Set(items) => match_set(cmp.operator, &value, items),
        Operand::Glob(pattern) => {
            let case_sensitive = cmp.operator == Operator::Glob;
            any_text(&value, |text| glob_match(pattern, text, case_sensitive))
        }
        Operand::Bytes(needle) => {
            let text = value.as_text();
            match cmp.operator {
                Operator::BContains => bytes_contains(text.as_bytes(), needle),
                Operator::BStartsWith => bytes_starts_with(text.as_bytes(), needle),
                _ => false,
            }
        }
    }
}

/// String operators on a set value hold if they hold for any element
fn any_text(value: &Value, f: impl Fn(&str) -> bool) -> bool {
    match value {
        Value::Set(items) => items.iter().any(|item| f(item)),
        _ => f(&value.as_text()),
    }
}

fn match_scalar(op: Operator, value: &Value, lit: &Literal) -> bool {
    match op {
        Operator::Eq => equals(value, lit).unwrap_or(false),
        Operator::Neq => equals(value, lit).map(|eq| !eq).unwrap_or(false),
        op if op.is_ordering() => match (value.as_int(), lit.int) {
            (Some(lhs), Some(rhs)) => num_compare(op, lhs, rhs),
            _ => false,
        },
        Operator::Contains => any_text(value, |t| str_contains(t, &lit.text)),
        Operator::IContains => any_text(value, |t| str_icontains(t, &lit.text)),
        Operator::StartsWith => any_text(value, |t| str_starts_with(t, &lit.text)),
        Operator::EndsWith => any_text(value, |t| str_ends_with(t, &lit.text)),
        _ => false,
    }
}

/// Equality in the value's own domain; `None` when the literal has no
/// reading in that domain.
fn equals(value: &Value, lit: &Literal) -> Option<bool> {
    match value {
        Value::Str(s) => Some(**s == *lit.text),
        Value::Int(i) => lit.int.map(|n| n == *i),
        Value::Bool(b) => lit.boolean.map(|l| l == *b),
        Value::Ip(ip) => lit.net.map(|net| net.contains(*ip)),
        Value::Net(net) => match (lit.ip, lit.net) {
            (_, Some(other)) if lit.text.contains('/') => Some(*net == other),
            (Some(ip), _) => Some(net.contains(ip)),
            _ => None,
        },
        Value::Set(_) => None,
    }
}

fn in_set(value: &Value, items: &[Literal]) -> bool {
    items.iter().any(|lit| equals(value, lit).unwrap_or(false))
}

fn match_set(op: Operator, value: &Value, items: &[Literal]) -> bool {
    match op {
        Operator::In => match value {
            Value::Set(elems) => {
                !elems.is_empty() && elems.iter().all(|e| items.iter().any(|lit| *e == lit.text))
            }
            _ => in_set(value, items),
        },
        Operator::Intersects => match value {
            Value::Set(elems) => elems.iter().any(|e| items.iter().any(|lit| *e == lit.text)),
            _ => in_set(value, items),
        },
        Operator::PMatch => any_text(value, |t| items.iter().any(|lit| path_match(t, &lit.text))),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Field;
    use crate::compiler::Compiler;
    use crate::symbols::SymbolTable;
    use rstest::rstest;
    use std::collections::HashMap;

    fn compile(condition: &str) -> Expr {
        let mut table = SymbolTable::new();
        table.define_list("shells", vec!["bash".into(), "sh".into()]);
        table.define_list("private", vec!["10.0.0.0/8".into(), "192.168.0.0/16".into()]);
        Compiler::new(&table).compile_condition(condition).unwrap()
    }

    fn event() -> HashMap<&'static str, Value> {
        HashMap::from([
            ("proc.name", Value::from("bash")),
            ("proc.cmdline", Value::from("bash -c 'cat /etc/shadow'")),
            ("proc.pid", Value::Int(4242)),
            ("proc.tty", Value::from("34816")),
            ("fd.name", Value::from("/etc/shadow")),
            ("fd.sip", Value::Ip("10.1.2.3".parse().unwrap())),
            ("fd.snet", Value::Net("10.1.0.0/16".parse().unwrap())),
            ("container.privileged", Value::Bool(true)),
            ("proc.anames", Value::Set(vec!["sshd".into(), "bash".into()])),
            ("evt.buffer", Value::from("\x7fELF\x02\x01")),
        ])
    }

    fn accessor(field: &Field, event: &HashMap<&'static str, Value>) -> Option<Value> {
        event.get(&*field.name).cloned()
    }

    #[rstest]
    #[case("proc.name = bash", true)]
    #[case("proc.name != bash", false)]
    #[case("proc.name = BASH", false)]
    #[case("proc.pid = 4242", true)]
    #[case("proc.pid > 1000 and proc.pid <= 4242", true)]
    #[case("proc.pid = bash", false)]
    #[case("proc.pid != bash", false)]
    #[case("proc.tty > 0", true)]
    #[case("proc.name > 0", false)]
    #[case("proc.cmdline contains shadow", true)]
    #[case("proc.cmdline icontains SHADOW", true)]
    #[case("proc.cmdline startswith \"bash -c\"", true)]
    #[case("fd.name endswith shadow", true)]
    #[case("fd.name glob \"/etc/*\"", true)]
    #[case("fd.name glob \"/ETC/*\"", false)]
    #[case("fd.name iglob \"/ETC/*\"", true)]
    #[case("fd.name pmatch (/etc, /usr/bin)", true)]
    #[case("fd.name pmatch (/et)", false)]
    #[case("proc.name in (shells)", true)]
    #[case("proc.name in (zsh, fish)", false)]
    #[case("proc.anames in (sshd, bash, init)", true)]
    #[case("proc.anames in (bash)", false)]
    #[case("proc.anames intersects (bash)", true)]
    #[case("proc.anames intersects (zsh)", false)]
    #[case("proc.anames contains ssh", true)]
    #[case("fd.sip = 10.1.2.3", true)]
    #[case("fd.sip = 10.0.0.0/8", true)]
    #[case("fd.sip in (private)", true)]
    #[case("fd.sip = bash", false)]
    #[case("fd.snet = 10.1.9.9", true)]
    #[case("fd.snet = 10.1.0.0/16", true)]
    #[case("container.privileged = true", true)]
    #[case("container.privileged = yes", false)]
    #[case("evt.buffer bstartswith 7f454c46", true)]
    #[case("evt.buffer bcontains 0201", true)]
    #[case("evt.buffer bcontains 0303", false)]
    #[case("fd.name exists", true)]
    #[case("user.name exists", false)]
    #[case("user.name !exists", true)]
    #[case("user.name = root", false)]
    #[case("user.name != root", false)]
    #[case("not user.name = root", true)]
    fn test_leaf(#[case] condition: &str, #[case] expected: bool) {
        let expr = compile(condition);
        assert_eq!(evaluate(&expr, &accessor, &event()), expected, "{condition}");
    }

    #[test]
    fn test_always_true_macro() {
        let mut table = SymbolTable::new();
        table.define_macro("always_true", "(1=1)");
        let mut compiler = Compiler::new(&table);
        let empty = HashMap::new();

        let alone = compiler.compile_condition("always_true").unwrap();
        assert!(evaluate(&alone, &accessor, &event()));
        assert!(evaluate(&alone, &accessor, &empty));

        let contradiction = compiler
            .compile_condition("always_true and not always_true")
            .unwrap();
        assert!(!evaluate(&contradiction, &accessor, &event()));
        assert!(!evaluate(&contradiction, &accessor, &empty));
    }

    #[test]
    fn test_short_circuit() {
        use std::sync::Mutex;

        let seen = Mutex::new(Vec::new());
        let recording = |field: &Field, event: &HashMap<&'static str, Value>| {
            seen.lock().unwrap().push(field.to_string());
            event.get(&*field.name).cloned()
        };
        let ev = event();

        let expr = compile("proc.name = zsh and (fd.name exists or proc.pid > 1)");
        assert!(!evaluate(&expr, &recording, &ev));
        assert_eq!(*seen.lock().unwrap(), vec!["proc.name"]);

        seen.lock().unwrap().clear();
        let expr = compile("proc.name = bash or fd.name exists");
        assert!(evaluate(&expr, &recording, &ev));
        assert_eq!(*seen.lock().unwrap(), vec!["proc.name"]);
    }
}
