//! Integer comparisons

use crate::pattern::Operator;
use std::cmp::Ordering;

/// Compare two integers with a symbolic operator.
/// Non-comparison operators never match.
pub fn num_compare(op: Operator, lhs: i64, rhs: i64) -> bool {
    let ord = lhs.cmp(&rhs);
    match op {
        Operator::Eq => ord == Ordering::Equal,
        Operator::Neq => ord != Ordering::Equal,
        Operator::Lt => ord == Ordering::Less,
        Operator::Lte => ord != Ordering::Greater,
        Operator::Gt => ord == Ordering::Greater,
        Operator::Gte => ord != Ordering::Less,
        _ => false,
    }
}
