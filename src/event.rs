//! Event values and the field accessor the engine queries
//!
//! The engine never looks inside an event itself. Every field read goes
//! through a [`FieldAccessor`], which returns a typed [`Value`] or `None`
//! when the field does not apply to the event.

pub use crate::ast::Field;
use crate::pattern::{json_to_value, parse_int};
use ipnetwork::IpNetwork;
use std::borrow::Cow;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Typed value of a field for one event
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text, cheap to clone
    Str(Arc<str>),
    /// Signed integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// IP address
    Ip(IpAddr),
    /// IP network
    Net(IpNetwork),
    /// Set of strings (e.g. all ancestor names)
    Set(Vec<String>),
}

impl Value {
    /// Text rendering used by string operators and output templates.
    /// Sets render as `(a,b,c)`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Str(s) => Cow::Borrowed(s),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Ip(ip) => Cow::Owned(ip.to_string()),
            Value::Net(net) => Cow::Owned(net.to_string()),
            Value::Set(items) => Cow::Owned(format!("({})", items.join(","))),
        }
    }

    /// Integer reading; text is parsed
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => parse_int(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<IpAddr> for Value {
    fn from(ip: IpAddr) -> Self {
        Value::Ip(ip)
    }
}

/// Maps a field and an event to the field's value.
///
/// Implementations must be side-effect free and non-blocking: the evaluator
/// may call them from many threads at once and may skip calls entirely when
/// a logical node short-circuits.
pub trait FieldAccessor<E: ?Sized>: Send + Sync {
    /// Value of `field` for `event`, or `None` if not applicable
    fn get(&self, field: &Field, event: &E) -> Option<Value>;
}

impl<E: ?Sized, F> FieldAccessor<E> for F
where
    F: Fn(&Field, &E) -> Option<Value> + Send + Sync,
{
    fn get(&self, field: &Field, event: &E) -> Option<Value> {
        self(field, event)
    }
}

/// Accessor for JSON object events.
///
/// A dotted name is first looked up as a flat key (`{"proc.name": ...}`),
/// then as a nested path (`{"proc": {"name": ...}}`). A bracketed argument
/// indexes into an array or selects an object key.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAccessor;

impl JsonAccessor {
    fn lookup<'a>(name: &str, event: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
        if let Some(value) = event.get(name) {
            return Some(value);
        }
        if name.is_empty() || name.contains("..") || name.starts_with('.') || name.ends_with('.') {
            return None;
        }
        let mut current = event;
        for part in name.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

impl FieldAccessor<serde_json::Value> for JsonAccessor {
    fn get(&self, field: &Field, event: &serde_json::Value) -> Option<Value> {
        let mut value = Self::lookup(&field.name, event)?;
        if let Some(arg) = &field.arg {
            value = match value {
                serde_json::Value::Array(items) => items.get(arg.parse::<usize>().ok()?)?,
                serde_json::Value::Object(map) => map.get(&**arg)?,
                _ => return None,
            };
        }
        json_to_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_text() {
        assert_eq!(Value::from("bash").as_text(), "bash");
        assert_eq!(Value::Int(-3).as_text(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(
            Value::Set(vec!["sshd".into(), "bash".into()]).to_string(),
            "(sshd,bash)"
        );
    }

    #[test]
    fn test_value_readings() {
        assert_eq!(Value::from("8080").as_int(), Some(8080));
        assert_eq!(Value::Bool(true).as_int(), None);
    }

    #[test]
    fn test_json_accessor_flat_and_nested() {
        let event = json!({
            "proc.name": "bash",
            "fd": {"name": "/etc/shadow", "num": 3},
            "proc": {"aname": ["bash", "sshd", "systemd"]},
            "evt": {"arg": {"flags": "O_RDONLY"}},
            "user.name": null
        });
        let acc = JsonAccessor;
        assert_eq!(acc.get(&Field::new("proc.name"), &event), Some(Value::from("bash")));
        assert_eq!(acc.get(&Field::new("fd.name"), &event), Some(Value::from("/etc/shadow")));
        assert_eq!(acc.get(&Field::new("fd.num"), &event), Some(Value::Int(3)));
        assert_eq!(
            acc.get(&Field::parse("proc.aname[1]"), &event),
            Some(Value::from("sshd"))
        );
        assert_eq!(acc.get(&Field::parse("proc.aname[9]"), &event), None);
        assert_eq!(acc.get(&Field::parse("proc.aname[x]"), &event), None);
        assert_eq!(
            acc.get(&Field::parse("evt.arg[flags]"), &event),
            Some(Value::from("O_RDONLY"))
        );
        assert_eq!(acc.get(&Field::new("user.name"), &event), None);
        assert_eq!(acc.get(&Field::new("fd..name"), &event), None);
        assert_eq!(acc.get(&Field::new("container.id"), &event), None);
    }

    #[test]
    fn test_closure_accessor() {
        let acc = |field: &Field, _event: &()| -> Option<Value> {
            (&*field.name == "proc.pid").then(|| Value::Int(1))
        };
        assert_eq!(acc.get(&Field::new("proc.pid"), &()), Some(Value::Int(1)));
        assert_eq!(acc.get(&Field::new("proc.name"), &()), None);
    }
}
