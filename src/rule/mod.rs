//! Rule file declarations
//!
//! A rule file is a YAML sequence. Each item is one of:
//!
//! ```yaml
//! - required_engine_version: 2
//! - list: shell_binaries
//!   items: [bash, sh, zsh]
//! - macro: spawned_process
//!   condition: evt.type = execve
//! - rule: Shell in container
//!   desc: A shell was spawned in a container
//!   condition: spawned_process and proc.name in (shell_binaries)
//!   output: "shell spawned (user=%user.name cmd=%proc.cmdline)"
//!   priority: WARNING
//!   tags: [container, shell]
//! ```
//!
//! Any declaration may carry `append: true`.
//!
//! # Example
//!
//! ```
//! use sysrules::rule::{parse_rule_file, Declaration};
//!
//! # fn example() -> sysrules::Result<()> {
//! let file = parse_rule_file(b"- list: shells\n  items: [bash, sh]\n")?;
//! assert!(matches!(file.declarations[0], Declaration::List(_)));
//! # Ok(())
//! # }
//! ```

use crate::error::{DeclKind, LoadError, Result, RuleError};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub mod priority;
pub mod tags;

pub use priority::{Priority, UnknownPriority};
pub use tags::Tags;

/// Version of the condition language and rule file format this engine
/// implements. Independent of the crate version: rule files written for
/// integer engine version `N` load when `0.N.0` is not newer than this.
pub const ENGINE_VERSION: &str = "0.26.0";

/// List items may be written as strings, numbers or booleans
fn scalar_strings<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    let values = Vec::<serde_yaml::Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            serde_yaml::Value::String(s) => Ok(s),
            serde_yaml::Value::Number(n) => Ok(n.to_string()),
            serde_yaml::Value::Bool(b) => Ok(b.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "list items must be scalars, found {other:?}"
            ))),
        })
        .collect()
}

/// `list:` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDecl {
    /// List name
    #[serde(rename = "list")]
    pub name: String,
    /// Items; an item may name another list
    #[serde(default, deserialize_with = "scalar_strings")]
    pub items: Vec<String>,
    /// Add to an earlier list instead of replacing it
    #[serde(default)]
    pub append: bool,
}

/// `macro:` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDecl {
    /// Macro name
    #[serde(rename = "macro")]
    pub name: String,
    /// Condition text
    pub condition: String,
    /// OR onto an earlier macro instead of replacing it
    #[serde(default)]
    pub append: bool,
}

/// `rule:` declaration. Everything but the name is optional so that a later
/// declaration can override single fields of an earlier rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleDecl {
    /// Rule name
    #[serde(rename = "rule")]
    pub name: String,
    /// Description
    #[serde(default)]
    pub desc: Option<String>,
    /// Condition text
    #[serde(default)]
    pub condition: Option<String>,
    /// Output template
    #[serde(default)]
    pub output: Option<String>,
    /// Severity
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Whether the rule is evaluated; defaults to true
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Selection tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Event source the rule applies to
    #[serde(default)]
    pub source: Option<String>,
    /// OR the condition onto an earlier rule and override its other fields
    #[serde(default)]
    pub append: bool,
}

impl RuleDecl {
    /// Rule declaration with a condition and defaults elsewhere
    pub fn new(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: Some(condition.into()),
            ..Default::default()
        }
    }

    /// Set the output template
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(tags.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Mark as appending
    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }
}

/// One list, macro or rule declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Named list
    List(ListDecl),
    /// Named macro
    Macro(MacroDecl),
    /// Rule
    Rule(RuleDecl),
}

impl Declaration {
    /// List declaration
    pub fn list(name: impl Into<String>, items: &[&str]) -> Self {
        Declaration::List(ListDecl {
            name: name.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
            append: false,
        })
    }

    /// Macro declaration
    pub fn macro_decl(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Declaration::Macro(MacroDecl {
            name: name.into(),
            condition: condition.into(),
            append: false,
        })
    }

    /// Kind of declaration
    pub fn kind(&self) -> DeclKind {
        match self {
            Declaration::List(_) => DeclKind::List,
            Declaration::Macro(_) => DeclKind::Macro,
            Declaration::Rule(_) => DeclKind::Rule,
        }
    }

    /// Declared name
    pub fn name(&self) -> &str {
        match self {
            Declaration::List(d) => &d.name,
            Declaration::Macro(d) => &d.name,
            Declaration::Rule(d) => &d.name,
        }
    }

}

impl From<RuleDecl> for Declaration {
    fn from(d: RuleDecl) -> Self {
        Declaration::Rule(d)
    }
}

/// Dotted engine version. Integer versions `N` read as `0.N.0`.
#[derive(Debug, Clone)]
pub struct EngineVersion(Vec<u64>);

impl EngineVersion {
    /// Parse `N` or `a.b.c`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.contains('.') {
            return text.parse::<u64>().ok().map(Self::from_legacy);
        }
        text.split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(EngineVersion)
    }

    /// Integer version from older rule files
    pub fn from_legacy(n: u64) -> Self {
        EngineVersion(vec![0, n, 0])
    }

    /// This engine's version
    pub fn current() -> Self {
        Self::parse(ENGINE_VERSION).unwrap_or_else(|| EngineVersion(vec![0]))
    }

    /// Fail unless this engine is at least `self`
    pub fn check(&self) -> Result<()> {
        if *self > Self::current() {
            return Err(RuleError::VersionMismatch {
                required: self.to_string(),
                current: ENGINE_VERSION.to_string(),
            });
        }
        Ok(())
    }
}

impl PartialEq for EngineVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EngineVersion {}

impl PartialOrd for EngineVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EngineVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // missing trailing components count as zero
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Parsed rule file
#[derive(Debug, Clone, Default)]
pub struct RuleFile {
    /// Declared minimum engine version, if any
    pub required_engine_version: Option<EngineVersion>,
    /// Declarations in file order
    pub declarations: Vec<Declaration>,
    /// Items that could not be read; the rest of the file is still usable
    pub errors: Vec<LoadError>,
}

fn yaml_key<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a serde_yaml::Value> {
    map.get(serde_yaml::Value::String(key.to_string()))
}

fn parse_version(value: &serde_yaml::Value) -> Result<EngineVersion> {
    let parsed = match value {
        serde_yaml::Value::Number(n) => n.as_u64().map(EngineVersion::from_legacy),
        serde_yaml::Value::String(s) => EngineVersion::parse(s),
        _ => None,
    };
    parsed.ok_or_else(|| RuleError::Yaml(format!("invalid required_engine_version: {value:?}")))
}

fn parse_item(kind: DeclKind, value: serde_yaml::Value) -> std::result::Result<Declaration, RuleError> {
    let decl = match kind {
        DeclKind::List => Declaration::List(serde_yaml::from_value(value)?),
        DeclKind::Macro => Declaration::Macro(serde_yaml::from_value(value)?),
        DeclKind::Rule => Declaration::Rule(serde_yaml::from_value(value)?),
    };
    Ok(decl)
}

/// Parse a rule file.
///
/// Fails as a whole if the YAML is not a sequence or the file requires a
/// newer engine; the version check happens before any declaration is
/// returned. A malformed individual item is recorded in
/// [`RuleFile::errors`] and skipped.
pub fn parse_rule_file(data: &[u8]) -> Result<RuleFile> {
    let doc: serde_yaml::Value = serde_yaml::from_slice(data)?;
    let items = match doc {
        serde_yaml::Value::Sequence(items) => items,
        serde_yaml::Value::Null => Vec::new(),
        _ => return Err(RuleError::Yaml("rule file must be a sequence of items".to_string())),
    };

    let mut file = RuleFile::default();
    let mut pending = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Some(map) = item.as_mapping() else {
            return Err(RuleError::Yaml(format!("item {index} is not a mapping")));
        };
        if let Some(v) = yaml_key(map, "required_engine_version") {
            let required = parse_version(v)?;
            required.check()?;
            file.required_engine_version = Some(required);
            continue;
        }
        let (kind, key) = if yaml_key(map, "list").is_some() {
            (DeclKind::List, "list")
        } else if yaml_key(map, "macro").is_some() {
            (DeclKind::Macro, "macro")
        } else if yaml_key(map, "rule").is_some() {
            (DeclKind::Rule, "rule")
        } else {
            return Err(RuleError::Yaml(format!(
                "item {index} is not a list, macro, rule or required_engine_version"
            )));
        };
        let name = yaml_key(map, key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        pending.push((kind, name, item));
    }

    for (kind, name, item) in pending {
        match parse_item(kind, item) {
            Ok(decl) => file.declarations.push(decl),
            Err(e) => file.errors.push(LoadError::new(kind, name, e)),
        }
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rule_file() {
        let yaml = r#"
- required_engine_version: 2
- list: shell_binaries
  items: [bash, sh, zsh]
- list: ports
  items: [22, 2222]
- macro: spawned_process
  condition: evt.type = execve and evt.dir = <
- rule: Shell spawned
  desc: A shell was spawned
  condition: spawned_process and proc.name in (shell_binaries)
  output: "shell (user=%user.name)"
  priority: WARNING
  tags: [shell]
- rule: Shell spawned
  enabled: false
"#;
        let file = parse_rule_file(yaml.as_bytes()).unwrap();
        assert!(file.errors.is_empty());
        assert_eq!(file.required_engine_version, Some(EngineVersion::from_legacy(2)));
        assert_eq!(file.declarations.len(), 5);

        assert_eq!(file.declarations[1], Declaration::list("ports", &["22", "2222"]));
        let Declaration::Rule(rule) = &file.declarations[3] else {
            panic!("expected rule");
        };
        assert_eq!(rule.priority, Some(Priority::Warning));
        assert_eq!(rule.tags.as_deref(), Some(&["shell".to_string()][..]));
        assert_eq!(rule.enabled, None);

        let Declaration::Rule(override_) = &file.declarations[4] else {
            panic!("expected rule");
        };
        assert_eq!(override_.condition, None);
        assert_eq!(override_.enabled, Some(false));
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let yaml = "- required_engine_version: 999\n- list: a\n  items: [x]\n";
        let err = parse_rule_file(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleError::VersionMismatch { ref required, .. } if required == "0.999.0"));

        let yaml = "- required_engine_version: \"99.0.0\"\n";
        assert!(matches!(
            parse_rule_file(yaml.as_bytes()),
            Err(RuleError::VersionMismatch { .. })
        ));

        let yaml = "- required_engine_version: \"0.0.1\"\n";
        assert!(parse_rule_file(yaml.as_bytes()).is_ok());
    }

    #[test]
    fn test_bad_item_is_isolated() {
        let yaml = r#"
- macro: broken
- list: fine
  items: [a]
- rule: bad priority
  condition: a = b
  priority: SEVERE
"#;
        let file = parse_rule_file(yaml.as_bytes()).unwrap();
        assert_eq!(file.declarations.len(), 1);
        assert_eq!(file.errors.len(), 2);
        assert_eq!(file.errors[0].kind, DeclKind::Macro);
        assert_eq!(file.errors[0].name, "broken");
        assert_eq!(file.errors[1].name, "bad priority");
    }

    #[test]
    fn test_not_a_sequence() {
        assert!(matches!(
            parse_rule_file(b"rule: x"),
            Err(RuleError::Yaml(_))
        ));
        assert!(parse_rule_file(b"").unwrap().declarations.is_empty());
    }

    #[test]
    fn test_engine_version_ordering() {
        let v = |s: &str| EngineVersion::parse(s).unwrap();
        assert!(v("0.26.0") > v("0.9.9"));
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("3"), EngineVersion::from_legacy(3));
        assert!(EngineVersion::parse("1.x").is_none());
        assert!(EngineVersion::current().check().is_ok());
    }

    #[test]
    fn test_integer_versions_up_to_current_load() {
        for n in [1, 8, 17, 26] {
            let yaml = format!("- required_engine_version: {n}\n");
            assert!(parse_rule_file(yaml.as_bytes()).is_ok(), "version {n}");
        }
        assert!(EngineVersion::parse("0.17.0").unwrap().check().is_ok());
        assert!(matches!(
            parse_rule_file(b"- required_engine_version: 27\n"),
            Err(RuleError::VersionMismatch { ref current, .. }) if current == ENGINE_VERSION
        ));
    }
}
