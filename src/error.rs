//! Error types for the rule engine
use std::fmt::{self, Display};
use thiserror::Error;

use crate::parser::SyntaxError;

/// Kind of named declaration an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// A named list of literal values
    List,
    /// A named reusable condition
    Macro,
    /// A detection rule
    Rule,
}

impl Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKind::List => "list",
            DeclKind::Macro => "macro",
            DeclKind::Rule => "rule",
        };
        f.write_str(s)
    }
}

/// Main error type for load and compile operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Malformed condition text
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A macro or list name could not be resolved
    #[error("undefined {kind} reference '{name}'")]
    UndefinedReference {
        /// What the name was expected to denote
        kind: DeclKind,
        /// The unresolved name
        name: String,
    },

    /// Self-referential macro or list graph
    #[error("cyclic {kind} reference: {}", cycle.join(" -> "))]
    CyclicReference {
        /// Kind of the declarations forming the cycle
        kind: DeclKind,
        /// Names along the cycle; the first name is repeated at the end
        cycle: Vec<String>,
    },

    /// Reference chain or condition tree deeper than the resolver accepts
    #[error("{kind} '{name}' nests deeper than {limit} levels")]
    NestingTooDeep {
        /// Kind of the declaration being resolved
        kind: DeclKind,
        /// Name at which the limit was hit
        name: String,
        /// The limit
        limit: usize,
    },

    /// Condition that would expand to too many comparisons
    #[error("condition expands to more than {limit} comparisons")]
    ExpansionTooLarge {
        /// The limit
        limit: usize,
    },

    /// Rule file needs a newer engine
    #[error("rules require engine version {required}, this engine is {current}")]
    VersionMismatch {
        /// Version declared by the rule file
        required: String,
        /// Version of this engine
        current: String,
    },

    /// Operand shape does not fit the operator
    #[error("operator '{operator}' on field '{field}': {message}")]
    TypeMismatch {
        /// Field on the left-hand side
        field: String,
        /// Operator keyword
        operator: String,
        /// What was wrong
        message: String,
    },

    /// Literal that can never be compared meaningfully
    #[error("invalid literal '{value}': {message}")]
    InvalidLiteral {
        /// Literal text
        value: String,
        /// What was wrong
        message: String,
    },

    /// `append: true` on a name that was never declared
    #[error("{kind} '{name}' has append set but no earlier {kind} by that name exists")]
    AppendWithoutBase {
        /// Kind of the appending declaration
        kind: DeclKind,
        /// Name being appended to
        name: String,
    },

    /// Rule declaration without a condition and nothing to override
    #[error("rule '{name}' has no condition")]
    MissingCondition {
        /// Rule name
        name: String,
    },

    /// Rule file could not be deserialized
    #[error("YAML parse error: {0}")]
    Yaml(String),

    /// Rule file could not be read
    #[error("IO error: {0}")]
    Io(String),
}

impl From<serde_yaml::Error> for RuleError {
    fn from(e: serde_yaml::Error) -> Self {
        RuleError::Yaml(e.to_string())
    }
}

impl From<std::io::Error> for RuleError {
    fn from(e: std::io::Error) -> Self {
        RuleError::Io(e.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// A single load-phase failure, naming the declaration it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    /// Kind of the failing declaration
    pub kind: DeclKind,
    /// Name of the failing declaration
    pub name: String,
    /// The specific error encountered
    pub error: RuleError,
}

impl LoadError {
    /// Create a new load error
    pub fn new(kind: DeclKind, name: impl Into<String>, error: RuleError) -> Self {
        Self {
            kind,
            name: name.into(),
            error,
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.name, self.error)
    }
}

impl std::error::Error for LoadError {}

/// Collection of load-phase failures, in the order they were found
#[derive(Error, Debug, Clone, Default, PartialEq)]
pub struct LoadErrors {
    /// Individual failures
    pub errors: Vec<LoadError>,
}

impl LoadErrors {
    /// Whether no failure was recorded
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded failures
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Record a failure
    pub fn push(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    /// Failures recorded for one declaration
    pub fn for_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LoadError> + 'a {
        self.errors.iter().filter(move |e| e.name == name)
    }
}

impl Display for LoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load {} declarations", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "\n  [{}] {}", i + 1, err)?;
        }
        Ok(())
    }
}
