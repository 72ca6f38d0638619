//! Rule engine for runtime security detection over system events
//!
//! Rules are written in a small condition language over event fields
//! (`proc.name in (shell_binaries) and not user.name = root`), with named
//! lists and macros that may reference each other. The engine resolves all
//! references up front, then evaluates the compiled conditions against each
//! event through a caller-supplied [`FieldAccessor`].
//!
//! # Example
//!
//! ```
//! use sysrules::{parse_rule_file, JsonAccessor, RuleRegistry};
//! use serde_json::json;
//!
//! # fn example() -> anyhow::Result<()> {
//! let file = parse_rule_file(br#"
//! - list: shell_binaries
//!   items: [bash, sh, zsh]
//! - macro: spawned_process
//!   condition: evt.type = execve
//! - rule: Shell spawned
//!   desc: A shell was started
//!   condition: spawned_process and proc.name in (shell_binaries)
//!   output: "Shell spawned (user=%user.name shell=%proc.name)"
//!   priority: WARNING
//! "#)?;
//!
//! let (registry, errors) = RuleRegistry::load(file.declarations);
//! assert!(errors.is_empty());
//!
//! let event = json!({"evt.type": "execve", "proc.name": "bash", "user": {"name": "root"}});
//! let alerts = registry.evaluate_all(&JsonAccessor, &event);
//! assert_eq!(alerts[0].output, "Shell spawned (user=root shell=bash)");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Re-export commonly used items
pub use compiler::{CompiledRule, Compiler};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{DeclKind, LoadError, LoadErrors, Result, RuleError};
pub use event::{Field, FieldAccessor, JsonAccessor, Value};
pub use output::{format_output, OutputTemplate};
pub use registry::{Alert, RuleFilter, RuleRegistry, SharedRegistry};
pub use rule::{parse_rule_file, Declaration, Priority, Tags};

/// Error types
pub mod error;

/// Lexical analysis
pub mod lexer;

/// Parser implementation
pub mod parser;

/// Condition syntax trees
pub mod ast;

/// Operators and matching primitives
pub mod pattern;

/// Event values and field access
pub mod event;

/// Lists, macros and reference resolution
pub mod symbols;

/// Condition and rule compilation
pub mod compiler;

/// Condition evaluation
pub mod eval;

/// Output templates
pub mod output;

/// Rule file declarations
pub mod rule;

/// Compiled rule registry
pub mod registry;

/// Engine configuration
pub mod config;

/// Loading and dispatch
pub mod engine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber with default settings
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
