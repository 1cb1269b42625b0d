//! Expresso evaluation on top of `ax-core`: shadow-aware global variables,
//! compiled condition and instruction fragments keyed by hash, and a runtime
//! session that moves the database and the variables between shadow levels
//! together.

/// Fragment text to closures.
pub mod compiler;
/// Runtime configuration.
pub mod config;
/// Error types used throughout the crate.
pub mod error;
/// Fragment hashing.
pub mod fragment;
/// The runtime session.
pub mod runtime;
/// The script registry and the evaluation context.
pub mod scripts;
/// Global variables.
pub mod variables;

/// Re-export the compiler.
pub use compiler::Compiler;
/// Re-export configuration.
pub use config::RuntimeConfig;
/// Re-export error types.
pub use error::{ExpressoError, ExpressoResult};
/// Re-export fragment hashing.
pub use fragment::{EMPTY_FRAGMENT_HASH, ScriptFragment, fragment_hash};
/// Re-export the runtime session.
pub use runtime::Runtime;
/// Re-export the script registry types.
pub use scripts::{Condition, EvaluationContext, ExpressoScripts, Instruction, UserMethodsProvider};
/// Re-export variable types.
pub use variables::{GlobalVariables, GvName, VariableSet, VariableSnapshot};
