use ax_script::{Diagnostic, ScriptError};

/// Alias for `Result<T, ExpressoError>`.
pub type ExpressoResult<T> = Result<T, ExpressoError>;

/// Errors raised while building variables or compiling script fragments.
///
/// Evaluating a compiled fragment never fails; runtime problems are logged
/// and produce default values.
#[derive(Debug, thiserror::Error)]
pub enum ExpressoError {
    /// The fragment did not lex or parse.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The fragment parsed but cannot be compiled.
    #[error("{message}")]
    Compile {
        /// What is wrong.
        message: String,
        /// Byte range in the fragment text.
        span: std::ops::Range<usize>,
    },

    /// A variable name is not of the form `Namespace.Variable`.
    #[error("invalid variable name \"{0}\" (expected Namespace.Variable)")]
    InvalidName(String),

    /// No namespace with this name exists.
    #[error("unknown namespace: \"{0}\"")]
    UnknownNamespace(String),

    /// A variable was declared twice.
    #[error("variable \"{0}\" is already declared")]
    DuplicateVariable(String),

    /// A declared default does not fit the variable's type.
    #[error("invalid default for \"{name}\": {value}")]
    InvalidDefault {
        /// Full variable name.
        name: String,
        /// The rejected value, as exported.
        value: String,
    },
}

impl ExpressoError {
    /// A compile error at `span`.
    pub fn compile(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        ExpressoError::Compile {
            message: message.into(),
            span,
        }
    }

    /// Diagnostics for rendering against the fragment text.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ExpressoError::Script(e) => e.diagnostics.clone(),
            ExpressoError::Compile { message, span } => {
                vec![Diagnostic::error(span.clone(), message.clone())]
            }
            other => vec![Diagnostic::error(0..0, other.to_string())],
        }
    }
}
