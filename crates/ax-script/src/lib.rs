//! Lexer, parser, and diagnostics for expresso script fragments.
//!
//! Conditions are single boolean expressions; an empty condition is `true`.
//! Instructions are `;`-separated statements: assignments, `++`/`--`, and
//! calls evaluated for their side effects.

/// Syntax tree types.
pub mod ast;
/// Diagnostics and ariadne rendering.
pub mod diagnostics;
/// The script error type.
pub mod error;
/// Tokenizer.
pub mod lexer;
/// Token stream parser.
pub mod parser;

/// Re-exported syntax tree root types.
pub use ast::{Expr, Spanned, Stmt};
/// Re-exported diagnostic type.
pub use diagnostics::Diagnostic;
/// Re-exported error type.
pub use error::ScriptError;

/// Parse a condition fragment into a single expression.
pub fn parse_condition(source: &str) -> Result<Spanned<Expr>, ScriptError> {
    let (tokens, lex_errors) = lexer::lex(source);
    if !lex_errors.is_empty() {
        let diagnostics = lex_errors.into_iter().map(Diagnostic::from).collect();
        return Err(ScriptError::new(source, diagnostics));
    }

    if tokens.is_empty() {
        return Ok(Spanned::new(Expr::Literal(ast::Literal::Bool(true)), 0..0));
    }

    parser::parse_expression(&tokens).map_err(|errors| {
        ScriptError::new(source, errors.into_iter().map(Diagnostic::from).collect())
    })
}

/// Parse an instruction fragment into its statements.
pub fn parse_instruction(source: &str) -> Result<Vec<Spanned<Stmt>>, ScriptError> {
    let (tokens, lex_errors) = lexer::lex(source);
    if !lex_errors.is_empty() {
        let diagnostics = lex_errors.into_iter().map(Diagnostic::from).collect();
        return Err(ScriptError::new(source, diagnostics));
    }

    parser::parse_statements(&tokens).map_err(|errors| {
        ScriptError::new(source, errors.into_iter().map(Diagnostic::from).collect())
    })
}
