//! Script error type.

use crate::diagnostics::{Diagnostic, render_diagnostics};

/// A script fragment failed to lex or parse.
#[derive(Debug, thiserror::Error)]
#[error("invalid script {text:?}: {summary}")]
pub struct ScriptError {
    /// The fragment text that failed.
    pub text: String,
    /// First diagnostic message, for one-line display.
    pub summary: String,
    /// Every problem found, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ScriptError {
    /// Build from the fragment and its diagnostics.
    pub fn new(text: impl Into<String>, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by_key(|d| d.span.start);
        let summary = diagnostics
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        Self {
            text: text.into(),
            summary,
            diagnostics,
        }
    }

    /// Pretty-print every diagnostic against the fragment text.
    pub fn render(&self, filename: &str) -> String {
        render_diagnostics(&self.text, filename, &self.diagnostics)
    }
}
