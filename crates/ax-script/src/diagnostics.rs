use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt;

use crate::lexer::LexError;
use crate::parser::ParseError;

/// A compile error with its source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Byte range in the fragment text.
    pub span: std::ops::Range<usize>,
    /// Headline message.
    pub message: String,
    /// Optional text attached to the highlighted span.
    pub label: Option<String>,
}

impl Diagnostic {
    /// An error at `span`.
    pub fn error(span: std::ops::Range<usize>, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            label: None,
        }
    }

    /// Attach a label to the highlighted span.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<LexError> for Diagnostic {
    fn from(e: LexError) -> Self {
        Diagnostic::error(e.span, e.message)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Diagnostic::error(e.span, e.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

/// Render diagnostics using ariadne for pretty terminal output.
pub fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        // Clamp so an end-of-input span on a fragment still renders.
        let end = diag.span.end.min(source.len());
        let start = diag.span.start.min(end);
        let span = (filename, start..end);
        let label_text = diag.label.as_deref().unwrap_or(&diag.message);

        Report::build(ReportKind::Error, span.clone())
            .with_message(&diag.message)
            .with_label(Label::new(span).with_message(label_text).with_color(Color::Red))
            .finish()
            .write((filename, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::error(0..5, "unknown function: \"getPorp\"");
        assert_eq!(d.to_string(), "error: unknown function: \"getPorp\"");
        assert_eq!(
            d.with_label("did you mean getProp?").label.as_deref(),
            Some("did you mean getProp?")
        );
    }

    #[test]
    fn render_produces_output() {
        let source = "GameState.gold >= getPorp(self, \"Value\")";
        let diags = vec![
            Diagnostic::error(18..25, "unknown function").with_label("did you mean getProp?"),
        ];
        let output = render_diagnostics(source, "condition", &diags);
        assert!(!output.is_empty());
        assert!(output.contains("unknown function"));
    }

    #[test]
    fn render_tolerates_span_past_end() {
        let diags = vec![Diagnostic::error(3..9, "unexpected end of input")];
        let output = render_diagnostics("a ==", "condition", &diags);
        assert!(output.contains("unexpected end of input"));
    }
}
