use crate::parser::ast::{Modifier, Visibility};
use crate::span::Span;
use serde::Serialize;
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the front-end and of the host configuration. The inference
/// engine and the validators never produce these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },
}

impl AnalysisError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    WeakWarning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::WeakWarning => write!(f, "weak warning"),
        }
    }
}

/// An edit the host may apply. The core only describes edits, it never
/// performs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixAction {
    ReplaceText { span: Span, text: String },
    /// With `strip_space_before`, the whitespace and `=` in front of the
    /// span go as well.
    RemoveText { span: Span, strip_space_before: bool },
    InsertText { offset: usize, text: String },
    /// `decl` is the span of the declaration owning the modifier list.
    AddModifier { decl: Span, modifier: Modifier },
    RemoveModifier { decl: Span, modifier: Modifier },
    ReplaceVisibility { decl: Span, visibility: Visibility },
    RemoveParameter { span: Span },
    ImplementMethods { class: String, methods: Vec<String> },
    CreateAccessor { class: String, field: String, getter: bool },
    SwitchMutability { decl: Span },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fix {
    pub label: String,
    pub action: FixAction,
}

impl Fix {
    pub fn new(label: impl Into<String>, action: FixAction) -> Self {
        Self { label: label.into(), action }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, span: Span) -> Self {
        Self { severity, message: message.into(), span, fixes: Vec::new() }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, message, span)
    }

    pub fn weak_warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::WeakWarning, message, span)
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fixes.push(fix);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Receiver for validator findings.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Render a front-end error with ariadne for terminal output.
pub fn render_error(source: &str, filename: &str, err: &AnalysisError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err {
        AnalysisError::Syntax { msg, span } => {
            let _ = Report::<(&str, Range<usize>)>::build(ReportKind::Error, filename, span.start)
                .with_message("syntax error")
                .with_label(Label::new((filename, span.start..span.end)).with_message(msg))
                .finish()
                .eprint((filename, Source::from(source)));
        }
        AnalysisError::Config { msg, path } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        AnalysisError::Io { msg, path } => {
            eprintln!("error[io]: {msg}");
            eprintln!("  --> {}", path.display());
        }
    }
}

/// Render a validator diagnostic with ariadne, listing its fixes as notes.
pub fn render_diagnostic(source: &str, filename: &str, diagnostic: &Diagnostic) {
    use ariadne::{Label, Report, ReportKind, Source};

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning | Severity::WeakWarning => ReportKind::Warning,
    };
    let span = diagnostic.span;
    let mut report = Report::<(&str, Range<usize>)>::build(kind, filename, span.start)
        .with_message(&diagnostic.message)
        .with_label(Label::new((filename, span.start..span.end)).with_message(&diagnostic.message));
    for fix in &diagnostic.fixes {
        report = report.with_note(format!("fix available: {}", fix.label));
    }
    let _ = report.finish().eprint((filename, Source::from(source)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_in_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.report(Diagnostic::error("first", Span::new(0, 1)));
        sink.report(Diagnostic::warning("second", Span::new(2, 3)));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].message, "first");
        assert!(sink[0].is_error());
        assert_eq!(sink[1].severity, Severity::Warning);
    }

    #[test]
    fn fixes_serialize_as_tagged_data() {
        let diag = Diagnostic::error("Must override", Span::new(4, 7)).with_fix(Fix::new(
            "Add override",
            FixAction::AddModifier { decl: Span::new(0, 20), modifier: Modifier::Override },
        ));
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["fixes"][0]["action"]["kind"], "add_modifier");
        assert_eq!(json["fixes"][0]["action"]["modifier"], "override");
    }

    #[test]
    fn empty_fix_list_is_omitted() {
        let diag = Diagnostic::weak_warning("static", Span::new(0, 1));
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json.get("fixes").is_none());
    }

    #[test]
    fn analysis_error_display() {
        let err = AnalysisError::syntax("expected ';'", Span::new(3, 4));
        assert_eq!(err.to_string(), "Syntax error: expected ';'");
    }
}
