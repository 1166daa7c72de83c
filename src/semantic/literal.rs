use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::parser::ast::{Quote, StringLit, TypeTag};
use crate::span::{Span, Spanned};

/// Interpolation only happens inside single quotes.
pub fn check_string_literal(lit: &StringLit, span: Span, sink: &mut dyn DiagnosticSink) {
    if lit.quote == Quote::Double && lit.has_interpolation() {
        sink.report(Diagnostic::warning(
            "Expressions that contains string interpolation should be wrapped with single quotes",
            span,
        ));
    }
}

/// Type names start with an upper-case letter.
pub fn check_type_name(name: &str, span: Span, sink: &mut dyn DiagnosticSink) {
    let mut chars = name.chars();
    let Some(first) = chars.next().filter(|c| c.is_lowercase()) else {
        return;
    };
    let fixed: String = first.to_uppercase().chain(chars).collect();
    sink.report(
        Diagnostic::error("Type name must start by upper case", span)
            .with_fix(Fix::new("Change name", FixAction::ReplaceText { span, text: fixed })),
    );
}

/// The last segment of a named reference is the type; the segments before it
/// are the package.
pub fn check_type_reference(tag: &Spanned<TypeTag>, sink: &mut dyn DiagnosticSink) {
    let TypeTag::Named { path, .. } = &tag.node else {
        return;
    };
    let name = path.node.rsplit('.').next().unwrap_or(&path.node);
    let span = Span::with_file(path.span.end.saturating_sub(name.len()), path.span.end, path.span.file_id);
    check_type_name(name, span, sink);
}
