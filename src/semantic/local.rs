use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::model::{ClassHandle, MethodHandle};
use crate::parser::ast::{Expr, LocalVar, TypeTag};
use crate::span::{Span, Spanned};
use crate::typeck::types::TypeResult;
use crate::typeck::{GenericResolver, TagScope, TypeResolver};

/// A declared tag next to an initializer: a field, a local or a parameter
/// default value.
#[derive(Debug, Clone)]
pub struct TagInit<'a> {
    /// Where a mismatch is reported.
    pub span: Span,
    pub tag: &'a Spanned<TypeTag>,
    pub init: &'a Spanned<Expr>,
    /// The initializer's evaluated type.
    pub init_type: TypeResult,
    pub scope: TagScope<'a>,
    pub resolver: &'a GenericResolver,
    /// Default values must fold to a constant.
    pub require_constant: bool,
}

/// The declared tag must accept the initializer, and a default value must
/// be a constant.
pub fn check_type_tag_init(resolver: &TypeResolver<'_>, check: &TagInit<'_>, sink: &mut dyn DiagnosticSink) {
    let declared = resolver.resolve_type_tag(check.tag, &check.scope, check.resolver);
    let init = &check.init_type;
    if !declared.can_assign(init) {
        sink.report(
            Diagnostic::error(format!("Incompatible type {} can't be assigned from {}", declared.ty, init.ty), check.span)
                .with_fix(Fix::new(
                    "Change type",
                    FixAction::ReplaceText { span: check.tag.span, text: init.ty.to_string() },
                ))
                .with_fix(Fix::new(
                    "Remove init",
                    FixAction::RemoveText { span: check.init.span, strip_space_before: true },
                )),
        );
    } else if check.require_constant && init.constant.is_none() {
        sink.report(Diagnostic::error(
            format!("Parameter default type should be constant but was {}", init.ty),
            check.span,
        ));
    }
}

/// A typed local with an initializer gets the tag-vs-initializer check.
/// `span` is the declaration's span. `init_type` is the initializer's type
/// when the enclosing body was already evaluated; otherwise the initializer
/// is evaluated on its own.
pub fn check_local_var<'a>(
    resolver: &mut TypeResolver<'_>,
    local: &'a LocalVar,
    span: Span,
    class: Option<ClassHandle<'a>>,
    method: Option<MethodHandle<'a>>,
    init_type: Option<TypeResult>,
    sink: &mut dyn DiagnosticSink,
) {
    let (Some(tag), Some(init)) = (&local.type_tag, &local.init) else {
        return;
    };
    let bindings = resolver.from_scope_parents(class, method);
    let init_type = match init_type {
        Some(ty) => ty,
        None => resolver.evaluate_expression(init, class, &bindings),
    };
    let scope = match (method, class) {
        (Some(method), _) => TagScope::for_method(method),
        (None, Some(class)) => TagScope::for_class(class),
        (None, None) => TagScope::default(),
    };
    let check = TagInit {
        span,
        tag,
        init,
        init_type,
        scope,
        resolver: &bindings,
        require_constant: false,
    };
    check_type_tag_init(resolver, &check, sink);
}
