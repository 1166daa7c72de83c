use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::model::{ClassHandle, ClassId};
use crate::parser::ast::TypeTag;
use crate::span::Spanned;
use crate::typeck::TypeResolver;

use super::literal::check_type_name;
use super::method::{check_signature_compatibility, signature_differs};

/// Class-level rules: unique member names, the type name, heritage kinds and
/// completeness of implemented interfaces.
pub fn check_class<'p>(resolver: &mut TypeResolver<'p>, class: ClassHandle<'p>, sink: &mut dyn DiagnosticSink) {
    check_duplicate_members(class, sink);
    check_type_name(class.name(), class.name_span(), sink);
    check_implements(class, sink);
    check_extends(class, sink);
    if class.is_class() {
        for tag in &class.decl().implements {
            check_interface_methods(resolver, class, tag, sink);
        }
    }
}

fn check_duplicate_members(class: ClassHandle<'_>, sink: &mut dyn DiagnosticSink) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for member in class.members() {
        *counts.entry(member.name()).or_default() += 1;
    }
    for member in class.members().filter(|m| counts[m.name()] > 1) {
        sink.report(Diagnostic::error(
            format!("Duplicate class field declaration : {}", member.name()),
            member.name_span(),
        ));
    }
}

fn resolve_heritage<'p>(class: ClassHandle<'p>, tag: &Spanned<TypeTag>) -> Option<ClassHandle<'p>> {
    let TypeTag::Named { path, .. } = &tag.node else {
        return None;
    };
    let project = class.project();
    project.resolve_type_name(&path.node, Some(class.module_index())).map(|id: ClassId| project.class(id))
}

/// Every `implements` reference must resolve to an interface; unresolved
/// names are reported too.
fn check_implements(class: ClassHandle<'_>, sink: &mut dyn DiagnosticSink) {
    for tag in &class.decl().implements {
        if !resolve_heritage(class, tag).is_some_and(|target| target.is_interface()) {
            sink.report(Diagnostic::error("Not an interface", tag.span));
        }
    }
}

fn check_extends(class: ClassHandle<'_>, sink: &mut dyn DiagnosticSink) {
    for tag in &class.decl().extends {
        let Some(target) = resolve_heritage(class, tag) else {
            continue;
        };
        if target == class {
            sink.report(Diagnostic::error("Cannot extend self", tag.span));
            continue;
        }
        let message = if class.is_anonymous() {
            (!target.is_anonymous()).then_some("Not an anonymous type")
        } else if class.is_interface() {
            (!target.is_interface()).then_some("Not an interface")
        } else if class.is_class() {
            (!target.is_class()).then_some("Not a class")
        } else {
            None
        };
        if let Some(message) = message {
            sink.report(Diagnostic::error(message, tag.span));
        }
    }
}

/// Every non-static method of the referenced interface must be provided by
/// the class or one of its ancestors, with a matching signature.
pub fn check_interface_methods<'p>(
    resolver: &mut TypeResolver<'p>,
    class: ClassHandle<'p>,
    reference: &Spanned<TypeTag>,
    sink: &mut dyn DiagnosticSink,
) {
    let Some(interface) = resolve_heritage(class, reference).filter(|i| i.is_interface()) else {
        return;
    };
    let mut missing = Vec::new();
    for prototype in interface.methods().filter(|m| !m.is_static()) {
        let Some(found) = class.find_methods_by_name(prototype.name(), true) else {
            missing.push(prototype.name().to_string());
            continue;
        };
        if found.containing_class() == class {
            check_signature_compatibility(resolver, found, prototype, sink);
        } else if signature_differs(resolver, class, found, prototype) {
            sink.report(Diagnostic::error(
                format!(
                    "Method '{}' inherited from '{}' does not match interface method {}, found {}",
                    prototype.name(),
                    found.containing_class().qualified_name(),
                    prototype.presentable_text(),
                    found.presentable_text()
                ),
                reference.span,
            ));
        }
    }
    if !missing.is_empty() {
        sink.report(
            Diagnostic::error(format!("Not implemented methods: {}", missing.join(", ")), reference.span).with_fix(
                Fix::new(
                    "Implement methods",
                    FixAction::ImplementMethods { class: class.qualified_name().to_string(), methods: missing },
                ),
            ),
        );
    }
}
