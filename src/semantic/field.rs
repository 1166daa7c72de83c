use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::model::FieldHandle;
use crate::parser::ast::{Accessor, Expr, Modifier, StringLit};
use crate::span::Spanned;
use crate::typeck::{TagScope, TypeResolver};
use crate::visit::{Visitor, walk_expr};

use super::local::{TagInit, check_type_tag_init};

/// Property rules, final initialisation, the tag-vs-initializer check and
/// redefinition of superclass fields.
pub fn check_field<'p>(resolver: &mut TypeResolver<'p>, field: FieldHandle<'p>, sink: &mut dyn DiagnosticSink) {
    if field.is_property() {
        check_property(field, sink);
    } else if field.is_final() && field.init().is_none() {
        if field.is_static() {
            sink.report(Diagnostic::error(
                format!("Static final variable '{}' must be initialized", field.name()),
                field.span(),
            ));
        } else if !is_assigned_in_constructor(field) {
            sink.report(Diagnostic::error(
                format!("Final variable '{}' must be initialized in the constructor", field.name()),
                field.span(),
            ));
        }
    }

    if let (Some(tag), Some(init)) = (field.type_tag(), field.init()) {
        let class = field.containing_class();
        let bindings = resolver.from_scope_parents(Some(class), None);
        let evaluated = resolver.evaluate_expression(init, Some(class), &bindings);
        let init_type = resolver.rules().special_init_expression_type(field, &evaluated).unwrap_or(evaluated);
        let check = TagInit {
            span: field.span(),
            tag,
            init,
            init_type,
            scope: TagScope::for_class(class),
            resolver: &bindings,
            require_constant: false,
        };
        check_type_tag_init(resolver, &check, sink);
    }

    check_redefinition(field, sink);
}

fn check_redefinition(field: FieldHandle<'_>, sink: &mut dyn DiagnosticSink) {
    for parent in field.containing_class().superclass_chain() {
        let Some(inherited) = parent.field(field.name()) else {
            continue;
        };
        if inherited.is_static() {
            sink.report(Diagnostic::weak_warning(
                format!("Field '{}' hides a static field of a superclass", field.name()),
                field.name_span(),
            ));
        } else {
            sink.report(Diagnostic::error(
                format!(
                    "Redefinition of variable '{}' in subclass is not allowed. Previously declared at '{}'",
                    field.name(),
                    parent.name()
                ),
                field.span(),
            ));
        }
        return;
    }
}

fn check_property(field: FieldHandle<'_>, sink: &mut dyn DiagnosticSink) {
    let Some(accessors) = field.accessors() else {
        return;
    };
    if !accessors.getter.node.is_valid_getter() {
        sink.report(Diagnostic::error("Invalid getter accessor", accessors.getter.span));
    }
    if !accessors.setter.node.is_valid_setter() {
        sink.report(Diagnostic::error("Invalid setter accessor", accessors.setter.span));
    }

    if field.is_final() {
        sink.report(
            Diagnostic::error("Property can't be final", field.span())
                .with_fix(Fix::new("Switch final/var", FixAction::SwitchMutability { decl: field.span() })),
        );
    } else if let Some(init) = field.init().filter(|_| !field.is_real_var()) {
        sink.report(
            Diagnostic::error("This field cannot be initialized because it is not a real variable", init.span)
                .with_fix(Fix::new("Remove init", FixAction::RemoveText { span: init.span, strip_space_before: true }))
                .with_fix(Fix::new("Add @:isVar", FixAction::AddModifier { decl: field.span(), modifier: Modifier::IsVar }))
                .with_fix(Fix::new(
                    "Make setter null",
                    FixAction::ReplaceText { span: accessors.setter.span, text: "null".into() },
                )),
        );
    }

    check_accessor_methods(field, sink);
}

fn check_accessor_methods(field: FieldHandle<'_>, sink: &mut dyn DiagnosticSink) {
    let class = field.containing_class();
    let Some(accessors) = field.accessors().filter(|_| !class.is_interface()) else {
        return;
    };
    for (accessor, getter) in [(&accessors.getter, true), (&accessors.setter, false)] {
        let expected = if getter { Accessor::Get } else { Accessor::Set };
        if accessor.node != expected {
            continue;
        }
        let name = format!("{}_{}", if getter { "get" } else { "set" }, field.name());
        if class.find_methods_by_name(&name, true).is_none() {
            sink.report(Diagnostic::error(format!("Can't find method {name}"), accessor.span).with_fix(Fix::new(
                if getter { "Create getter" } else { "Create setter" },
                FixAction::CreateAccessor {
                    class: class.qualified_name().to_string(),
                    field: field.name().to_string(),
                    getter,
                },
            )));
        }
    }
}

/// Whether the class constructor assigns `field`.
pub fn is_assigned_in_constructor(field: FieldHandle<'_>) -> bool {
    field
        .containing_class()
        .constructor()
        .and_then(|c| c.body())
        .is_some_and(|body| assigns_field(body, field.name()))
}

/// Finds `this.<field> = …` or `<field> = …` anywhere in `body`.
pub fn assigns_field(body: &Spanned<Expr>, field: &str) -> bool {
    let mut scan = AssignmentScan { field, found: false };
    scan.visit_expr(body);
    scan.found
}

struct AssignmentScan<'a> {
    field: &'a str,
    found: bool,
}

impl Visitor for AssignmentScan<'_> {
    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if self.found {
            return;
        }
        if let Expr::Assign { target, .. } = &expr.node {
            let hit = match &target.node {
                Expr::Ident(name) => name == self.field,
                Expr::Field { object, field } => matches!(object.node, Expr::This) && field.node == self.field,
                _ => false,
            };
            if hit {
                self.found = true;
                return;
            }
        }
        walk_expr(self, expr);
    }

    fn visit_string(&mut self, _lit: &StringLit, _expr: &Spanned<Expr>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::model::Project;
    use crate::parser::{parse_expression, parse_module};

    fn run(src: &str, class: &str, field: &str) -> Vec<Diagnostic> {
        let p = Project::new(vec![parse_module(src, 0, None).unwrap()]);
        let mut r = TypeResolver::new(&p);
        let field = p.class_by_qualified_name(class).unwrap().field(field).unwrap();
        let mut sink: Vec<Diagnostic> = Vec::new();
        check_field(&mut r, field, &mut sink);
        sink
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn final_static_without_init() {
        let diags = run("class A { static final LIMIT:Int; }", "A", "LIMIT");
        assert_eq!(messages(&diags), vec!["Static final variable 'LIMIT' must be initialized"]);
    }

    #[test]
    fn final_assigned_in_constructor() {
        let src = "class A { final id:Int; final name:String; public function new() { this.id = 1; } }";
        assert!(run(src, "A", "id").is_empty());
        assert_eq!(
            messages(&run(src, "A", "name")),
            vec!["Final variable 'name' must be initialized in the constructor"]
        );
    }

    #[test]
    fn tag_against_initializer() {
        let diags = run("class A { var n:Int = 'hello'; }", "A", "n");
        assert_eq!(diags.len(), 1);
        insta::assert_snapshot!(&diags[0].message, @"Incompatible type Int can't be assigned from String");
    }

    #[test]
    fn enum_abstract_values_take_the_abstract_type() {
        let src = "enum abstract Level(Int) { var Low:Level = 1; }";
        assert!(run(src, "Level", "Low").is_empty());
    }

    #[test]
    fn property_accessor_rules() {
        let diags = run("class A { var x(get, wrong):Int; }", "A", "x");
        assert_eq!(messages(&diags), vec!["Invalid setter accessor", "Can't find method get_x"]);
        assert!(matches!(diags[1].fixes[0].action, FixAction::CreateAccessor { getter: true, .. }));
    }

    #[test]
    fn accessor_methods_may_be_inherited() {
        let src = "class Base { function get_x():Int { return 1; } }\nclass A extends Base { var x(get, never):Int; }";
        assert!(run(src, "A", "x").is_empty());
    }

    #[test]
    fn interface_properties_need_no_accessor_methods() {
        assert!(run("interface I { var x(get, set):Int; }", "I", "x").is_empty());
    }

    #[test]
    fn computed_property_cannot_be_initialized() {
        let src = "class A { var x(get, set):Int = 3; function get_x() { return 1; } function set_x(v) { return v; } }";
        let diags = run(src, "A", "x");
        assert_eq!(messages(&diags), vec!["This field cannot be initialized because it is not a real variable"]);
        let labels: Vec<&str> = diags[0].fixes.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Remove init", "Add @:isVar", "Make setter null"]);
        let is_var = "class A { @:isVar var x(get, set):Int = 3; function get_x() { return 1; } function set_x(v) { return v; } }";
        assert!(run(is_var, "A", "x").is_empty());
    }

    #[test]
    fn final_property() {
        let diags = run("class A { final x(default, null):Int = 1; }", "A", "x");
        assert_eq!(messages(&diags), vec!["Property can't be final"]);
    }

    #[test]
    fn redefinition_of_parent_fields() {
        let src = "class Base { var a:Int; static var s:Int; }\nclass Child extends Base { var a:Int; var s:Int; }";
        let diags = run(src, "Child", "a");
        assert_eq!(
            messages(&diags),
            vec!["Redefinition of variable 'a' in subclass is not allowed. Previously declared at 'Base'"]
        );
        let diags = run(src, "Child", "s");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::WeakWarning);
    }

    #[test]
    fn assignment_scan() {
        let body = parse_expression("{ if (ready) { count = 0; } }").unwrap();
        assert!(assigns_field(&body, "count"));
        let body = parse_expression("{ other.count = 0; trace('count = 1'); }").unwrap();
        assert!(!assigns_field(&body, "count"));
        let body = parse_expression("{ var f = function() { this.count = 2; }; }").unwrap();
        assert!(assigns_field(&body, "count"));
    }
}
