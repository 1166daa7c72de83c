use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::model::{ClassHandle, MethodHandle, ParamHandle};
use crate::parser::ast::{Modifier, TypeTag};
use crate::span::Span;
use crate::typeck::types::TypeResult;
use crate::typeck::{Declaration, EvaluationContext, GenericResolver, TagScope, TypeResolver};

use super::local::{TagInit, check_type_tag_init};

const OVERRIDE_FORBIDDEN: [Modifier; 4] = [Modifier::Final, Modifier::FinalMeta, Modifier::Inline, Modifier::Static];

/// Declaration-level method checks: required tags, parameter list and
/// overriding.
pub fn check_method<'p>(resolver: &mut TypeResolver<'p>, method: MethodHandle<'p>, sink: &mut dyn DiagnosticSink) {
    check_required_tags(method, sink);
    check_method_arguments(resolver, method, sink);
    check_override(resolver, method, sink);
}

/// Members of extern classes and interfaces must spell out their types.
pub fn check_required_tags(method: MethodHandle<'_>, sink: &mut dyn DiagnosticSink) {
    let class = method.containing_class();
    if !class.is_extern() && !class.is_interface() {
        return;
    }
    if method.return_tag().is_none() && !method.is_constructor() {
        sink.report(Diagnostic::error("Type required", method.name_span()));
    }
    for param in method.params() {
        if param.type_tag().is_none() {
            sink.report(Diagnostic::error("Type required", param.span()));
        }
    }
}

pub fn check_method_arguments(resolver: &mut TypeResolver<'_>, method: MethodHandle<'_>, sink: &mut dyn DiagnosticSink) {
    let class = method.containing_class();
    let bindings = resolver.from_scope_parents(Some(class), Some(method));
    let scope = TagScope::for_method(method);
    let mut has_optional = false;
    let mut seen: HashMap<&str, Span> = HashMap::new();

    for param in method.params() {
        if let (Some(marker), Some(_)) = (param.param().optional, param.default()) {
            sink.report(Diagnostic::warning("Optional not needed when specified an init value", marker));
        }
        if let (Some(tag), Some(default)) = (param.type_tag(), param.default()) {
            let init_type = resolver.evaluate_expression(default, Some(class), &bindings);
            let check = TagInit {
                span: param.span(),
                tag,
                init: default,
                init_type,
                scope,
                resolver: &bindings,
                require_constant: true,
            };
            check_type_tag_init(resolver, &check, sink);
        }
        if param.is_optional() {
            has_optional = true;
        } else if has_optional {
            sink.report(Diagnostic::warning("Non-optional argument after optional argument", param.span()));
        }
        match seen.get(param.name()) {
            Some(first) => {
                let message = format!("Repeated argument name '{}'", param.name());
                sink.report(Diagnostic::warning(message.clone(), param.name_span()));
                sink.report(Diagnostic::warning(message, *first));
            }
            None => {
                seen.insert(param.name(), param.name_span());
            }
        }
    }
}

/// Constructor and `__init__` modifiers, and the rules for redefining a
/// superclass method.
pub fn check_override<'p>(resolver: &mut TypeResolver<'p>, method: MethodHandle<'p>, sink: &mut dyn DiagnosticSink) {
    let class = method.containing_class();
    let parent = class
        .parent_class()
        .and_then(|p| p.find_methods_by_name(method.name(), true));
    let mut requires_override = false;

    if method.is_constructor() {
        if method.is_static() {
            sink.report(
                Diagnostic::error("Constructor can't be static", method.name_span()).with_fix(Fix::new(
                    "Remove static",
                    FixAction::RemoveModifier { decl: method.span(), modifier: Modifier::Static },
                )),
            );
        }
    } else if method.is_static_init() {
        if !method.is_static() {
            sink.report(
                Diagnostic::error("__init__ must be static", method.name_span()).with_fix(Fix::new(
                    "Add static",
                    FixAction::AddModifier { decl: method.span(), modifier: Modifier::Static },
                )),
            );
        }
    } else if let Some(parent) = parent {
        if parent.is_static() {
            sink.report(Diagnostic::warning(
                format!("Method '{}' overrides a static method of a superclass", method.name()),
                method.name_span(),
            ));
        } else {
            requires_override = true;
            check_overridable(method, parent, sink);
        }
    }

    if method.is_override() && !requires_override {
        let span = method.modifiers().span_of(Modifier::Override).unwrap_or(method.name_span());
        sink.report(Diagnostic::error("Overriding nothing", span).with_fix(Fix::new(
            "Remove override",
            FixAction::RemoveModifier { decl: method.span(), modifier: Modifier::Override },
        )));
    } else if requires_override {
        if !method.is_override() {
            sink.report(Diagnostic::error("Must override", method.name_span()).with_fix(Fix::new(
                "Add override",
                FixAction::AddModifier { decl: method.span(), modifier: Modifier::Override },
            )));
        } else if let Some(parent) = parent {
            check_signature_compatibility(resolver, method, parent, sink);
        }
    }
}

fn check_overridable(method: MethodHandle<'_>, parent: MethodHandle<'_>, sink: &mut dyn DiagnosticSink) {
    if parent.modifiers().has_any(&OVERRIDE_FORBIDDEN) {
        let mut diagnostic = Diagnostic::error("Can't override static, inline or final methods", method.name_span());
        for modifier in OVERRIDE_FORBIDDEN.into_iter().filter(|m| parent.has_modifier(*m)) {
            diagnostic = diagnostic.with_fix(Fix::new(
                format!("Remove {modifier} from {}", full_name(parent)),
                FixAction::RemoveModifier { decl: parent.span(), modifier },
            ));
        }
        sink.report(diagnostic);
    }

    let (current, inherited) = (method.visibility(), parent.visibility());
    if current < inherited {
        sink.report(
            Diagnostic::error(
                format!("Field {} has less visibility (public/private) than superclass one", method.name()),
                method.name_span(),
            )
            .with_fix(Fix::new(
                "Change current method visibility",
                FixAction::ReplaceVisibility { decl: method.span(), visibility: inherited },
            ))
            .with_fix(Fix::new(
                "Change parent method visibility",
                FixAction::ReplaceVisibility { decl: parent.span(), visibility: current },
            )),
        );
    }
}

/// Parameter and return types of a method as seen from `class`, with the
/// generic arguments `class` passes to the method's declaring type.
struct Signature<'p> {
    params: Vec<(ParamHandle<'p>, TypeResult)>,
    ret: TypeResult,
}

fn signature<'p>(resolver: &mut TypeResolver<'p>, class: ClassHandle<'p>, method: MethodHandle<'p>) -> Signature<'p> {
    let bindings = heritage_bindings(resolver, class, method.containing_class());
    let scope = TagScope::for_method(method);
    let params = method
        .params()
        .map(|p| (p, resolver.parameter_type(p, &scope, &bindings)))
        .collect();
    let ret = resolver.field_or_method_return_type(Declaration::Method(method), Some(&bindings));
    Signature { params, ret }
}

/// Bindings for `owner`'s generic parameters written in `class`'s
/// `extends` or `implements` clauses. Anything left unbound is `Dynamic`.
fn heritage_bindings<'p>(resolver: &TypeResolver<'p>, class: ClassHandle<'p>, owner: ClassHandle<'p>) -> GenericResolver {
    if class == owner {
        return GenericResolver::new();
    }
    let mut bindings = if owner.is_interface() {
        let mut bindings = GenericResolver::new();
        let project = class.project();
        let reference = class.decl().implements.iter().find_map(|tag| match &tag.node {
            TypeTag::Named { path, args } => project
                .resolve_type_name(&path.node, Some(class.module_index()))
                .filter(|id| *id == owner.id())
                .map(|_| args),
            _ => None,
        });
        if let Some(args) = reference {
            let scope = TagScope::for_class(class);
            for (param, arg) in owner.generic_params().iter().zip(args) {
                bindings.add(param.name.node.clone(), resolver.resolve_type_tag(arg, &scope, &GenericResolver::new()));
            }
        }
        bindings
    } else {
        resolver.inherited_resolver(class, owner, GenericResolver::new())
    };
    for param in owner.generic_params() {
        if bindings.resolve(&param.name.node).is_none() {
            bindings.add(param.name.node.clone(), TypeResult::dynamic());
        }
    }
    bindings
}

/// `current` redefines `parent` (an overridden or implemented method): the
/// parameter lists must line up and the return types must agree.
pub fn check_signature_compatibility<'p>(
    resolver: &mut TypeResolver<'p>,
    current: MethodHandle<'p>,
    parent: MethodHandle<'p>,
    sink: &mut dyn DiagnosticSink,
) {
    let class = current.containing_class();
    let mine = signature(resolver, class, current);
    let theirs = signature(resolver, class, parent);
    let shared = mine.params.len().min(theirs.params.len());

    let surplus = &mine.params[shared..];
    if surplus.iter().any(|(param, _)| !param.is_optional()) || mine.params.len() < theirs.params.len() {
        let mut diagnostic = Diagnostic::error(
            format!(
                "Not matching arity expected {} arguments but found {}",
                theirs.params.len(),
                mine.params.len()
            ),
            current.name_span(),
        );
        for (param, _) in surplus {
            diagnostic = diagnostic.with_fix(remove_argument(*param));
        }
        sink.report(diagnostic);
    } else {
        // Only optional extras left: flag them one by one.
        for (param, _) in surplus {
            sink.report(Diagnostic::error("Unexpected argument", param.span()).with_fix(remove_argument(*param)));
        }
    }

    let implements = parent.containing_class().is_interface();
    for ((param, ty), (parent_param, parent_ty)) in mine.params.iter().zip(&theirs.params) {
        if !ty.can_assign(parent_ty) {
            let mut diagnostic =
                Diagnostic::error(format!("Type {ty} is not compatible with {parent_ty}"), param.span());
            if let Some(tag) = param.type_tag() {
                let text = match parent_param.type_tag() {
                    Some(parent_tag) => parent_tag.node.to_string(),
                    None => parent_ty.to_string(),
                };
                diagnostic = diagnostic.with_fix(Fix::new("Change type", FixAction::ReplaceText { span: tag.span, text }));
            }
            sink.report(diagnostic);
        }
        if param.has_optional_marker() != parent_param.has_optional_marker() {
            sink.report(optionality_mismatch(*param, *parent_param, parent, implements));
        }
    }

    if !mine.ret.can_assign(&theirs.ret) {
        let span = current.return_tag().map(|t| t.span).unwrap_or(current.name_span());
        sink.report(Diagnostic::error(
            format!("Not compatible return type {} != {}", mine.ret, theirs.ret),
            span,
        ));
    }
}

fn remove_argument(param: ParamHandle<'_>) -> Fix {
    Fix::new("Remove argument", FixAction::RemoveParameter { span: param.span() })
}

fn optionality_mismatch(param: ParamHandle<'_>, parent_param: ParamHandle<'_>, parent: MethodHandle<'_>, implements: bool) -> Diagnostic {
    let remove = param.has_optional_marker();
    let relation = if implements { "implemented" } else { "overridden" };
    let state = if remove { "required" } else { "optional" };
    let message = format!(
        "Parameter '{}' is {state} in the {relation} method {}",
        parent_param.presentable_text(),
        full_name(parent)
    );
    let fix = match param.param().optional {
        Some(marker) if remove => Fix::new(
            "Remove optional marker",
            FixAction::RemoveText { span: marker, strip_space_before: false },
        ),
        _ => Fix::new("Make parameter optional", FixAction::InsertText { offset: param.span().start, text: "?".into() }),
    };
    Diagnostic::error(message, param.span()).with_fix(fix)
}

/// Cheap comparison used when the implementing method is inherited: arity,
/// parameter types and optionality, then the return type.
pub fn signature_differs<'p>(
    resolver: &mut TypeResolver<'p>,
    class: ClassHandle<'p>,
    source: MethodHandle<'p>,
    prototype: MethodHandle<'p>,
) -> bool {
    if source.param_count() != prototype.param_count() {
        return true;
    }
    let source = signature(resolver, class, source);
    let prototype = signature(resolver, class, prototype);
    let params_differ = source
        .params
        .iter()
        .zip(&prototype.params)
        .any(|((sp, st), (pp, pt))| !st.can_assign(pt) || sp.is_optional() != pp.is_optional());
    params_differ || !source.ret.can_assign(&prototype.ret)
}

/// Evaluate a method body with every in-scope generic parameter bound to
/// its constraint. `None` for methods without a body.
pub(crate) fn evaluate_body<'p>(resolver: &mut TypeResolver<'p>, method: MethodHandle<'p>) -> Option<EvaluationContext<'p>> {
    let bindings = resolver.from_scope_parents(Some(method.containing_class()), Some(method));
    resolver.evaluate_method_body(method, &bindings)
}

/// Evaluate the body and forward its return-type diagnostics.
pub fn check_method_body<'p>(resolver: &mut TypeResolver<'p>, method: MethodHandle<'p>, sink: &mut dyn DiagnosticSink) {
    if let Some(mut ctx) = evaluate_body(resolver, method) {
        for diagnostic in ctx.take_diagnostics() {
            sink.report(diagnostic);
        }
    }
}

fn full_name(method: MethodHandle<'_>) -> String {
    format!("{}.{}", method.containing_class().name(), method.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::model::Project;
    use crate::parser::parse_module;

    fn project(src: &str) -> Project {
        Project::new(vec![parse_module(src, 0, None).unwrap()])
    }

    fn run(src: &str, class: &str, method: &str) -> Vec<Diagnostic> {
        let p = project(src);
        let mut r = TypeResolver::new(&p);
        let method = p.class_by_qualified_name(class).unwrap().method(method).unwrap();
        let mut sink: Vec<Diagnostic> = Vec::new();
        check_method(&mut r, method, &mut sink);
        sink
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn interface_members_need_tags() {
        let diags = run("interface I { function run(a, b:Int); }", "I", "run");
        assert_eq!(messages(&diags), vec!["Type required", "Type required"]);
    }

    #[test]
    fn extern_constructor_needs_no_return_tag() {
        let diags = run("extern class E { function new(x:Int); }", "E", "new");
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn argument_list_warnings() {
        let diags = run("class A { function f(?a:Int = 1, b:Int, a:String) {} }", "A", "f");
        insta::assert_debug_snapshot!(messages(&diags), @r#"
        [
            "Optional not needed when specified an init value",
            "Non-optional argument after optional argument",
            "Non-optional argument after optional argument",
            "Repeated argument name 'a'",
            "Repeated argument name 'a'",
        ]
        "#);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn default_value_checked_against_tag() {
        let diags = run("class A { function f(x:Int = 'no') {} }", "A", "f");
        assert_eq!(messages(&diags), vec!["Incompatible type Int can't be assigned from String"]);
    }

    #[test]
    fn missing_override_marker() {
        let src = "class Base { public function run():Void {} }\nclass Child extends Base { public function run():Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Must override"]);
        assert_eq!(diags[0].fixes.len(), 1);
        assert_eq!(diags[0].fixes[0].label, "Add override");
        assert!(matches!(
            diags[0].fixes[0].action,
            FixAction::AddModifier { modifier: Modifier::Override, .. }
        ));
    }

    #[test]
    fn overriding_nothing() {
        let diags = run("class A { override function run() {} }", "A", "run");
        assert_eq!(messages(&diags), vec!["Overriding nothing"]);
    }

    #[test]
    fn constructor_and_static_init_modifiers() {
        assert_eq!(messages(&run("class A { static function new() {} }", "A", "new")), vec!["Constructor can't be static"]);
        assert_eq!(messages(&run("class A { function __init__() {} }", "A", "__init__")), vec!["__init__ must be static"]);
        assert!(run("class A { static function __init__() {} }", "A", "__init__").is_empty());
    }

    #[test]
    fn static_parent_method_is_a_warning() {
        let src = "class Base { static function make() {} }\nclass Child extends Base { function make() {} }";
        let diags = run(src, "Child", "make");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].message, "Method 'make' overrides a static method of a superclass");
    }

    #[test]
    fn final_and_inline_parents_cannot_be_overridden() {
        let src = "class Base { public inline final function run():Void {} }\nclass Child extends Base { override public function run():Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Can't override static, inline or final methods"]);
        let labels: Vec<&str> = diags[0].fixes.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Remove final from Base.run", "Remove inline from Base.run"]);
    }

    #[test]
    fn lower_visibility_offers_both_fixes() {
        let src = "class Base { public function run():Void {} }\nclass Child extends Base { override function run():Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Field run has less visibility (public/private) than superclass one"]);
        assert_eq!(diags[0].fixes.len(), 2);
    }

    #[test]
    fn arity_mismatch_reported_once() {
        let src = "class Base { public function run(a:Int, b:Int):Void {} }\nclass Child extends Base { override public function run(a:Int):Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Not matching arity expected 2 arguments but found 1"]);
    }

    #[test]
    fn extra_required_argument_is_an_arity_mismatch() {
        let src = "class Base { public function run(a:Int):Void {} }\nclass Child extends Base { override public function run(a:Int, b:Int):Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Not matching arity expected 1 arguments but found 2"]);
        assert_eq!(diags[0].fixes.len(), 1);
        assert_eq!(diags[0].fixes[0].label, "Remove argument");
    }

    #[test]
    fn extra_optional_arguments_are_unexpected() {
        let src = "class Base { public function run(a:Int):Void {} }\nclass Child extends Base { override public function run(a:Int, ?b:Int, ?c:Int):Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Unexpected argument", "Unexpected argument"]);
        assert_eq!(diags[0].fixes[0].label, "Remove argument");
    }

    #[test]
    fn parameter_and_return_types_are_compared() {
        let src = "class Base { public function run(a:Int):Int { return 0; } }\nclass Child extends Base { override public function run(a:String):String { return ''; } }";
        let diags = run(src, "Child", "run");
        assert_eq!(
            messages(&diags),
            vec!["Type String is not compatible with Int", "Not compatible return type String != Int"]
        );
        match &diags[0].fixes[0].action {
            FixAction::ReplaceText { text, .. } => assert_eq!(text, "Int"),
            other => panic!("unexpected fix {other:?}"),
        }
    }

    #[test]
    fn optionality_must_match() {
        let src = "class Base { public function run(?a:Int):Void {} }\nclass Child extends Base { override public function run(a:Int):Void {} }";
        let diags = run(src, "Child", "run");
        assert_eq!(messages(&diags), vec!["Parameter '?a:Int' is optional in the overridden method Base.run"]);
        assert_eq!(diags[0].fixes[0].label, "Make parameter optional");
    }

    #[test]
    fn generic_parents_are_bound_through_extends() {
        let src = "class Base<T> { public function put(value:T):Void {} }\nclass IntBase extends Base<Int> { override public function put(value:Int):Void {} }";
        assert!(run(src, "IntBase", "put").is_empty());
        let bad = "class Base<T> { public function put(value:T):Void {} }\nclass IntBase extends Base<Int> { override public function put(value:String):Void {} }";
        assert_eq!(messages(&run(bad, "IntBase", "put")), vec!["Type String is not compatible with Int"]);
    }

    #[test]
    fn signature_difference_predicate() {
        let p = project(
            "interface I { function run(a:Int):Void; }\nclass Same { public function run(a:Int):Void {} }\nclass Other { public function run(a:Int, b:Int):Void {} }",
        );
        let mut r = TypeResolver::new(&p);
        let proto = p.class_by_qualified_name("I").unwrap().method("run").unwrap();
        let same = p.class_by_qualified_name("Same").unwrap();
        let other = p.class_by_qualified_name("Other").unwrap();
        assert!(!signature_differs(&mut r, same, same.method("run").unwrap(), proto));
        assert!(signature_differs(&mut r, other, other.method("run").unwrap(), proto));
    }

    #[test]
    fn body_check_reports_bad_returns() {
        let p = project("class A { function f():Int { return 'x'; } }");
        let mut r = TypeResolver::new(&p);
        let mut sink: Vec<Diagnostic> = Vec::new();
        check_method_body(&mut r, p.class_by_qualified_name("A").unwrap().method("f").unwrap(), &mut sink);
        assert_eq!(messages(&sink), vec!["Can't return String, expected Int"]);
    }

    #[test]
    fn checks_are_idempotent() {
        let p = project("class Base { public function run(a:Int):Void {} }\nclass Child extends Base { function run(a:String, b) {} }");
        let mut r = TypeResolver::new(&p);
        let method = p.class_by_qualified_name("Child").unwrap().method("run").unwrap();
        let mut first: Vec<Diagnostic> = Vec::new();
        let mut second: Vec<Diagnostic> = Vec::new();
        check_method(&mut r, method, &mut first);
        check_method(&mut r, method, &mut second);
        assert_eq!(first, second);
        assert_eq!(r.guard_depth(), 0);
    }
}
