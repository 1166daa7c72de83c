//! End-to-end checks of the analyzer's documented guarantees.

mod common;

use common::{check, messages, project, project_of};
use hxsema::diagnostics::{FixAction, Severity};
use hxsema::parser::ast::Modifier;
use hxsema::semantic::ValidationOptions;
use hxsema::typeck::types::{Type, TypeResult, can_assign};
use hxsema::typeck::{Declaration, GenericResolver, TypeResolver};

#[test]
fn dynamic_and_unknown_accept_everything() {
    let p = project("class Base {}");
    let base = p.class_by_qualified_name("Base").unwrap().instance_type();
    for ty in [Type::int(), Type::string(), Type::Void, base, Type::named("T")] {
        assert!(can_assign(&Type::Dynamic, &ty));
        assert!(can_assign(&ty, &Type::Dynamic));
        assert!(can_assign(&Type::Unknown, &ty));
        assert!(can_assign(&Type::Invalid, &ty));
    }
}

#[test]
fn subclasses_assign_one_way() {
    let p = project("class Base {}\nclass Child extends Base {}\nclass Grandchild extends Child {}");
    let ty = |name: &str| p.class_by_qualified_name(name).unwrap().instance_type();
    assert!(can_assign(&ty("Base"), &ty("Child")));
    assert!(can_assign(&ty("Base"), &ty("Grandchild")));
    assert!(!can_assign(&ty("Child"), &ty("Base")));
    assert!(!can_assign(&ty("Grandchild"), &ty("Base")));
}

#[test]
fn self_initialized_field_is_dynamic() {
    let p = project("class Main { var x = x; }");
    let mut r = TypeResolver::new(&p);
    let field = p.class_by_qualified_name("Main").unwrap().field("x").unwrap();
    assert_eq!(r.field_type(field).ty, Type::Dynamic);
    assert_eq!(r.guard_depth(), 0);
}

#[test]
fn generic_field_follows_binding() {
    let p = project("class Box<T> { public var value:T; }");
    let mut r = TypeResolver::new(&p);
    let field = p.class_by_qualified_name("Box").unwrap().field("value").unwrap();
    let bindings = GenericResolver::new().with("T", TypeResult::new(Type::int()));
    let result = r.field_or_method_return_type(Declaration::Field(field), Some(&bindings));
    assert_eq!(result.ty, Type::int());
}

#[test]
fn generic_field_through_member_access() {
    let p = project(
        "class Box<T> { public var value:T; public function new(v:T) { value = v; } }\n\
         class Main { static function f() { var b:Box<Int> = null; return b.value; } }",
    );
    let mut r = TypeResolver::new(&p);
    let f = p.class_by_qualified_name("Main").unwrap().method("f").unwrap();
    assert_eq!(r.field_or_method_return_type(Declaration::Method(f), None).ty, Type::int());
}

#[test]
fn typed_local_mismatch_is_reported_once() {
    let diags = check("class Main { function f() { var n:Int = \"hello\"; } }");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("Int"));
    assert!(diags[0].message.contains("String"));
}

#[test]
fn override_arity_mismatch_is_reported_once() {
    let diags = check(
        "class Base { public function f(a:Int, b:Int):Void {} }\n\
         class Child extends Base { override public function f(a:Int):Void {} }",
    );
    assert_eq!(messages(&diags), vec!["Not matching arity expected 2 arguments but found 1"]);

    let diags = check(
        "class Base { public function foo(a:Int):Void {} }\n\
         class Child extends Base { override public function foo(a:Int, b:Int):Void {} }",
    );
    assert_eq!(messages(&diags), vec!["Not matching arity expected 1 arguments but found 2"]);
}

#[test]
fn missing_override_marker() {
    let diags = check(
        "class Base { public function f():Void {} }\n\
         class Child extends Base { public function f():Void {} }",
    );
    assert_eq!(messages(&diags), vec!["Must override"]);
    assert_eq!(diags[0].fixes.len(), 1);
    assert!(matches!(diags[0].fixes[0].action, FixAction::AddModifier { modifier: Modifier::Override, .. }));
}

#[test]
fn final_fields() {
    let diags = check("class Config { static final LIMIT:Int; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);

    let diags = check("class Point { final x:Int; public function new(v:Int) { this.x = v; } }");
    assert!(diags.is_empty(), "unexpected: {:?}", messages(&diags));
}

#[test]
fn checks_are_idempotent() {
    let src = "class base { var n:Int = 'x'; function f(?a:Int = 1, b:Int) {} }\n\
               interface Shape { function area():Float; }\n\
               class Square extends base implements Shape { var n:Int; function f() {} }";
    let first = check(src);
    assert!(!first.is_empty());
    assert_eq!(first, check(src));
}

#[test]
fn imports_resolve_across_modules() {
    let p = project_of(&[
        "package shapes;\ninterface Shape { function area():Float; }",
        "package app;\nimport shapes.Shape;\nclass Square implements Shape { public function area():Float { return 1.0; } }",
        "package app;\nclass Circle implements shapes.Shape {}",
    ]);
    let diags = hxsema::analyze(&p, &ValidationOptions::default());
    assert_eq!(messages(&diags), vec!["Not implemented methods: area"]);
    assert_eq!(diags[0].span.file_id, 2);
}

#[test]
fn unresolved_interface_is_reported() {
    let diags = check("class Square implements Shape {}");
    assert_eq!(messages(&diags), vec!["Not an interface"]);
}

#[test]
fn deep_nesting_is_answered_not_fatal() {
    let outcome = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let options = ValidationOptions { body_check: true, ..Default::default() };
            let deep = format!("class Main {{ function f() {{ return {}1{}; }} }}", "(".repeat(300), ")".repeat(300));
            let shallow = format!("class Main {{ function f():Int {{ return {}1{}; }} }}", "(".repeat(20), ")".repeat(20));
            let deep = hxsema::analyze_source(&deep, &options).map_err(|e| e.to_string());
            let shallow = hxsema::analyze_source(&shallow, &options).map(|d| d.len());
            (deep, shallow.ok())
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(outcome.0, Err("Syntax error: expression nested too deeply".to_string()));
    assert_eq!(outcome.1, Some(0));
}
