//! Validators. Each check takes a declaration and a sink and only reports;
//! nothing here mutates the project or fails.
//!
//! `check_module` runs every check over one module in declaration order.

pub mod class;
pub mod field;
pub mod literal;
pub mod local;
pub mod method;
pub mod package;

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::trace;

use crate::diagnostics::DiagnosticSink;
use crate::model::{ClassHandle, MemberHandle, MethodHandle};
use crate::parser::ast::{Expr, StringLit, TypeTag};
use crate::span::{Span, Spanned};
use crate::typeck::TypeResolver;
use crate::typeck::types::TypeResult;
use crate::visit::{Visitor, walk_enum_value, walk_expr, walk_field, walk_generic_param, walk_method, walk_type_tag};

pub use class::{check_class, check_interface_methods};
pub use field::{assigns_field, check_field, is_assigned_in_constructor};
pub use literal::{check_string_literal, check_type_name, check_type_reference};
pub use local::{TagInit, check_local_var, check_type_tag_init};
pub use method::{
    check_method, check_method_arguments, check_method_body, check_override, check_required_tags,
    check_signature_compatibility, signature_differs,
};
pub use package::{check_package, expected_package};

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Forward return-type diagnostics from method bodies.
    pub body_check: bool,
    /// Directories whose layout defines package names.
    pub source_roots: Vec<PathBuf>,
}

/// Run every validator over the module at `module`.
pub fn check_module<'p>(
    resolver: &mut TypeResolver<'p>,
    module: usize,
    options: &ValidationOptions,
    sink: &mut dyn DiagnosticSink,
) {
    let project = resolver.project();
    package::check_package(project.module(module), &options.source_roots, sink);

    for class in project.classes_in_module(module) {
        trace!(class = class.qualified_name(), "validating");
        class::check_class(resolver, class, sink);

        let decl = class.decl();
        let mut tree = TreeChecks::new(resolver, sink, class);
        for param in &decl.generic_params {
            walk_generic_param(&mut tree, param);
        }
        for tag in decl.extends.iter().chain(&decl.implements).chain(&decl.alias) {
            tree.visit_type_tag(tag);
        }
        for value in class.enum_values() {
            walk_enum_value(&mut tree, value.spanned());
        }

        for member in class.members() {
            match member {
                MemberHandle::Field(field) => {
                    field::check_field(resolver, field, sink);
                    walk_field(&mut TreeChecks::new(resolver, sink, class), field.spanned());
                }
                MemberHandle::Method(method) => {
                    method::check_method(resolver, method, sink);
                    let mut tree = TreeChecks::new(resolver, sink, class);
                    tree.method = Some(method);
                    if let Some(mut ctx) = method::evaluate_body(tree.resolver, method) {
                        if options.body_check {
                            for diagnostic in ctx.take_diagnostics() {
                                tree.sink.report(diagnostic);
                            }
                        }
                        tree.local_inits =
                            ctx.local_inits().into_iter().map(|l| (l.name_span, l.init.clone())).collect();
                    }
                    walk_method(&mut tree, method.spanned());
                }
            }
        }
    }
}

/// Per-node checks run while walking a declaration: type references,
/// string literals and typed locals.
struct TreeChecks<'r, 'p> {
    resolver: &'r mut TypeResolver<'p>,
    sink: &'r mut dyn DiagnosticSink,
    class: ClassHandle<'p>,
    method: Option<MethodHandle<'p>>,
    /// Initializer types recorded while evaluating the body, by local name.
    local_inits: HashMap<Span, TypeResult>,
}

impl<'r, 'p> TreeChecks<'r, 'p> {
    fn new(resolver: &'r mut TypeResolver<'p>, sink: &'r mut dyn DiagnosticSink, class: ClassHandle<'p>) -> Self {
        Self { resolver, sink, class, method: None, local_inits: HashMap::new() }
    }
}

impl Visitor for TreeChecks<'_, '_> {
    fn visit_type_tag(&mut self, tag: &Spanned<TypeTag>) {
        literal::check_type_reference(tag, self.sink);
        walk_type_tag(self, tag);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        if let Expr::Var(local) = &expr.node {
            let init = self.local_inits.get(&local.name.span).cloned();
            local::check_local_var(self.resolver, local, expr.span, Some(self.class), self.method, init, self.sink);
        }
        walk_expr(self, expr);
    }

    fn visit_string(&mut self, lit: &StringLit, expr: &Spanned<Expr>) {
        literal::check_string_literal(lit, expr.span, self.sink);
        crate::visit::walk_string(self, lit, expr);
    }
}
