//! Read-only AST traversal.
//!
//! Implement `Visitor` for a pass, override only the methods you need, and
//! call the matching `walk_*` function inside an override to keep recursing.
//! Omitting the walk call prunes traversal at that node.
//!
//! ```rust
//! use hxsema::visit::{Visitor, walk_expr};
//! use hxsema::parser::ast::Expr;
//! use hxsema::span::Spanned;
//!
//! struct IdentCollector {
//!     names: Vec<String>,
//! }
//!
//! impl Visitor for IdentCollector {
//!     fn visit_expr(&mut self, expr: &Spanned<Expr>) {
//!         if let Expr::Ident(name) = &expr.node {
//!             self.names.push(name.clone());
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```

use crate::parser::ast::*;
use crate::span::Spanned;

pub trait Visitor: Sized {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }

    fn visit_type_decl(&mut self, decl: &Spanned<TypeDecl>) {
        walk_type_decl(self, decl);
    }

    fn visit_field(&mut self, field: &Spanned<FieldDecl>) {
        walk_field(self, field);
    }

    fn visit_method(&mut self, method: &Spanned<MethodDecl>) {
        walk_method(self, method);
    }

    fn visit_enum_value(&mut self, value: &Spanned<EnumValueDecl>) {
        walk_enum_value(self, value);
    }

    fn visit_param(&mut self, param: &Param) {
        walk_param(self, param);
    }

    fn visit_generic_param(&mut self, param: &GenericParam) {
        walk_generic_param(self, param);
    }

    fn visit_type_tag(&mut self, tag: &Spanned<TypeTag>) {
        walk_type_tag(self, tag);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }

    /// Called for string literals before their interpolated parts are walked.
    fn visit_string(&mut self, lit: &StringLit, expr: &Spanned<Expr>) {
        walk_string(self, lit, expr);
    }
}

pub fn walk_module<V: Visitor>(v: &mut V, module: &Module) {
    for decl in &module.types {
        v.visit_type_decl(decl);
    }
}

pub fn walk_type_decl<V: Visitor>(v: &mut V, decl: &Spanned<TypeDecl>) {
    let decl = &decl.node;
    for gp in &decl.generic_params {
        v.visit_generic_param(gp);
    }
    for tag in decl.extends.iter().chain(&decl.implements) {
        v.visit_type_tag(tag);
    }
    if let Some(alias) = &decl.alias {
        v.visit_type_tag(alias);
    }
    for member in &decl.members {
        match member {
            Member::Field(f) => v.visit_field(f),
            Member::Method(m) => v.visit_method(m),
        }
    }
    for value in &decl.enum_values {
        v.visit_enum_value(value);
    }
}

pub fn walk_field<V: Visitor>(v: &mut V, field: &Spanned<FieldDecl>) {
    if let Some(tag) = &field.node.type_tag {
        v.visit_type_tag(tag);
    }
    if let Some(init) = &field.node.init {
        v.visit_expr(init);
    }
}

pub fn walk_method<V: Visitor>(v: &mut V, method: &Spanned<MethodDecl>) {
    let method = &method.node;
    for gp in &method.generic_params {
        v.visit_generic_param(gp);
    }
    for param in &method.params {
        v.visit_param(param);
    }
    if let Some(ret) = &method.return_tag {
        v.visit_type_tag(ret);
    }
    if let Some(body) = &method.body {
        v.visit_expr(body);
    }
}

pub fn walk_enum_value<V: Visitor>(v: &mut V, value: &Spanned<EnumValueDecl>) {
    for gp in &value.node.generic_params {
        v.visit_generic_param(gp);
    }
    for param in &value.node.params {
        v.visit_param(param);
    }
    if let Some(ret) = &value.node.return_tag {
        v.visit_type_tag(ret);
    }
}

pub fn walk_param<V: Visitor>(v: &mut V, param: &Param) {
    if let Some(tag) = &param.type_tag {
        v.visit_type_tag(tag);
    }
    if let Some(default) = &param.default {
        v.visit_expr(default);
    }
}

pub fn walk_generic_param<V: Visitor>(v: &mut V, param: &GenericParam) {
    for c in &param.constraints {
        v.visit_type_tag(c);
    }
}

pub fn walk_type_tag<V: Visitor>(v: &mut V, tag: &Spanned<TypeTag>) {
    match &tag.node {
        TypeTag::Named { args, .. } => {
            for arg in args {
                v.visit_type_tag(arg);
            }
        }
        TypeTag::Function { params, ret } => {
            for p in params {
                v.visit_type_tag(&p.ty);
            }
            if let Some(ret) = ret {
                v.visit_type_tag(ret);
            }
        }
        TypeTag::Anonymous(fields) => {
            for f in fields {
                if let Some(ty) = &f.ty {
                    v.visit_type_tag(ty);
                }
            }
        }
    }
}

pub fn walk_string<V: Visitor>(v: &mut V, lit: &StringLit, _expr: &Spanned<Expr>) {
    for part in &lit.parts {
        if let StringPart::Interp { expr, .. } = part {
            v.visit_expr(expr);
        }
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node {
        Expr::Int(_)
        | Expr::Float(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Ident(_)
        | Expr::This
        | Expr::Super
        | Expr::Break
        | Expr::Continue => {}
        Expr::Str(lit) => v.visit_string(lit, expr),
        Expr::Field { object, .. } => v.visit_expr(object),
        Expr::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::New { class, args } => {
            v.visit_type_tag(class);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Unary { operand, .. } => v.visit_expr(operand),
        Expr::Ternary { cond, then_branch, else_branch } => {
            v.visit_expr(cond);
            v.visit_expr(then_branch);
            v.visit_expr(else_branch);
        }
        Expr::Paren(inner) | Expr::Untyped(inner) | Expr::Throw(inner) => v.visit_expr(inner),
        Expr::ArrayLit(items) | Expr::Block(items) => {
            for item in items {
                v.visit_expr(item);
            }
        }
        Expr::ObjectLit(fields) => {
            for (_, value) in fields {
                v.visit_expr(value);
            }
        }
        Expr::Index { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        Expr::Function(lit) => {
            for param in &lit.params {
                v.visit_param(param);
            }
            if let Some(ret) = &lit.return_tag {
                v.visit_type_tag(ret);
            }
            v.visit_expr(&lit.body);
        }
        Expr::Cast { expr: inner, ty } => {
            v.visit_expr(inner);
            if let Some(ty) = ty {
                v.visit_type_tag(ty);
            }
        }
        Expr::Var(local) => {
            if let Some(tag) = &local.type_tag {
                v.visit_type_tag(tag);
            }
            if let Some(init) = &local.init {
                v.visit_expr(init);
            }
        }
        Expr::If { cond, then_branch, else_branch } => {
            v.visit_expr(cond);
            v.visit_expr(then_branch);
            if let Some(e) = else_branch {
                v.visit_expr(e);
            }
        }
        Expr::While { cond, body, .. } => {
            v.visit_expr(cond);
            v.visit_expr(body);
        }
        Expr::For { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_expr(body);
        }
        Expr::Switch { subject, cases, default } => {
            v.visit_expr(subject);
            for case in cases {
                for value in &case.values {
                    v.visit_expr(value);
                }
                v.visit_expr(&case.body);
            }
            if let Some(d) = default {
                v.visit_expr(d);
            }
        }
        Expr::Try { body, catches } => {
            v.visit_expr(body);
            for c in catches {
                if let Some(tag) = &c.type_tag {
                    v.visit_type_tag(tag);
                }
                v.visit_expr(&c.body);
            }
        }
        Expr::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
    }
}
