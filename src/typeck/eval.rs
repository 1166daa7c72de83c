use std::cmp::Ordering;
use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::model::{ClassHandle, EnumValueHandle, MemberHandle, MethodHandle, ParamHandle};
use crate::parser::ast::{BinOp, Expr, FunctionLiteral, LocalVar, Quote, StringPart, SwitchCase, TypeTag, UnaryOp};
use crate::span::Spanned;

use super::context::{EvaluationContext, LocalInit, PendingLambda, ReturnInfo, iteration_type};
use super::generics::GenericResolver;
use super::tag::TagScope;
use super::types::{ClassDescriptor, ClassRef, Constant, FnArg, Primitive, StructMember, Type, TypeResult, unify};
use super::{EvalFault, TypeResolver};

impl<'p> TypeResolver<'p> {
    /// Type of `expr` inside `ctx`, including any function literals it
    /// contains. Internal faults answer `Unknown`.
    pub fn evaluate<'a>(
        &mut self,
        expr: &'a Spanned<Expr>,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> TypeResult {
        self.boundary(TypeResult::unknown(), |s| {
            let result = s.eval(expr, ctx, resolver)?;
            s.drain_lambdas(ctx, resolver)?;
            Ok(result)
        })
    }

    /// Evaluate the context's root. When the root is a method body and the
    /// context is reporting, returns are checked against the method's type.
    pub fn evaluate_context(&mut self, ctx: &mut EvaluationContext<'_>, resolver: &GenericResolver) -> TypeResult {
        self.boundary(TypeResult::unknown(), |s| s.evaluate_context_inner(ctx, resolver))
    }

    /// Evaluate a method body with its parameters in scope, collecting
    /// return-type diagnostics. `None` for methods without a body.
    pub fn evaluate_method_body<'a>(
        &mut self,
        method: MethodHandle<'a>,
        resolver: &GenericResolver,
    ) -> Option<EvaluationContext<'a>> {
        let mut ctx = EvaluationContext::for_method(method)?.reporting();
        self.boundary((), |s| {
            s.declare_params(&mut ctx, method, resolver)?;
            s.evaluate_context_inner(&mut ctx, resolver)?;
            Ok(())
        });
        Some(ctx)
    }

    /// Evaluate a detached expression (initializer, default value) as seen
    /// from `class`.
    pub fn evaluate_expression<'a>(
        &mut self,
        expr: &'a Spanned<Expr>,
        class: Option<ClassHandle<'a>>,
        resolver: &GenericResolver,
    ) -> TypeResult {
        let mut ctx = EvaluationContext::new(expr);
        if let Some(class) = class {
            ctx = ctx.with_class(class);
        }
        self.boundary(TypeResult::unknown(), |s| s.eval(expr, &mut ctx, resolver))
    }

    fn evaluate_context_inner(
        &mut self,
        ctx: &mut EvaluationContext<'_>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        let root = ctx.root();
        let result = self.eval(root, ctx, resolver)?;
        if let Some(method) = ctx.method() {
            if ctx.is_reporting() && method.body().is_some_and(|b| std::ptr::eq(b, root)) {
                self.check_returns(ctx, method, resolver);
            }
        }
        self.drain_lambdas(ctx, resolver)?;
        Ok(result)
    }

    pub(crate) fn declare_params(
        &mut self,
        ctx: &mut EvaluationContext<'_>,
        method: MethodHandle<'_>,
        resolver: &GenericResolver,
    ) -> Result<(), EvalFault> {
        let scope = TagScope::for_method(method);
        for param in method.params() {
            let ty = self.parameter_type_inner(param, &scope, resolver)?;
            ctx.declare(param.name(), ty);
        }
        Ok(())
    }

    fn check_returns(&mut self, ctx: &mut EvaluationContext<'_>, method: MethodHandle<'_>, resolver: &GenericResolver) {
        let expected = match method.return_tag() {
            Some(tag) => self.resolve_type_tag(tag, &TagScope::for_method(method), resolver),
            None => ctx.returns().first().map(|r| r.ty.clone()).unwrap_or_else(TypeResult::dynamic),
        };
        let failures: Vec<Diagnostic> = ctx
            .returns()
            .iter()
            .filter(|r| !expected.can_assign(&r.ty))
            .map(|r| Diagnostic::error(format!("Can't return {}, expected {}", r.ty, expected), r.span))
            .collect();
        for diagnostic in failures {
            ctx.report(diagnostic);
        }
    }

    /// Function literals run after their parent's direct traversal, each in
    /// a child context seeded with the locals visible at the literal.
    fn drain_lambdas<'a>(&mut self, ctx: &mut EvaluationContext<'a>, resolver: &GenericResolver) -> Result<(), EvalFault> {
        let scope = scope_of(ctx);
        for pending in ctx.take_lambdas() {
            let mut child = ctx.child(&pending.literal.body, pending.locals);
            for (position, param) in pending.literal.params.iter().enumerate() {
                let ty = self.parameter_type_inner(ParamHandle::new(param, position), &scope, resolver)?;
                child.declare(param.name.node.clone(), ty);
            }
            self.eval(&pending.literal.body, &mut child, resolver)?;
            self.drain_lambdas(&mut child, resolver)?;
            ctx.add_child(child);
        }
        Ok(())
    }

    pub(crate) fn eval<'a>(
        &mut self,
        expr: &'a Spanned<Expr>,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        self.descend(|s| s.eval_node(expr, ctx, resolver))
    }

    fn eval_node<'a>(
        &mut self,
        expr: &'a Spanned<Expr>,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        Ok(match &expr.node {
            Expr::Int(n) => TypeResult::new(Type::int()).with_constant(Constant::Int(*n)),
            Expr::Float(n) => TypeResult::new(Type::float()).with_constant(Constant::Float(*n)),
            Expr::Bool(b) => TypeResult::new(Type::bool()).with_constant(Constant::Bool(*b)),
            Expr::Null => TypeResult::dynamic().with_constant(Constant::Null),
            Expr::Str(lit) => {
                if lit.quote == Quote::Single {
                    for part in &lit.parts {
                        if let StringPart::Interp { expr: inner, .. } = part {
                            self.eval(inner, ctx, resolver)?;
                        }
                    }
                }
                let result = TypeResult::new(Type::string());
                match lit.constant_text() {
                    Some(text) => result.with_constant(Constant::Str(text)),
                    None => result,
                }
            }
            Expr::Ident(name) => self.eval_ident(name, ctx, resolver)?,
            Expr::This => match ctx.class() {
                Some(class) => TypeResult::new(class.instance_type()),
                None => TypeResult::unknown(),
            },
            Expr::Super => self.super_type(ctx, resolver),
            Expr::Field { object, field } => {
                let object = self.eval(object, ctx, resolver)?;
                self.member_access(&object, &field.node)?
            }
            Expr::Call { callee, args } => {
                let callee_ty = self.eval(callee, ctx, resolver)?;
                for arg in args {
                    self.eval(arg, ctx, resolver)?;
                }
                if matches!(callee.node, Expr::Super) {
                    TypeResult::void()
                } else {
                    call_result(&callee_ty.ty)
                }
            }
            Expr::New { class, args } => {
                for arg in args {
                    self.eval(arg, ctx, resolver)?;
                }
                self.resolve_type_tag(class, &scope_of(ctx), resolver).without_constant()
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, ctx, resolver)?;
                let r = self.eval(rhs, ctx, resolver)?;
                binary_result(*op, &l, &r)
            }
            Expr::Assign { op, target, value } => {
                let target_ty = self.eval(target, ctx, resolver)?;
                let value_ty = self.eval(value, ctx, resolver)?;
                let result = match op {
                    None => value_ty.without_constant(),
                    Some(op) if is_compound_operator(*op) => binary_result(*op, &target_ty, &value_ty).without_constant(),
                    Some(op) => {
                        return Err(EvalFault::Malformed { detail: format!("{op:?} is not a compound assignment operator") });
                    }
                };
                if let Expr::Ident(name) = &target.node {
                    let stored = if target_ty.is_unknown() { result.clone() } else { target_ty.without_constant() };
                    ctx.assign_local(name, stored);
                }
                result
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, ctx, resolver)?;
                unary_result(*op, value)
            }
            Expr::Ternary { cond, then_branch, else_branch } => {
                self.eval(cond, ctx, resolver)?;
                let t = self.eval(then_branch, ctx, resolver)?;
                let e = self.eval(else_branch, ctx, resolver)?;
                TypeResult::new(unify(&t.ty, &e.ty))
            }
            Expr::Paren(inner) => self.eval(inner, ctx, resolver)?,
            Expr::ArrayLit(items) => {
                let mut elem = Type::Unknown;
                for item in items {
                    let ty = self.eval(item, ctx, resolver)?;
                    elem = unify(&elem, &ty.ty);
                }
                TypeResult::new(self.builtin_class("Array", vec![elem]))
            }
            Expr::ObjectLit(fields) => {
                let mut members = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    let ty = self.eval(value, ctx, resolver)?;
                    members.push(StructMember { name: name.node.clone(), optional: false, ty: Some(ty.ty) });
                }
                TypeResult::new(Type::class(ClassRef::Resolved(Arc::new(ClassDescriptor::structural(members))), Vec::new()))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, ctx, resolver)?;
                self.eval(index, ctx, resolver)?;
                TypeResult::new(index_result(&object.ty))
            }
            Expr::Function(lit) => self.function_literal(lit, ctx, resolver),
            Expr::Cast { expr: inner, ty } => {
                self.eval(inner, ctx, resolver)?;
                match ty {
                    Some(tag) => self.resolve_type_tag(tag, &scope_of(ctx), resolver).without_constant(),
                    None => TypeResult::dynamic(),
                }
            }
            Expr::Untyped(inner) => {
                self.eval(inner, ctx, resolver)?;
                TypeResult::dynamic()
            }
            Expr::Block(stmts) => {
                ctx.push_scope();
                let result = self.eval_block(stmts, ctx, resolver);
                ctx.pop_scope();
                result?
            }
            Expr::Var(local) => {
                self.declare_local(local, ctx, resolver)?;
                TypeResult::void()
            }
            Expr::If { cond, then_branch, else_branch } => {
                self.eval(cond, ctx, resolver)?;
                let t = self.eval(then_branch, ctx, resolver)?;
                match else_branch {
                    Some(e) => {
                        let e = self.eval(e, ctx, resolver)?;
                        TypeResult::new(unify(&t.ty, &e.ty))
                    }
                    None => TypeResult::void(),
                }
            }
            Expr::While { cond, body, .. } => {
                self.eval(cond, ctx, resolver)?;
                self.eval(body, ctx, resolver)?;
                TypeResult::void()
            }
            Expr::For { var, iterable, body } => {
                let iterable = self.eval(iterable, ctx, resolver)?;
                ctx.push_scope();
                ctx.declare(var.node.clone(), TypeResult::new(iteration_type(&iterable.ty)));
                let result = self.eval(body, ctx, resolver);
                ctx.pop_scope();
                result?;
                TypeResult::void()
            }
            Expr::Switch { subject, cases, default } => {
                self.eval(subject, ctx, resolver)?;
                let mut joined: Option<Type> = None;
                for case in cases {
                    ctx.push_scope();
                    let result = self.eval_case(case, ctx, resolver);
                    ctx.pop_scope();
                    let ty = result?.ty;
                    joined = Some(match joined {
                        Some(acc) => unify(&acc, &ty),
                        None => ty,
                    });
                }
                match default {
                    Some(d) => {
                        let ty = self.eval(d, ctx, resolver)?.ty;
                        TypeResult::new(match joined {
                            Some(acc) => unify(&acc, &ty),
                            None => ty,
                        })
                    }
                    None => TypeResult::void(),
                }
            }
            Expr::Try { body, catches } => {
                let result = self.eval(body, ctx, resolver)?;
                for clause in catches {
                    let ty = match &clause.type_tag {
                        Some(tag) => self.resolve_type_tag(tag, &scope_of(ctx), resolver).without_constant(),
                        None => TypeResult::dynamic(),
                    };
                    ctx.push_scope();
                    ctx.declare(clause.var.node.clone(), ty);
                    let caught = self.eval(&clause.body, ctx, resolver);
                    ctx.pop_scope();
                    caught?;
                }
                result.without_constant()
            }
            Expr::Return(value) => {
                let (ty, span) = match value {
                    Some(v) => (self.eval(v, ctx, resolver)?, v.span),
                    None => (TypeResult::void(), expr.span),
                };
                ctx.add_return(ReturnInfo { ty, span });
                TypeResult::void()
            }
            Expr::Break | Expr::Continue => TypeResult::void(),
            Expr::Throw(value) => {
                self.eval(value, ctx, resolver)?;
                TypeResult::dynamic()
            }
        })
    }

    fn eval_block<'a>(
        &mut self,
        stmts: &'a [Spanned<Expr>],
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        let mut last = TypeResult::void();
        for stmt in stmts {
            last = self.eval(stmt, ctx, resolver)?;
        }
        Ok(last)
    }

    fn eval_case<'a>(
        &mut self,
        case: &'a SwitchCase,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        for value in &case.values {
            self.eval(value, ctx, resolver)?;
        }
        self.eval(&case.body, ctx, resolver)
    }

    fn declare_local<'a>(
        &mut self,
        local: &'a LocalVar,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> Result<(), EvalFault> {
        let init = match &local.init {
            Some(init) => Some(self.eval(init, ctx, resolver)?),
            None => None,
        };
        if let (Some(_), Some(init)) = (&local.type_tag, &init) {
            ctx.record_local_init(LocalInit { name_span: local.name.span, init: init.clone() });
        }
        let declared = match &local.type_tag {
            Some(tag) => {
                let declared = self.resolve_type_tag(tag, &scope_of(ctx), resolver);
                TypeResult { ty: declared.ty, constant: init.and_then(|i| i.constant) }
            }
            None => init.unwrap_or_else(TypeResult::unknown),
        };
        ctx.declare(local.name.node.clone(), declared);
        Ok(())
    }

    /// The literal's value is its signature; the body is queued for later.
    fn function_literal<'a>(
        &mut self,
        lit: &'a FunctionLiteral,
        ctx: &mut EvaluationContext<'a>,
        resolver: &GenericResolver,
    ) -> TypeResult {
        let scope = scope_of(ctx);
        let params = lit
            .params
            .iter()
            .enumerate()
            .map(|(position, p)| FnArg {
                position,
                optional: p.is_optional(),
                ty: self.resolve_optional_tag(p.type_tag.as_ref(), &scope, resolver).ty,
                name: Some(p.name.node.clone()),
            })
            .collect();
        let ret = self.resolve_optional_tag(lit.return_tag.as_ref(), &scope, resolver).ty;
        let value = TypeResult::new(Type::Function { params, ret: Box::new(ret) });
        if let Some(name) = &lit.name {
            ctx.declare(name.node.clone(), value.clone());
        }
        let locals = ctx.visible_locals();
        ctx.queue_lambda(PendingLambda { literal: lit, locals });
        value
    }

    /// Locals, then members of the enclosing class and its ancestors, then
    /// type names, then enum constructors.
    fn eval_ident(
        &mut self,
        name: &str,
        ctx: &EvaluationContext<'_>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        if let Some(local) = ctx.local_type(name) {
            return Ok(local.clone());
        }
        if let Some(member) = ctx.class().and_then(|c| c.find_member(name)) {
            return self.member_value_type(member, resolver);
        }
        if let Some(id) = self.project.resolve_type_name(name, ctx.module()) {
            return Ok(TypeResult::new(class_object(self.project.class(id))));
        }
        if let Some(value) = self.visible_enum_constructor(name, ctx.module()) {
            return self.enum_value_type(value);
        }
        Ok(TypeResult::unknown())
    }

    fn visible_enum_constructor(&self, name: &str, module: Option<usize>) -> Option<EnumValueHandle<'p>> {
        let project = self.project;
        project
            .classes()
            .filter(|c| c.is_enum())
            .filter(|c| module.is_none() || project.resolve_type_name(c.name(), module) == Some(c.id()))
            .find_map(|c| c.enum_value(name))
    }

    fn super_type(&self, ctx: &EvaluationContext<'_>, resolver: &GenericResolver) -> TypeResult {
        let Some(class) = ctx.class() else {
            return TypeResult::unknown();
        };
        match class.decl().extends.first() {
            Some(tag) if class.parent_class().is_some() => {
                self.resolve_type_tag(tag, &TagScope::for_class(class), resolver)
            }
            _ => TypeResult::unknown(),
        }
    }

    pub(crate) fn member_value_type(
        &mut self,
        member: MemberHandle<'_>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        match member {
            MemberHandle::Field(field) => {
                let result = self.field_type_inner(field)?;
                Ok(self.resolve_parameterized_type(result, resolver))
            }
            MemberHandle::Method(method) => Ok(TypeResult::new(self.method_function_type_inner(method, resolver)?)),
        }
    }

    fn member_access(&mut self, object: &TypeResult, name: &str) -> Result<TypeResult, EvalFault> {
        match &object.ty {
            Type::Dynamic => Ok(TypeResult::dynamic()),
            Type::Primitive(Primitive::String) if name == "length" => Ok(TypeResult::new(Type::int())),
            Type::ClassInstance { class: ClassRef::Unresolved(wrapper), generics }
                if (wrapper == "Class" || wrapper == "Enum") && generics.len() == 1 =>
            {
                match generics[0].descriptor().and_then(|d| d.id) {
                    Some(id) => self.static_member(self.project.class(id), name),
                    None => Ok(TypeResult::unknown()),
                }
            }
            Type::ClassInstance { class: ClassRef::Unresolved(array), .. } if array == "Array" && name == "length" => {
                Ok(TypeResult::new(Type::int()))
            }
            Type::ClassInstance { class: ClassRef::Resolved(desc), .. } => {
                if desc.is_structural() {
                    return Ok(desc
                        .member(name)
                        .and_then(|m| m.ty.clone())
                        .map(TypeResult::new)
                        .unwrap_or_else(TypeResult::unknown));
                }
                let Some(id) = desc.id else {
                    return Ok(TypeResult::unknown());
                };
                let class = self.project.class(id);
                let Some(member) = class.find_member(name) else {
                    return Ok(TypeResult::unknown());
                };
                let resolver =
                    self.inherited_resolver(class, member.containing_class(), GenericResolver::for_instance(&object.ty));
                self.member_value_type(member, &resolver)
            }
            _ => Ok(TypeResult::unknown()),
        }
    }

    fn static_member(&mut self, class: ClassHandle<'p>, name: &str) -> Result<TypeResult, EvalFault> {
        if let Some(value) = class.enum_value(name) {
            return self.enum_value_type(value);
        }
        match class.find_member(name) {
            Some(member) => self.member_value_type(member, &GenericResolver::new()),
            None => Ok(TypeResult::unknown()),
        }
    }

    /// Carry an instance's bindings up the `extends` chain to `owner`, so
    /// `IntBox extends Base<Int>` sees `Base.T` as `Int`.
    pub(crate) fn inherited_resolver(&self, class: ClassHandle<'p>, owner: ClassHandle<'p>, base: GenericResolver) -> GenericResolver {
        if class == owner {
            return base;
        }
        let mut current = class;
        let mut resolver = base.clone();
        for parent in class.superclass_chain() {
            let Some(TypeTag::Named { args, .. }) = current.decl().extends.first().map(|t| &t.node) else {
                break;
            };
            let scope = TagScope::for_class(current);
            let mut next = GenericResolver::new();
            for (param, arg) in parent.generic_params().iter().zip(args) {
                next.add(param.name.node.clone(), self.resolve_type_tag(arg, &scope, &resolver));
            }
            resolver = next;
            current = parent;
            if parent == owner {
                return resolver;
            }
        }
        base
    }

    /// A constructor without arguments is a value of its enum; one with
    /// arguments is a function producing it.
    pub(crate) fn enum_value_type(&mut self, value: EnumValueHandle<'_>) -> Result<TypeResult, EvalFault> {
        let produced = self.enum_value_result_type(value);
        if value.decl().params.is_empty() {
            return Ok(TypeResult::new(produced));
        }
        let scope = TagScope::for_enum_value(value);
        let empty = GenericResolver::new();
        let mut params = Vec::new();
        for param in value.params() {
            let ty = self.parameter_type_inner(param, &scope, &empty)?;
            params.push(FnArg {
                position: param.position(),
                optional: param.is_optional(),
                ty: ty.ty,
                name: Some(param.name().to_string()),
            });
        }
        Ok(TypeResult::new(Type::Function { params, ret: Box::new(produced) }))
    }

    fn builtin_class(&self, name: &str, generics: Vec<Type>) -> Type {
        match self.project.class_by_qualified_name(name) {
            Some(class) => Type::class(ClassRef::Resolved(class.descriptor().clone()), generics),
            None => Type::class(ClassRef::Unresolved(name.to_string()), generics),
        }
    }
}

/// Tag scope for annotations written inside the context's code.
fn scope_of<'a>(ctx: &EvaluationContext<'a>) -> TagScope<'a> {
    match (ctx.method(), ctx.class()) {
        (Some(method), _) => TagScope::for_method(method),
        (None, Some(class)) => TagScope::for_class(class),
        (None, None) => TagScope { module: ctx.module(), ..TagScope::default() },
    }
}

/// `Class<Foo>` (or `Enum<Foo>`) for a bare type name used as a value.
fn class_object(class: ClassHandle<'_>) -> Type {
    let wrapper = if class.is_enum() { "Enum" } else { "Class" };
    Type::class(
        ClassRef::Unresolved(wrapper.to_string()),
        vec![Type::class(ClassRef::Resolved(class.descriptor().clone()), Vec::new())],
    )
}

fn call_result(callee: &Type) -> TypeResult {
    match callee {
        Type::Function { ret, .. } => TypeResult::new((**ret).clone()),
        Type::Dynamic => TypeResult::dynamic(),
        _ => TypeResult::unknown(),
    }
}

fn index_result(object: &Type) -> Type {
    match object {
        Type::Dynamic => Type::Dynamic,
        Type::Primitive(Primitive::String) => Type::string(),
        Type::ClassInstance { class, generics } => match (class.name(), generics.as_slice()) {
            ("Array" | "Vector", [elem]) => elem.clone(),
            (name, [_, value]) if name.ends_with("Map") => value.clone(),
            _ => Type::Unknown,
        },
        _ => Type::Unknown,
    }
}

fn is_compound_operator(op: BinOp) -> bool {
    matches!(
        op,
        BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Mod
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor
            | BinOp::Shl
            | BinOp::Shr
    )
}

fn is_string(ty: &Type) -> bool {
    ty.primitive() == Some(Primitive::String)
}

fn numeric_value(constant: &Constant) -> Option<f64> {
    match constant {
        Constant::Int(n) => Some(*n as f64),
        Constant::Float(f) => Some(*f),
        _ => None,
    }
}

fn binary_result(op: BinOp, l: &TypeResult, r: &TypeResult) -> TypeResult {
    match op {
        BinOp::Add if is_string(&l.ty) || is_string(&r.ty) => {
            let result = TypeResult::new(Type::string());
            match (&l.constant, &r.constant) {
                (Some(a), Some(b)) => result.with_constant(Constant::Str(a.concat_text() + &b.concat_text())),
                _ => result,
            }
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Mod => arithmetic(op, l, r),
        BinOp::Div => {
            let result = TypeResult::new(Type::float());
            match (l.constant.as_ref().and_then(numeric_value), r.constant.as_ref().and_then(numeric_value)) {
                (Some(a), Some(b)) if b != 0.0 => result.with_constant(Constant::Float(a / b)),
                _ => result,
            }
        }
        BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
            let result = TypeResult::new(Type::bool());
            match compare(op, l.constant.as_ref(), r.constant.as_ref()) {
                Some(b) => result.with_constant(Constant::Bool(b)),
                None => result,
            }
        }
        BinOp::And | BinOp::Or => {
            let result = TypeResult::new(Type::bool());
            match (&l.constant, &r.constant) {
                (Some(Constant::Bool(a)), Some(Constant::Bool(b))) => {
                    result.with_constant(Constant::Bool(if op == BinOp::And { *a && *b } else { *a || *b }))
                }
                _ => result,
            }
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
            let result = TypeResult::new(Type::int());
            let (Some(Constant::Int(a)), Some(Constant::Int(b))) = (&l.constant, &r.constant) else {
                return result;
            };
            let (a, b) = (*a, *b);
            let folded = match op {
                BinOp::BitAnd => a & b,
                BinOp::BitOr => a | b,
                BinOp::BitXor => a ^ b,
                BinOp::Shl => a.wrapping_shl(b as u32),
                _ => a.wrapping_shr(b as u32),
            };
            result.with_constant(Constant::Int(folded))
        }
        BinOp::Interval => TypeResult::new(Type::named("IntIterator")),
    }
}

fn arithmetic(op: BinOp, l: &TypeResult, r: &TypeResult) -> TypeResult {
    let ty = match (l.ty.primitive(), r.ty.primitive()) {
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
            if a == Primitive::Float || b == Primitive::Float {
                Type::float()
            } else if a == Primitive::UInt && b == Primitive::UInt {
                Type::Primitive(Primitive::UInt)
            } else {
                Type::int()
            }
        }
        _ if l.ty.is_dynamic() || r.ty.is_dynamic() => return TypeResult::dynamic(),
        _ => return TypeResult::unknown(),
    };
    let constant = match (&l.constant, &r.constant) {
        (Some(Constant::Int(a)), Some(Constant::Int(b))) => {
            let (a, b) = (*a, *b);
            let folded = match op {
                BinOp::Add => Some(a.wrapping_add(b)),
                BinOp::Sub => Some(a.wrapping_sub(b)),
                BinOp::Mul => Some(a.wrapping_mul(b)),
                _ => a.checked_rem(b),
            };
            folded.map(Constant::Int)
        }
        (Some(a), Some(b)) => match (numeric_value(a), numeric_value(b)) {
            (Some(a), Some(b)) => Some(Constant::Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                _ => a % b,
            })),
            _ => None,
        },
        _ => None,
    };
    TypeResult { ty, constant }
}

fn compare(op: BinOp, l: Option<&Constant>, r: Option<&Constant>) -> Option<bool> {
    let (Some(l), Some(r)) = (l, r) else {
        return None;
    };
    let ordering = match (l, r) {
        (Constant::Str(a), Constant::Str(b)) => a.cmp(b),
        (Constant::Bool(a), Constant::Bool(b)) if matches!(op, BinOp::Eq | BinOp::Neq) => a.cmp(b),
        (Constant::Null, Constant::Null) if matches!(op, BinOp::Eq | BinOp::Neq) => Ordering::Equal,
        _ => numeric_value(l)?.partial_cmp(&numeric_value(r)?)?,
    };
    Some(match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Neq => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::LtEq => ordering != Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn unary_result(op: UnaryOp, value: TypeResult) -> TypeResult {
    match op {
        UnaryOp::Neg => match value.ty.primitive() {
            Some(p) if p.is_numeric() => {
                let constant = match &value.constant {
                    Some(Constant::Int(n)) => Some(Constant::Int(n.wrapping_neg())),
                    Some(Constant::Float(f)) => Some(Constant::Float(-f)),
                    _ => None,
                };
                TypeResult { ty: value.ty, constant }
            }
            _ if value.ty.is_dynamic() => TypeResult::dynamic(),
            _ => TypeResult::unknown(),
        },
        UnaryOp::Not => {
            let result = TypeResult::new(Type::bool());
            match value.constant {
                Some(Constant::Bool(b)) => result.with_constant(Constant::Bool(!b)),
                _ => result,
            }
        }
        UnaryOp::BitNot => {
            let result = TypeResult::new(Type::int());
            match value.constant {
                Some(Constant::Int(n)) => result.with_constant(Constant::Int(!n)),
                _ => result,
            }
        }
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => value.without_constant(),
    }
}
