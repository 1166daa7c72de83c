use crate::diagnostics::Diagnostic;
use crate::model::{ClassHandle, MethodHandle};
use crate::parser::ast::{Expr, FunctionLiteral};
use crate::span::{Span, Spanned};

use super::types::{Type, TypeResult, unify};

/// A `return` seen during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnInfo {
    pub ty: TypeResult,
    pub span: Span,
}

/// Initializer type of a typed local, kept for the local-variable check.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalInit {
    pub name_span: Span,
    pub init: TypeResult,
}

/// Function literal waiting for its parent's direct traversal to finish.
#[derive(Debug)]
pub(crate) struct PendingLambda<'a> {
    pub literal: &'a FunctionLiteral,
    pub locals: Vec<(String, TypeResult)>,
}

/// State of one body evaluation: the root node, the enclosing class and
/// method, lexical locals, collected returns and child contexts for
/// function literals.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    root: &'a Spanned<Expr>,
    class: Option<ClassHandle<'a>>,
    method: Option<MethodHandle<'a>>,
    module: Option<usize>,
    scopes: Vec<Vec<(String, TypeResult)>>,
    returns: Vec<ReturnInfo>,
    lambdas: Vec<PendingLambda<'a>>,
    children: Vec<EvaluationContext<'a>>,
    local_inits: Vec<LocalInit>,
    diagnostics: Option<Vec<Diagnostic>>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(root: &'a Spanned<Expr>) -> Self {
        Self {
            root,
            class: None,
            method: None,
            module: None,
            scopes: vec![Vec::new()],
            returns: Vec::new(),
            lambdas: Vec::new(),
            children: Vec::new(),
            local_inits: Vec::new(),
            diagnostics: None,
        }
    }

    /// Context rooted at a method body; `None` for methods without one.
    pub fn for_method(method: MethodHandle<'a>) -> Option<Self> {
        let body = method.body()?;
        let mut ctx = Self::new(body).with_class(method.containing_class());
        ctx.method = Some(method);
        Some(ctx)
    }

    pub fn with_class(mut self, class: ClassHandle<'a>) -> Self {
        self.module = Some(class.module_index());
        self.class = Some(class);
        self
    }

    pub fn with_module(mut self, module: usize) -> Self {
        self.module = Some(module);
        self
    }

    /// Collect return-type diagnostics while evaluating.
    pub fn reporting(mut self) -> Self {
        self.diagnostics = Some(Vec::new());
        self
    }

    /// Child context for a function literal: same class and module, no
    /// method, and a copy of the visible locals.
    pub(crate) fn child(&self, root: &'a Spanned<Expr>, locals: Vec<(String, TypeResult)>) -> Self {
        let mut ctx = Self::new(root);
        ctx.class = self.class;
        ctx.module = self.module;
        ctx.scopes = vec![locals];
        ctx
    }

    pub fn root(&self) -> &'a Spanned<Expr> {
        self.root
    }

    pub fn class(&self) -> Option<ClassHandle<'a>> {
        self.class
    }

    pub fn method(&self) -> Option<MethodHandle<'a>> {
        self.method
    }

    pub fn module(&self) -> Option<usize> {
        self.module
    }

    pub fn returns(&self) -> &[ReturnInfo] {
        &self.returns
    }

    pub fn children(&self) -> &[EvaluationContext<'a>] {
        &self.children
    }

    /// Typed locals with initializers met in this context and its
    /// children, in evaluation order.
    pub fn local_inits(&self) -> Vec<&LocalInit> {
        let mut out: Vec<&LocalInit> = self.local_inits.iter().collect();
        for child in &self.children {
            out.extend(child.local_inits());
        }
        out
    }

    pub fn is_reporting(&self) -> bool {
        self.diagnostics.is_some()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_deref().unwrap_or(&[])
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// `Void` without returns, otherwise the common type of every return.
    pub fn return_type(&self) -> TypeResult {
        let mut returns = self.returns.iter();
        let Some(first) = returns.next() else {
            return TypeResult::void();
        };
        let ty = returns.fold(first.ty.ty.clone(), |acc, r| unify(&acc, &r.ty.ty));
        if self.returns.len() == 1 { first.ty.clone() } else { TypeResult::new(ty) }
    }

    /// Type of a local or parameter visible at this point.
    pub fn local_type(&self, name: &str) -> Option<&TypeResult> {
        self.scopes.iter().rev().find_map(|scope| scope.iter().rev().find(|(n, _)| n == name).map(|(_, t)| t))
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if let Some(diagnostics) = &mut self.diagnostics {
            diagnostics.push(diagnostic);
        }
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub(crate) fn declare(&mut self, name: impl Into<String>, ty: TypeResult) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name.into(), ty));
        }
    }

    /// Overwrite the innermost visible binding of `name`. Returns false when
    /// `name` is not a local.
    pub(crate) fn assign_local(&mut self, name: &str, ty: TypeResult) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.iter_mut().rev().find(|(n, _)| n == name) {
                slot.1 = ty;
                return true;
            }
        }
        false
    }

    /// Every visible local, outermost first, for snapshotting into a child.
    pub(crate) fn visible_locals(&self) -> Vec<(String, TypeResult)> {
        self.scopes.iter().flatten().cloned().collect()
    }

    pub(crate) fn record_local_init(&mut self, local: LocalInit) {
        self.local_inits.push(local);
    }

    pub(crate) fn add_return(&mut self, info: ReturnInfo) {
        self.returns.push(info);
    }

    pub(crate) fn queue_lambda(&mut self, lambda: PendingLambda<'a>) {
        self.lambdas.push(lambda);
    }

    pub(crate) fn take_lambdas(&mut self) -> Vec<PendingLambda<'a>> {
        std::mem::take(&mut self.lambdas)
    }

    pub(crate) fn add_child(&mut self, child: EvaluationContext<'a>) {
        self.children.push(child);
    }
}

/// The type a `for` loop variable takes when iterating over `ty`.
pub(crate) fn iteration_type(ty: &Type) -> Type {
    match ty {
        Type::Dynamic => Type::Dynamic,
        Type::ClassInstance { class, generics } => match (class.name(), generics.as_slice()) {
            ("Array" | "Iterator" | "Iterable" | "List", [elem]) => elem.clone(),
            ("IntIterator", []) => Type::int(),
            (name, [_, value]) if name.ends_with("Map") => value.clone(),
            _ => Type::Unknown,
        },
        _ => Type::Unknown,
    }
}
