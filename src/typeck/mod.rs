//! Type inference: tag resolution, expression evaluation and declaration
//! types, driven by a per-strand `TypeResolver` session.

pub mod context;
pub mod decl;
pub mod enum_abstract;
mod eval;
pub mod generics;
pub mod tag;
pub mod types;

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Project;
use crate::span::Span;
use enum_abstract::{AbstractEnumRules, EnumAbstracts};
use types::TypeResult;

pub use context::{EvaluationContext, LocalInit, ReturnInfo};
pub use decl::{Declaration, GenericOwner};
pub use generics::{GenericResolver, propagate_generics_to_type};
pub use tag::TagScope;

/// Nesting limit for a single evaluation strand. Sized so a full strand
/// fits a 2 MiB thread stack in debug builds.
pub const MAX_EVAL_DEPTH: usize = 64;

/// Internal failure while inferring a type. Never escapes the public entry
/// points: the outermost call logs it and answers `Unknown`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalFault {
    #[error("evaluation nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("malformed syntax tree: {detail}")]
    Malformed { detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalKind {
    FieldType,
    MethodReturn,
    FunctionReturn,
    ParameterType,
}

/// Identity of one in-flight inference: the declaration or body span plus
/// what is being computed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvalKey {
    pub span: Span,
    pub kind: EvalKind,
}

impl EvalKey {
    pub fn new(span: Span, kind: EvalKind) -> Self {
        Self { span, kind }
    }
}

/// One analysis strand over an immutable project. Owns the recursion guard,
/// so strands never share inference state.
pub struct TypeResolver<'p> {
    project: &'p Project,
    rules: &'p dyn AbstractEnumRules,
    guard: Vec<EvalKey>,
    depth: usize,
    max_depth: usize,
}

impl<'p> TypeResolver<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self::with_rules(project, &EnumAbstracts)
    }

    pub fn with_rules(project: &'p Project, rules: &'p dyn AbstractEnumRules) -> Self {
        Self { project, rules, guard: Vec::new(), depth: 0, max_depth: MAX_EVAL_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    pub fn rules(&self) -> &'p dyn AbstractEnumRules {
        self.rules
    }

    /// Keys currently on the recursion guard. Zero between public calls.
    pub fn guard_depth(&self) -> usize {
        self.guard.len()
    }

    /// Run `f` with `key` on the recursion guard. Re-entering a key that is
    /// already in flight answers `Dynamic`.
    pub(crate) fn guarded(
        &mut self,
        key: EvalKey,
        f: impl FnOnce(&mut Self) -> Result<TypeResult, EvalFault>,
    ) -> Result<TypeResult, EvalFault> {
        if self.guard.contains(&key) {
            debug!(kind = ?key.kind, start = key.span.start, "recursive inference, answering Dynamic");
            return Ok(TypeResult::dynamic());
        }
        self.guard.push(key);
        let result = f(self);
        self.guard.pop();
        result
    }

    /// One nesting level of evaluation, bounded by `max_depth`.
    pub(crate) fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EvalFault>,
    ) -> Result<T, EvalFault> {
        if self.depth >= self.max_depth {
            return Err(EvalFault::DepthExceeded { limit: self.max_depth });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Public entry boundary: faults and panics become `fallback`, and the
    /// guard is restored to its entry state.
    pub(crate) fn boundary<T>(&mut self, fallback: T, f: impl FnOnce(&mut Self) -> Result<T, EvalFault>) -> T {
        let guard_len = self.guard.len();
        let depth = self.depth;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(fault)) => {
                warn!(%fault, "type inference aborted");
                self.guard.truncate(guard_len);
                self.depth = depth;
                fallback
            }
            Err(_) => {
                warn!("type inference panicked");
                self.guard.truncate(guard_len);
                self.depth = depth;
                fallback
            }
        }
    }
}
