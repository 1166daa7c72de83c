use super::types::{FnArg, Type, TypeResult};

/// Bindings of type-parameter names to concrete types, scoped to one
/// inference request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericResolver {
    bindings: Vec<(String, TypeResult)>,
}

impl GenericResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a class instance's declared parameters to its concrete arguments:
    /// `Container<String>` binds `T -> String`. Missing arguments stay unbound.
    pub fn for_instance(ty: &Type) -> Self {
        let mut resolver = Self::new();
        if let Type::ClassInstance { class, generics } = ty {
            if let Some(desc) = class.descriptor() {
                for (name, arg) in desc.type_params.iter().zip(generics) {
                    resolver.add(name.clone(), TypeResult::new(arg.clone()));
                }
            }
        }
        resolver
    }

    pub fn resolve(&self, name: &str) -> Option<TypeResult> {
        self.bindings.iter().rev().find(|(n, _)| n == name).map(|(_, r)| r.clone())
    }

    /// Bind `name`, replacing any earlier binding.
    pub fn add(&mut self, name: impl Into<String>, result: TypeResult) {
        let name = name.into();
        self.bindings.retain(|(n, _)| *n != name);
        self.bindings.push((name, result));
    }

    pub fn with(mut self, name: impl Into<String>, result: TypeResult) -> Self {
        self.add(name, result);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(n, _)| n.as_str())
    }

    pub fn propagate_generics_to_type(&self, ty: &Type) -> Type {
        propagate_generics_to_type(ty, self)
    }
}

/// Rewrite generic arguments that still refer to type parameters by name.
///
/// Arguments bound by `resolver` are substituted. Arguments naming one of
/// the instantiated class's own parameters but left unbound fall back to
/// `Unknown`. Everything else is kept, recursing into nested generics and
/// function signatures.
pub fn propagate_generics_to_type(ty: &Type, resolver: &GenericResolver) -> Type {
    match ty {
        Type::ClassInstance { class, generics } => {
            let own_params: &[String] = class.descriptor().map(|d| d.type_params.as_slice()).unwrap_or(&[]);
            let generics = generics
                .iter()
                .map(|arg| match arg.as_type_param() {
                    Some(name) => match resolver.resolve(name) {
                        Some(bound) => bound.ty,
                        None if own_params.iter().any(|p| p == name) => Type::Unknown,
                        None => arg.clone(),
                    },
                    None => propagate_generics_to_type(arg, resolver),
                })
                .collect();
            Type::ClassInstance { class: class.clone(), generics }
        }
        Type::Function { params, ret } => Type::Function {
            params: params.iter().map(|p| FnArg { ty: substitute(&p.ty, resolver), ..p.clone() }).collect(),
            ret: Box::new(substitute(ret, resolver)),
        },
        _ => ty.clone(),
    }
}

/// A bare parameter reference becomes its binding; anything else is propagated.
pub(crate) fn substitute(ty: &Type, resolver: &GenericResolver) -> Type {
    if let Some(bound) = ty.as_type_param().and_then(|name| resolver.resolve(name)) {
        return bound.ty;
    }
    propagate_generics_to_type(ty, resolver)
}
