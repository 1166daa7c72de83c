use std::sync::Arc;

use crate::model::ClassId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    UInt,
    Float,
    Bool,
    String,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(Primitive::Int),
            "UInt" => Some(Primitive::UInt),
            "Float" => Some(Primitive::Float),
            "Bool" => Some(Primitive::Bool),
            "String" => Some(Primitive::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "Int",
            Primitive::UInt => "UInt",
            Primitive::Float => "Float",
            Primitive::Bool => "Bool",
            Primitive::String => "String",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Primitive::Int | Primitive::UInt | Primitive::Float)
    }

    /// `self` slot accepts a `source` value, widening included.
    fn accepts(self, source: Primitive) -> bool {
        self == source
            || matches!(
                (self, source),
                (Primitive::Float, Primitive::Int)
                    | (Primitive::Float, Primitive::UInt)
                    | (Primitive::Int, Primitive::UInt)
                    | (Primitive::UInt, Primitive::Int)
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Typedef,
    Enum,
    Abstract,
    /// Synthesized from an anonymous structure type.
    Structural,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub optional: bool,
    pub ty: Option<Type>,
}

/// Immutable snapshot of a class-like declaration, shared by every type that
/// refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub name: String,
    pub qualified_name: String,
    pub kind: ClassKind,
    /// Qualified names of every superclass and implemented interface, transitively.
    pub ancestors: Vec<String>,
    pub type_params: Vec<String>,
    /// Only populated for structural descriptors.
    pub members: Vec<StructMember>,
    pub id: Option<ClassId>,
}

impl ClassDescriptor {
    pub fn structural(members: Vec<StructMember>) -> Self {
        Self {
            name: String::new(),
            qualified_name: String::new(),
            kind: ClassKind::Structural,
            ancestors: Vec::new(),
            type_params: Vec::new(),
            members,
            id: None,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.kind == ClassKind::Structural
    }

    pub fn has_ancestor(&self, qualified_name: &str) -> bool {
        self.ancestors.iter().any(|a| a == qualified_name)
    }

    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A class reference is either resolved to a descriptor or kept as the raw
/// textual name (unresolved classes and unbound type parameters).
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Resolved(Arc<ClassDescriptor>),
    Unresolved(String),
}

impl ClassRef {
    pub fn name(&self) -> &str {
        match self {
            ClassRef::Resolved(desc) => &desc.name,
            ClassRef::Unresolved(name) => name,
        }
    }

    pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
        match self {
            ClassRef::Resolved(desc) => Some(desc),
            ClassRef::Unresolved(_) => None,
        }
    }

    pub fn same_class(&self, other: &ClassRef) -> bool {
        match (self, other) {
            (ClassRef::Resolved(a), ClassRef::Resolved(b)) => {
                if a.is_structural() || b.is_structural() {
                    Arc::ptr_eq(a, b) || a == b
                } else {
                    a.qualified_name == b.qualified_name
                }
            }
            (ClassRef::Unresolved(a), ClassRef::Unresolved(b)) => a == b,
            _ => false,
        }
    }

    fn is_named(&self, name: &str) -> bool {
        matches!(self, ClassRef::Unresolved(n) if n == name)
            || matches!(self, ClassRef::Resolved(d) if d.qualified_name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnArg {
    pub position: usize,
    pub optional: bool,
    pub ty: Type,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Not enough information to decide.
    Unknown,
    /// The annotation itself is broken.
    Invalid,
    Dynamic,
    Void,
    Primitive(Primitive),
    ClassInstance { class: ClassRef, generics: Vec<Type> },
    Function { params: Vec<FnArg>, ret: Box<Type> },
    EnumValue { enum_ref: ClassRef, constructor: String },
}

impl Type {
    pub fn class(class: ClassRef, generics: Vec<Type>) -> Self {
        Type::ClassInstance { class, generics }
    }

    /// Textual reference, used for unresolved classes and unbound type parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Type::ClassInstance { class: ClassRef::Unresolved(name.into()), generics: Vec::new() }
    }

    pub fn int() -> Self {
        Type::Primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        Type::Primitive(Primitive::Float)
    }

    pub fn bool() -> Self {
        Type::Primitive(Primitive::Bool)
    }

    pub fn string() -> Self {
        Type::Primitive(Primitive::String)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// The textual name when this is an unresolved reference without arguments.
    pub fn as_type_param(&self) -> Option<&str> {
        match self {
            Type::ClassInstance { class: ClassRef::Unresolved(name), generics } if generics.is_empty() => Some(name),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
        match self {
            Type::ClassInstance { class, .. } => class.descriptor(),
            _ => None,
        }
    }

    /// Recursively transform all inner types via `f`, rebuilding the structure.
    pub fn map_inner_types(&self, f: &impl Fn(&Type) -> Type) -> Type {
        match self {
            Type::ClassInstance { class, generics } => Type::ClassInstance {
                class: class.clone(),
                generics: generics.iter().map(f).collect(),
            },
            Type::Function { params, ret } => Type::Function {
                params: params.iter().map(|p| FnArg { ty: f(&p.ty), ..p.clone() }).collect(),
                ret: Box::new(f(ret)),
            },
            _ => self.clone(),
        }
    }

    /// Number of parameters a call must supply.
    pub fn required_arity(&self) -> usize {
        match self {
            Type::Function { params, .. } => params.iter().filter(|p| !p.optional).count(),
            _ => 0,
        }
    }
}

/// `Null<T>` behaves as `T` for assignability.
fn strip_null(ty: &Type) -> &Type {
    match ty {
        Type::ClassInstance { class, generics } if generics.len() == 1 && class.is_named("Null") => {
            strip_null(&generics[0])
        }
        _ => ty,
    }
}

/// Whether a value of type `source` may be stored in a slot of type `target`.
pub fn can_assign(target: &Type, source: &Type) -> bool {
    let target = strip_null(target);
    let source = strip_null(source);
    match (target, source) {
        (Type::Dynamic, _) | (_, Type::Dynamic) => true,
        (Type::Unknown | Type::Invalid, _) | (_, Type::Unknown | Type::Invalid) => true,
        (Type::Void, Type::Void) => true,
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Function { params: tp, ret: tr }, Type::Function { params: sp, ret: sr }) => {
            let source_required = sp.iter().filter(|p| !p.optional).count();
            if source_required > tp.len() || tp.len() > sp.len() {
                return false;
            }
            let params_ok = tp.iter().zip(sp).all(|(t, s)| {
                can_assign(&s.ty, &t.ty) && (!t.optional || s.optional)
            });
            params_ok && can_assign(tr, sr)
        }
        (Type::ClassInstance { class: tc, generics: tg }, Type::ClassInstance { class: sc, generics: sg }) => {
            if let Some(desc) = tc.descriptor().filter(|d| d.is_structural()) {
                return structurally_assignable(desc, source);
            }
            if tc.same_class(sc) {
                return tg.is_empty()
                    || sg.is_empty()
                    || (tg.len() == sg.len() && tg.iter().zip(sg).all(|(t, s)| can_assign(t, s)));
            }
            match (tc.descriptor(), sc.descriptor()) {
                (Some(t), Some(s)) => s.has_ancestor(&t.qualified_name),
                _ => false,
            }
        }
        (Type::ClassInstance { class, .. }, Type::EnumValue { enum_ref, .. }) => class.same_class(enum_ref),
        (Type::EnumValue { enum_ref: a, constructor: ca }, Type::EnumValue { enum_ref: b, constructor: cb }) => {
            a.same_class(b) && ca == cb
        }
        (Type::Primitive(t), Type::Primitive(s)) => t.accepts(*s),
        _ => false,
    }
}

fn structurally_assignable(target: &ClassDescriptor, source: &Type) -> bool {
    let Type::ClassInstance { class, .. } = source else {
        return false;
    };
    let Some(source) = class.descriptor() else {
        return false;
    };
    // Nominal classes do not expose member types here; treat them as compatible.
    if !source.is_structural() {
        return true;
    }
    target.members.iter().all(|tm| match source.member(&tm.name) {
        None => tm.optional,
        Some(sm) => match (&tm.ty, &sm.ty) {
            (Some(t), Some(s)) => can_assign(t, s),
            _ => true,
        },
    })
}

/// Common supertype of two branch types.
pub fn unify(a: &Type, b: &Type) -> Type {
    if a.is_unknown() || a.is_invalid() {
        return b.clone();
    }
    if b.is_unknown() || b.is_invalid() {
        return a.clone();
    }
    if can_assign(a, b) {
        a.clone()
    } else if can_assign(b, a) {
        b.clone()
    } else {
        Type::Dynamic
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Unknown => write!(f, "Unknown"),
            Type::Invalid => write!(f, "Invalid"),
            Type::Dynamic => write!(f, "Dynamic"),
            Type::Void => write!(f, "Void"),
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::ClassInstance { class, generics } => {
                if let Some(desc) = class.descriptor().filter(|d| d.is_structural()) {
                    write!(f, "{{ ")?;
                    for (i, m) in desc.members.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        if m.optional {
                            write!(f, "?")?;
                        }
                        match &m.ty {
                            Some(ty) => write!(f, "{} : {ty}", m.name)?,
                            None => write!(f, "{}", m.name)?,
                        }
                    }
                    return write!(f, " }}");
                }
                write!(f, "{}", class.name())?;
                if !generics.is_empty() {
                    write!(f, "<")?;
                    for (i, g) in generics.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{g}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Function { params, ret } => {
                if params.is_empty() {
                    write!(f, "Void")?;
                }
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    if p.optional {
                        write!(f, "?")?;
                    }
                    if matches!(p.ty, Type::Function { .. }) {
                        write!(f, "({})", p.ty)?;
                    } else {
                        write!(f, "{}", p.ty)?;
                    }
                }
                write!(f, " -> {ret}")
            }
            Type::EnumValue { enum_ref, .. } => write!(f, "{}", enum_ref.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(n) => write!(f, "{n}"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Str(s) => write!(f, "\"{s}\""),
            Constant::Null => write!(f, "null"),
        }
    }
}

impl Constant {
    /// Text used when the constant is concatenated into a string.
    pub fn concat_text(&self) -> String {
        match self {
            Constant::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A type plus the compile-time constant it is known to hold, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeResult {
    pub ty: Type,
    pub constant: Option<Constant>,
}

impl TypeResult {
    pub fn new(ty: Type) -> Self {
        Self { ty, constant: None }
    }

    pub fn unknown() -> Self {
        Self::new(Type::Unknown)
    }

    pub fn invalid() -> Self {
        Self::new(Type::Invalid)
    }

    pub fn dynamic() -> Self {
        Self::new(Type::Dynamic)
    }

    pub fn void() -> Self {
        Self::new(Type::Void)
    }

    pub fn with_constant(self, constant: Constant) -> Self {
        Self { ty: self.ty, constant: Some(constant) }
    }

    pub fn without_constant(self) -> Self {
        Self { ty: self.ty, constant: None }
    }

    /// Re-tag with another type. The constant belonged to the old type and is dropped.
    pub fn with_type(self, ty: Type) -> Self {
        Self { ty, constant: None }
    }

    pub fn is_unknown(&self) -> bool {
        self.ty.is_unknown()
    }

    pub fn can_assign(&self, source: &TypeResult) -> bool {
        can_assign(&self.ty, &source.ty)
    }

    /// Type with its constant, e.g. `Int = 5`.
    pub fn describe(&self) -> String {
        match &self.constant {
            Some(c) => format!("{} = {c}", self.ty),
            None => self.ty.to_string(),
        }
    }
}

impl From<Type> for TypeResult {
    fn from(ty: Type) -> Self {
        TypeResult::new(ty)
    }
}

impl std::fmt::Display for TypeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ty)
    }
}
