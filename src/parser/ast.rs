use std::path::PathBuf;

use serde::Serialize;

use crate::span::{Span, Spanned};

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub file_id: u32,
    pub path: Option<PathBuf>,
    pub package: Option<Spanned<PackageDecl>>,
    pub imports: Vec<Spanned<ImportDecl>>,
    pub types: Vec<Spanned<TypeDecl>>,
}

impl Module {
    /// Dotted package name, empty for the top-level package.
    pub fn package_name(&self) -> &str {
        self.package
            .as_ref()
            .and_then(|p| p.node.path.as_ref())
            .map(|p| p.node.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct PackageDecl {
    /// `None` for a bare `package;`.
    pub path: Option<Spanned<String>>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Spanned<String>,
    pub wildcard: bool,
}

impl ImportDecl {
    /// The simple name an explicit import makes visible.
    pub fn binding_name(&self) -> &str {
        self.path.node.rsplit('.').next().unwrap_or(&self.path.node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDeclKind {
    Class,
    Interface,
    Typedef,
    Enum,
    Abstract,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeDeclKind,
    pub name: Spanned<String>,
    pub modifiers: Modifiers,
    pub generic_params: Vec<GenericParam>,
    pub extends: Vec<Spanned<TypeTag>>,
    pub implements: Vec<Spanned<TypeTag>>,
    pub members: Vec<Member>,
    pub enum_values: Vec<Spanned<EnumValueDecl>>,
    /// Typedef target, or the underlying type of an abstract.
    pub alias: Option<Spanned<TypeTag>>,
}

impl TypeDecl {
    pub fn is_enum_abstract(&self) -> bool {
        self.kind == TypeDeclKind::Abstract && self.modifiers.has(Modifier::EnumAbstract)
    }

    /// A typedef whose target is an anonymous structure.
    pub fn is_anonymous(&self) -> bool {
        self.kind == TypeDeclKind::Typedef
            && matches!(self.alias.as_ref().map(|a| &a.node), Some(TypeTag::Anonymous(_)))
    }
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: Spanned<String>,
    pub constraints: Vec<Spanned<TypeTag>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Public,
    Private,
    Static,
    Inline,
    Override,
    Final,
    /// `@:final`
    FinalMeta,
    Extern,
    Dynamic,
    Macro,
    /// `@:isVar`
    IsVar,
    /// `enum abstract` / `@:enum`
    EnumAbstract,
}

impl Modifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Static => "static",
            Modifier::Inline => "inline",
            Modifier::Override => "override",
            Modifier::Final => "final",
            Modifier::FinalMeta => "@:final",
            Modifier::Extern => "extern",
            Modifier::Dynamic => "dynamic",
            Modifier::Macro => "macro",
            Modifier::IsVar => "@:isVar",
            Modifier::EnumAbstract => "@:enum",
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Ordered so that `Private < Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn modifier(self) -> Modifier {
        match self {
            Visibility::Private => Modifier::Private,
            Visibility::Public => Modifier::Public,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Modifiers {
    pub items: Vec<Spanned<Modifier>>,
}

impl Modifiers {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.items.iter().any(|m| m.node == modifier)
    }

    pub fn has_any(&self, modifiers: &[Modifier]) -> bool {
        modifiers.iter().any(|m| self.has(*m))
    }

    pub fn span_of(&self, modifier: Modifier) -> Option<Span> {
        self.items.iter().find(|m| m.node == modifier).map(|m| m.span)
    }

    /// Members are private unless marked `public`.
    pub fn visibility(&self) -> Visibility {
        if self.has(Modifier::Public) { Visibility::Public } else { Visibility::Private }
    }
}

#[derive(Debug, Clone)]
pub enum Member {
    Field(Spanned<FieldDecl>),
    Method(Spanned<MethodDecl>),
}

impl Member {
    pub fn name(&self) -> &Spanned<String> {
        match self {
            Member::Field(f) => &f.node.name,
            Member::Method(m) => &m.node.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Member::Field(f) => f.span,
            Member::Method(m) => m.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Spanned<String>,
    pub modifiers: Modifiers,
    pub accessors: Option<PropertyAccessors>,
    pub type_tag: Option<Spanned<TypeTag>>,
    pub init: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone)]
pub struct PropertyAccessors {
    pub getter: Spanned<Accessor>,
    pub setter: Spanned<Accessor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    Default,
    Null,
    Get,
    Set,
    Never,
    Dynamic,
    Other(String),
}

impl Accessor {
    pub fn is_valid_getter(&self) -> bool {
        matches!(self, Accessor::Default | Accessor::Null | Accessor::Get | Accessor::Never | Accessor::Dynamic)
    }

    pub fn is_valid_setter(&self) -> bool {
        matches!(self, Accessor::Default | Accessor::Null | Accessor::Set | Accessor::Never | Accessor::Dynamic)
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: Spanned<String>,
    pub modifiers: Modifiers,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub return_tag: Option<Spanned<TypeTag>>,
    pub body: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    /// Span of the `?` marker, when present.
    pub optional: Option<Span>,
    pub type_tag: Option<Spanned<TypeTag>>,
    pub default: Option<Spanned<Expr>>,
    pub span: Span,
}

impl Param {
    /// Optional either by marker or by carrying a default value.
    pub fn is_optional(&self) -> bool {
        self.optional.is_some() || self.default.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct EnumValueDecl {
    pub name: Spanned<String>,
    pub generic_params: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub return_tag: Option<Spanned<TypeTag>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    Named {
        path: Spanned<String>,
        args: Vec<Spanned<TypeTag>>,
    },
    Function {
        params: Vec<FunctionTagParam>,
        ret: Option<Box<Spanned<TypeTag>>>,
    },
    Anonymous(Vec<AnonField>),
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::Named { path, args } => {
                write!(f, "{}", path.node)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a.node)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeTag::Function { params, ret } => {
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
                    write!(f, "{}", p.ty.node)?;
                }
                match ret {
                    Some(ret) => write!(f, " -> {}", ret.node),
                    None => Ok(()),
                }
            }
            TypeTag::Anonymous(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if field.optional {
                        write!(f, "?")?;
                    }
                    write!(f, "{}", field.name.node)?;
                    if let Some(ty) = &field.ty {
                        write!(f, " : {}", ty.node)?;
                    }
                }
                write!(f, " }}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTagParam {
    pub name: Option<Spanned<String>>,
    pub optional: bool,
    pub ty: Spanned<TypeTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonField {
    pub name: Spanned<String>,
    pub optional: bool,
    pub ty: Option<Spanned<TypeTag>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(StringLit),
    Bool(bool),
    Null,
    Ident(String),
    This,
    Super,
    Field {
        object: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    New {
        class: Spanned<TypeTag>,
        args: Vec<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// `op` is `Some` for compound assignments such as `+=`.
    Assign {
        op: Option<BinOp>,
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Ternary {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },
    Paren(Box<Spanned<Expr>>),
    ArrayLit(Vec<Spanned<Expr>>),
    ObjectLit(Vec<(Spanned<String>, Spanned<Expr>)>),
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Function(Box<FunctionLiteral>),
    Cast {
        expr: Box<Spanned<Expr>>,
        ty: Option<Spanned<TypeTag>>,
    },
    Untyped(Box<Spanned<Expr>>),
    Block(Vec<Spanned<Expr>>),
    Var(Box<LocalVar>),
    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },
    While {
        cond: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
        do_while: bool,
    },
    For {
        var: Spanned<String>,
        iterable: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },
    Switch {
        subject: Box<Spanned<Expr>>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Spanned<Expr>>>,
    },
    Try {
        body: Box<Spanned<Expr>>,
        catches: Vec<CatchClause>,
    },
    Return(Option<Box<Spanned<Expr>>>),
    Break,
    Continue,
    Throw(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// Set for named local functions (`function helper() {}` inside a body).
    pub name: Option<Spanned<String>>,
    pub params: Vec<Param>,
    pub return_tag: Option<Spanned<TypeTag>>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub name: Spanned<String>,
    pub is_final: bool,
    pub type_tag: Option<Spanned<TypeTag>>,
    pub init: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub values: Vec<Spanned<Expr>>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub var: Spanned<String>,
    pub type_tag: Option<Spanned<TypeTag>>,
    pub body: Spanned<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub quote: Quote,
    pub parts: Vec<StringPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Lit(String),
    /// `$name` or `${expr}`; `raw` is the segment's source text.
    Interp { expr: Spanned<Expr>, raw: String },
}

impl StringLit {
    pub fn has_interpolation(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, StringPart::Interp { .. }))
    }

    /// The literal's runtime text when it is known without evaluation.
    /// Double-quoted strings never interpolate, so their segments are kept verbatim.
    pub fn constant_text(&self) -> Option<String> {
        if self.quote == Quote::Single && self.has_interpolation() {
            return None;
        }
        let mut out = String::new();
        for part in &self.parts {
            match part {
                StringPart::Lit(s) => out.push_str(s),
                StringPart::Interp { raw, .. } => out.push_str(raw),
            }
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}
