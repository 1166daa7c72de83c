use std::sync::Arc;

use super::{ClassId, Project};
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::typeck::types::{ClassDescriptor, ClassRef, Type};

/// Read-only view of a class-like declaration.
#[derive(Clone, Copy)]
pub struct ClassHandle<'p> {
    project: &'p Project,
    id: ClassId,
}

impl std::fmt::Debug for ClassHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClassHandle({})", self.qualified_name())
    }
}

impl PartialEq for ClassHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.project, other.project)
    }
}

impl<'p> ClassHandle<'p> {
    pub(crate) fn new(project: &'p Project, id: ClassId) -> Self {
        Self { project, id }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn project(&self) -> &'p Project {
        self.project
    }

    pub fn spanned_decl(&self) -> &'p Spanned<TypeDecl> {
        let entry = self.project.entry(self.id);
        &self.project.modules()[entry.module].types[entry.decl]
    }

    pub fn decl(&self) -> &'p TypeDecl {
        &self.spanned_decl().node
    }

    pub fn span(&self) -> Span {
        self.spanned_decl().span
    }

    pub fn name(&self) -> &'p str {
        &self.decl().name.node
    }

    pub fn name_span(&self) -> Span {
        self.decl().name.span
    }

    pub fn qualified_name(&self) -> &'p str {
        &self.project.entry(self.id).qualified_name
    }

    pub fn module_index(&self) -> usize {
        self.project.entry(self.id).module
    }

    pub fn module(&self) -> &'p Module {
        self.project.module(self.module_index())
    }

    pub fn descriptor(&self) -> &'p Arc<ClassDescriptor> {
        &self.project.entry(self.id).descriptor
    }

    pub fn kind(&self) -> TypeDeclKind {
        self.decl().kind
    }

    pub fn is_class(&self) -> bool {
        self.kind() == TypeDeclKind::Class
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == TypeDeclKind::Interface
    }

    pub fn is_typedef(&self) -> bool {
        self.kind() == TypeDeclKind::Typedef
    }

    pub fn is_enum(&self) -> bool {
        self.kind() == TypeDeclKind::Enum
    }

    pub fn is_enum_abstract(&self) -> bool {
        self.decl().is_enum_abstract()
    }

    pub fn is_anonymous(&self) -> bool {
        self.decl().is_anonymous()
    }

    pub fn is_extern(&self) -> bool {
        self.decl().modifiers.has(Modifier::Extern)
    }

    pub fn generic_params(&self) -> &'p [GenericParam] {
        &self.decl().generic_params
    }

    pub fn parent_class(&self) -> Option<ClassHandle<'p>> {
        self.project.entry(self.id).parent.map(|id| ClassHandle::new(self.project, id))
    }

    /// Interfaces this class implements, or that this interface extends.
    pub fn implementing_interfaces(&self) -> Vec<ClassHandle<'p>> {
        self.project
            .entry(self.id)
            .interfaces
            .iter()
            .map(|id| ClassHandle::new(self.project, *id))
            .collect()
    }

    /// Superclasses, nearest first, stopping at a heritage cycle.
    pub fn superclass_chain(&self) -> Vec<ClassHandle<'p>> {
        let mut chain: Vec<ClassHandle<'p>> = Vec::new();
        let mut current = self.parent_class();
        while let Some(class) = current {
            if class == *self || chain.contains(&class) {
                break;
            }
            chain.push(class);
            current = class.parent_class();
        }
        chain
    }

    pub fn members(&self) -> impl Iterator<Item = MemberHandle<'p>> + use<'p> {
        let class = *self;
        self.decl().members.iter().enumerate().map(move |(index, member)| match member {
            Member::Field(_) => MemberHandle::Field(FieldHandle { class, index }),
            Member::Method(_) => MemberHandle::Method(MethodHandle { class, index }),
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodHandle<'p>> + use<'p> {
        self.members().filter_map(|m| match m {
            MemberHandle::Method(m) => Some(m),
            MemberHandle::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldHandle<'p>> + use<'p> {
        self.members().filter_map(|m| match m {
            MemberHandle::Field(f) => Some(f),
            MemberHandle::Method(_) => None,
        })
    }

    pub fn method(&self, name: &str) -> Option<MethodHandle<'p>> {
        self.methods().find(|m| m.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<FieldHandle<'p>> {
        self.fields().find(|f| f.name() == name)
    }

    pub fn constructor(&self) -> Option<MethodHandle<'p>> {
        self.method("new")
    }

    /// First method named `name`, on this class and then (optionally) on the
    /// superclass chain. Interfaces are not searched.
    pub fn find_methods_by_name(&self, name: &str, include_ancestors: bool) -> Option<MethodHandle<'p>> {
        if let Some(m) = self.method(name) {
            return Some(m);
        }
        if !include_ancestors {
            return None;
        }
        self.superclass_chain().into_iter().find_map(|c| c.method(name))
    }

    /// First field named `name` declared by a superclass.
    pub fn find_field_in_ancestors(&self, name: &str) -> Option<FieldHandle<'p>> {
        self.superclass_chain().into_iter().find_map(|c| c.field(name))
    }

    /// Member lookup through the superclass chain and then implemented interfaces.
    pub fn find_member(&self, name: &str) -> Option<MemberHandle<'p>> {
        let mut queue = vec![*self];
        let mut seen: Vec<ClassHandle<'p>> = Vec::new();
        let mut i = 0;
        while i < queue.len() {
            let class = queue[i];
            i += 1;
            if seen.contains(&class) {
                continue;
            }
            seen.push(class);
            if let Some(member) = class.members().find(|m| m.name() == name) {
                return Some(member);
            }
            queue.extend(class.parent_class());
            queue.extend(class.implementing_interfaces());
        }
        None
    }

    pub fn enum_values(&self) -> impl Iterator<Item = EnumValueHandle<'p>> + use<'p> {
        let class = *self;
        (0..self.decl().enum_values.len()).map(move |index| EnumValueHandle { class, index })
    }

    pub fn enum_value(&self, name: &str) -> Option<EnumValueHandle<'p>> {
        self.enum_values().find(|v| v.name() == name)
    }

    /// The type of `this` inside the class: its own parameters left unbound.
    pub fn instance_type(&self) -> Type {
        Type::class(
            ClassRef::Resolved(self.descriptor().clone()),
            self.generic_params().iter().map(|g| Type::named(g.name.node.clone())).collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberHandle<'p> {
    Field(FieldHandle<'p>),
    Method(MethodHandle<'p>),
}

impl<'p> MemberHandle<'p> {
    pub fn name(&self) -> &'p str {
        match self {
            MemberHandle::Field(f) => f.name(),
            MemberHandle::Method(m) => m.name(),
        }
    }

    pub fn name_span(&self) -> Span {
        match self {
            MemberHandle::Field(f) => f.name_span(),
            MemberHandle::Method(m) => m.name_span(),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            MemberHandle::Field(f) => f.is_static(),
            MemberHandle::Method(m) => m.is_static(),
        }
    }

    pub fn containing_class(&self) -> ClassHandle<'p> {
        match self {
            MemberHandle::Field(f) => f.containing_class(),
            MemberHandle::Method(m) => m.containing_class(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodHandle<'p> {
    class: ClassHandle<'p>,
    index: usize,
}

impl<'p> MethodHandle<'p> {
    pub fn spanned(&self) -> &'p Spanned<MethodDecl> {
        match &self.class.decl().members[self.index] {
            Member::Method(m) => m,
            Member::Field(_) => unreachable!("method handle points at a field"),
        }
    }

    pub fn decl(&self) -> &'p MethodDecl {
        &self.spanned().node
    }

    pub fn span(&self) -> Span {
        self.spanned().span
    }

    pub fn name(&self) -> &'p str {
        &self.decl().name.node
    }

    pub fn name_span(&self) -> Span {
        self.decl().name.span
    }

    pub fn containing_class(&self) -> ClassHandle<'p> {
        self.class
    }

    pub fn modifiers(&self) -> &'p Modifiers {
        &self.decl().modifiers
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers().has(modifier)
    }

    pub fn is_static(&self) -> bool {
        self.has_modifier(Modifier::Static)
    }

    pub fn is_override(&self) -> bool {
        self.has_modifier(Modifier::Override)
    }

    pub fn is_constructor(&self) -> bool {
        self.name() == "new"
    }

    pub fn is_static_init(&self) -> bool {
        self.name() == "__init__"
    }

    pub fn visibility(&self) -> Visibility {
        // interface members are implicitly public
        if self.class.is_interface() { Visibility::Public } else { self.modifiers().visibility() }
    }

    pub fn params(&self) -> impl Iterator<Item = ParamHandle<'p>> + use<'p> {
        self.decl().params.iter().enumerate().map(|(position, param)| ParamHandle { param, position })
    }

    pub fn param_count(&self) -> usize {
        self.decl().params.len()
    }

    pub fn generic_params(&self) -> &'p [GenericParam] {
        &self.decl().generic_params
    }

    pub fn return_tag(&self) -> Option<&'p Spanned<TypeTag>> {
        self.decl().return_tag.as_ref()
    }

    pub fn body(&self) -> Option<&'p Spanned<Expr>> {
        self.decl().body.as_ref()
    }

    /// `name(a:Int, ?b:String):Void`, from the declared tags.
    pub fn presentable_text(&self) -> String {
        let params: Vec<String> = self.params().map(|p| p.presentable_text()).collect();
        let ret = self.return_tag().map(|t| format!(":{}", t.node)).unwrap_or_default();
        format!("{}({}){ret}", self.name(), params.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldHandle<'p> {
    class: ClassHandle<'p>,
    index: usize,
}

impl<'p> FieldHandle<'p> {
    pub fn spanned(&self) -> &'p Spanned<FieldDecl> {
        match &self.class.decl().members[self.index] {
            Member::Field(f) => f,
            Member::Method(_) => unreachable!("field handle points at a method"),
        }
    }

    pub fn decl(&self) -> &'p FieldDecl {
        &self.spanned().node
    }

    pub fn span(&self) -> Span {
        self.spanned().span
    }

    pub fn name(&self) -> &'p str {
        &self.decl().name.node
    }

    pub fn name_span(&self) -> Span {
        self.decl().name.span
    }

    pub fn containing_class(&self) -> ClassHandle<'p> {
        self.class
    }

    pub fn modifiers(&self) -> &'p Modifiers {
        &self.decl().modifiers
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().has(Modifier::Static)
    }

    pub fn is_inline(&self) -> bool {
        self.modifiers().has(Modifier::Inline)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers().has_any(&[Modifier::Final, Modifier::FinalMeta])
    }

    pub fn visibility(&self) -> Visibility {
        if self.class.is_interface() { Visibility::Public } else { self.modifiers().visibility() }
    }

    pub fn accessors(&self) -> Option<&'p PropertyAccessors> {
        self.decl().accessors.as_ref()
    }

    pub fn is_property(&self) -> bool {
        self.accessors().is_some()
    }

    /// Has physical storage: a plain variable, a property with a `default`
    /// or `null` accessor, or one marked `@:isVar`.
    pub fn is_real_var(&self) -> bool {
        match self.accessors() {
            None => true,
            Some(acc) => {
                self.modifiers().has(Modifier::IsVar)
                    || [&acc.getter.node, &acc.setter.node]
                        .iter()
                        .any(|a| matches!(a, Accessor::Default | Accessor::Null))
            }
        }
    }

    pub fn type_tag(&self) -> Option<&'p Spanned<TypeTag>> {
        self.decl().type_tag.as_ref()
    }

    pub fn init(&self) -> Option<&'p Spanned<Expr>> {
        self.decl().init.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamHandle<'p> {
    param: &'p Param,
    position: usize,
}

impl<'p> ParamHandle<'p> {
    pub fn new(param: &'p Param, position: usize) -> Self {
        Self { param, position }
    }

    pub fn param(&self) -> &'p Param {
        self.param
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &'p str {
        &self.param.name.node
    }

    pub fn name_span(&self) -> Span {
        self.param.name.span
    }

    pub fn span(&self) -> Span {
        self.param.span
    }

    pub fn has_optional_marker(&self) -> bool {
        self.param.optional.is_some()
    }

    pub fn is_optional(&self) -> bool {
        self.param.is_optional()
    }

    pub fn type_tag(&self) -> Option<&'p Spanned<TypeTag>> {
        self.param.type_tag.as_ref()
    }

    pub fn default(&self) -> Option<&'p Spanned<Expr>> {
        self.param.default.as_ref()
    }

    /// `?name:Type` as declared.
    pub fn presentable_text(&self) -> String {
        let mark = if self.has_optional_marker() { "?" } else { "" };
        match self.type_tag() {
            Some(tag) => format!("{mark}{}:{}", self.name(), tag.node),
            None => format!("{mark}{}", self.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumValueHandle<'p> {
    class: ClassHandle<'p>,
    index: usize,
}

impl<'p> EnumValueHandle<'p> {
    pub fn spanned(&self) -> &'p Spanned<EnumValueDecl> {
        &self.class.decl().enum_values[self.index]
    }

    pub fn decl(&self) -> &'p EnumValueDecl {
        &self.spanned().node
    }

    pub fn name(&self) -> &'p str {
        &self.decl().name.node
    }

    pub fn enum_class(&self) -> ClassHandle<'p> {
        self.class
    }

    pub fn params(&self) -> impl Iterator<Item = ParamHandle<'p>> + use<'p> {
        self.decl().params.iter().enumerate().map(|(position, param)| ParamHandle { param, position })
    }

    pub fn generic_params(&self) -> &'p [GenericParam] {
        &self.decl().generic_params
    }

    pub fn return_tag(&self) -> Option<&'p Spanned<TypeTag>> {
        self.decl().return_tag.as_ref()
    }
}
