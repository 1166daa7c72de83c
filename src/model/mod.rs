//! Immutable index over parsed modules: class ids, qualified names, parent
//! and interface links, and type-name resolution.

pub mod handles;

use std::collections::HashMap;
use std::sync::Arc;

use crate::parser::ast::{Module, TypeDecl, TypeDeclKind, TypeTag};
use crate::span::Spanned;
use crate::typeck::types::{ClassDescriptor, ClassKind};

pub use handles::{ClassHandle, EnumValueHandle, FieldHandle, MemberHandle, MethodHandle, ParamHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

#[derive(Debug)]
pub(crate) struct ClassEntry {
    pub module: usize,
    pub decl: usize,
    pub qualified_name: String,
    pub descriptor: Arc<ClassDescriptor>,
    pub parent: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
}

#[derive(Debug, Default)]
pub struct Project {
    modules: Vec<Module>,
    classes: Vec<ClassEntry>,
    by_qualified: HashMap<String, ClassId>,
}

impl Project {
    pub fn new(modules: Vec<Module>) -> Self {
        let mut project = Project { modules, classes: Vec::new(), by_qualified: HashMap::new() };
        project.register_classes();
        project.link_heritage();
        project.build_descriptors();
        project
    }

    fn register_classes(&mut self) {
        for (module_idx, module) in self.modules.iter().enumerate() {
            let package = module.package_name();
            for (decl_idx, decl) in module.types.iter().enumerate() {
                let qualified_name = qualify(package, &decl.node.name.node);
                let id = ClassId(self.classes.len() as u32);
                // First declaration wins for duplicate qualified names.
                self.by_qualified.entry(qualified_name.clone()).or_insert(id);
                self.classes.push(ClassEntry {
                    module: module_idx,
                    decl: decl_idx,
                    qualified_name,
                    descriptor: Arc::new(ClassDescriptor::structural(Vec::new())),
                    parent: None,
                    interfaces: Vec::new(),
                });
            }
        }
    }

    fn link_heritage(&mut self) {
        for idx in 0..self.classes.len() {
            let (module, decl) = (self.classes[idx].module, self.classes[idx].decl);
            let decl = &self.modules[module].types[decl].node;
            let resolve = |tag: &Spanned<TypeTag>| match &tag.node {
                TypeTag::Named { path, .. } => self.resolve_type_name(&path.node, Some(module)),
                _ => None,
            };
            let (parent, interfaces) = match decl.kind {
                TypeDeclKind::Class => (
                    decl.extends.first().and_then(resolve),
                    decl.implements.iter().filter_map(resolve).collect(),
                ),
                TypeDeclKind::Interface => (None, decl.extends.iter().filter_map(resolve).collect()),
                _ => (None, Vec::new()),
            };
            self.classes[idx].parent = parent;
            self.classes[idx].interfaces = interfaces;
        }
    }

    fn build_descriptors(&mut self) {
        for idx in 0..self.classes.len() {
            let id = ClassId(idx as u32);
            let decl = self.decl_of(id);
            let descriptor = ClassDescriptor {
                name: decl.name.node.clone(),
                qualified_name: self.classes[idx].qualified_name.clone(),
                kind: match decl.kind {
                    TypeDeclKind::Class => ClassKind::Class,
                    TypeDeclKind::Interface => ClassKind::Interface,
                    TypeDeclKind::Typedef => ClassKind::Typedef,
                    TypeDeclKind::Enum => ClassKind::Enum,
                    TypeDeclKind::Abstract => ClassKind::Abstract,
                },
                ancestors: self.collect_ancestors(id),
                type_params: decl.generic_params.iter().map(|g| g.name.node.clone()).collect(),
                members: Vec::new(),
                id: Some(id),
            };
            self.classes[idx].descriptor = Arc::new(descriptor);
        }
    }

    /// Qualified names of all superclasses and interfaces.
    fn collect_ancestors(&self, id: ClassId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut stack = vec![id];
        let mut seen = vec![id];
        while let Some(current) = stack.pop() {
            let entry = &self.classes[current.0 as usize];
            // Parent pushed last so the superclass chain is walked first.
            for next in entry.interfaces.iter().rev().chain(entry.parent.iter()) {
                if seen.contains(next) {
                    continue;
                }
                seen.push(*next);
                out.push(self.classes[next.0 as usize].qualified_name.clone());
                stack.push(*next);
            }
        }
        out
    }

    pub(crate) fn entry(&self, id: ClassId) -> &ClassEntry {
        &self.classes[id.0 as usize]
    }

    pub(crate) fn decl_of(&self, id: ClassId) -> &TypeDecl {
        let entry = self.entry(id);
        &self.modules[entry.module].types[entry.decl].node
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, idx: usize) -> &Module {
        &self.modules[idx]
    }

    pub fn class(&self, id: ClassId) -> ClassHandle<'_> {
        ClassHandle::new(self, id)
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassHandle<'_>> {
        (0..self.classes.len()).map(move |i| ClassHandle::new(self, ClassId(i as u32)))
    }

    /// Classes declared in the given module, in source order.
    pub fn classes_in_module(&self, module: usize) -> impl Iterator<Item = ClassHandle<'_>> {
        self.classes().filter(move |c| c.module_index() == module)
    }

    pub fn class_by_qualified_name(&self, name: &str) -> Option<ClassHandle<'_>> {
        self.by_qualified.get(name).map(|id| self.class(*id))
    }

    /// Resolve a type name as seen from `module`: same module, explicit
    /// import, wildcard import, same package, top-level package, then the
    /// name taken as fully qualified.
    pub fn resolve_type_name(&self, name: &str, module: Option<usize>) -> Option<ClassId> {
        if let Some(module_idx) = module {
            let module = &self.modules[module_idx];
            if !name.contains('.') {
                if let Some(decl_idx) = module.types.iter().position(|t| t.node.name.node == name) {
                    return self
                        .classes
                        .iter()
                        .position(|c| c.module == module_idx && c.decl == decl_idx)
                        .map(|i| ClassId(i as u32));
                }
                for import in module.imports.iter().filter(|i| !i.node.wildcard) {
                    if import.node.binding_name() == name {
                        if let Some(id) = self.by_qualified.get(&import.node.path.node) {
                            return Some(*id);
                        }
                    }
                }
                for import in module.imports.iter().filter(|i| i.node.wildcard) {
                    if let Some(id) = self.by_qualified.get(&qualify(&import.node.path.node, name)) {
                        return Some(*id);
                    }
                }
                let package = module.package_name();
                if !package.is_empty() {
                    if let Some(id) = self.by_qualified.get(&qualify(package, name)) {
                        return Some(*id);
                    }
                }
            }
        }
        self.by_qualified.get(name).copied()
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() { name.to_string() } else { format!("{package}.{name}") }
}
