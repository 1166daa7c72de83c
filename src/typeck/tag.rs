use std::sync::Arc;

use tracing::debug;

use crate::model::{ClassHandle, EnumValueHandle, MethodHandle};
use crate::parser::ast::{GenericParam, TypeTag};
use crate::span::Spanned;

use super::TypeResolver;
use super::generics::GenericResolver;
use super::types::{ClassDescriptor, ClassRef, FnArg, Primitive, StructMember, Type, TypeResult};

/// Typedef chains longer than this resolve to `Unknown`.
const MAX_TYPEDEF_DEPTH: usize = 16;

/// Where a tag is written: the module used for name lookup and the generic
/// parameters visible there.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagScope<'a> {
    pub module: Option<usize>,
    pub class_generics: &'a [GenericParam],
    pub method_generics: &'a [GenericParam],
}

impl<'a> TagScope<'a> {
    pub fn module(module: usize) -> Self {
        Self { module: Some(module), ..Self::default() }
    }

    pub fn for_class(class: ClassHandle<'a>) -> Self {
        Self {
            module: Some(class.module_index()),
            class_generics: class.generic_params(),
            method_generics: &[],
        }
    }

    pub fn for_method(method: MethodHandle<'a>) -> Self {
        Self::for_class(method.containing_class()).with_method_generics(method.generic_params())
    }

    pub fn for_enum_value(value: EnumValueHandle<'a>) -> Self {
        Self::for_class(value.enum_class()).with_method_generics(value.generic_params())
    }

    pub fn with_method_generics(self, generics: &'a [GenericParam]) -> Self {
        Self { method_generics: generics, ..self }
    }

    pub fn generic(&self, name: &str) -> Option<&'a GenericParam> {
        self.method_generics
            .iter()
            .chain(self.class_generics)
            .find(|g| g.name.node == name)
    }
}

impl<'p> TypeResolver<'p> {
    /// Resolve a written type annotation. Never fails: anything that cannot
    /// be resolved becomes a textual reference or `Unknown`.
    pub fn resolve_type_tag(&self, tag: &Spanned<TypeTag>, scope: &TagScope<'_>, resolver: &GenericResolver) -> TypeResult {
        self.resolve_tag_at(&tag.node, scope, resolver, 0)
    }

    /// Like `resolve_type_tag`, with an absent tag answering `Unknown`.
    pub fn resolve_optional_tag(
        &self,
        tag: Option<&Spanned<TypeTag>>,
        scope: &TagScope<'_>,
        resolver: &GenericResolver,
    ) -> TypeResult {
        match tag {
            Some(tag) => self.resolve_type_tag(tag, scope, resolver),
            None => TypeResult::unknown(),
        }
    }

    fn resolve_tag_at(&self, tag: &TypeTag, scope: &TagScope<'_>, resolver: &GenericResolver, depth: usize) -> TypeResult {
        if depth > MAX_TYPEDEF_DEPTH {
            debug!(%tag, "typedef expansion too deep");
            return TypeResult::unknown();
        }
        match tag {
            TypeTag::Named { path, args } => self.resolve_named(&path.node, args, scope, resolver, depth),
            TypeTag::Function { params, ret } => {
                let mut args: Vec<FnArg> = params
                    .iter()
                    .enumerate()
                    .map(|(position, p)| FnArg {
                        position,
                        optional: p.optional,
                        ty: self.resolve_tag_at(&p.ty.node, scope, resolver, depth + 1).ty,
                        name: p.name.as_ref().map(|n| n.node.clone()),
                    })
                    .collect();
                if args.len() == 1 && args[0].ty.is_void() {
                    args.clear();
                }
                let ret = match ret {
                    Some(ret) => self.resolve_tag_at(&ret.node, scope, resolver, depth + 1).ty,
                    None => Type::Invalid,
                };
                TypeResult::new(Type::Function { params: args, ret: Box::new(ret) })
            }
            TypeTag::Anonymous(fields) => {
                let members = fields
                    .iter()
                    .map(|f| StructMember {
                        name: f.name.node.clone(),
                        optional: f.optional,
                        ty: f.ty.as_ref().map(|t| self.resolve_tag_at(&t.node, scope, resolver, depth + 1).ty),
                    })
                    .collect();
                TypeResult::new(Type::class(ClassRef::Resolved(Arc::new(ClassDescriptor::structural(members))), Vec::new()))
            }
        }
    }

    fn resolve_named(
        &self,
        name: &str,
        args: &[Spanned<TypeTag>],
        scope: &TagScope<'_>,
        resolver: &GenericResolver,
        depth: usize,
    ) -> TypeResult {
        if args.is_empty() {
            if let Some(bound) = resolver.resolve(name) {
                return bound;
            }
        }
        if scope.generic(name).is_some() {
            return TypeResult::new(Type::named(name));
        }
        match name {
            "Void" => return TypeResult::void(),
            "Dynamic" => return TypeResult::dynamic(),
            _ => {}
        }
        if let Some(p) = Primitive::from_name(name) {
            return TypeResult::new(Type::Primitive(p));
        }

        let generics: Vec<Type> = args
            .iter()
            .map(|a| self.resolve_tag_at(&a.node, scope, resolver, depth + 1).ty)
            .collect();
        let Some(id) = self.project.resolve_type_name(name, scope.module) else {
            return TypeResult::new(Type::class(ClassRef::Unresolved(name.to_string()), generics));
        };
        let class = self.project.class(id);
        if class.is_typedef() {
            if let Some(alias) = &class.decl().alias {
                let mut inner = GenericResolver::new();
                for (param, arg) in class.generic_params().iter().zip(&generics) {
                    inner.add(param.name.node.clone(), TypeResult::new(arg.clone()));
                }
                return self.resolve_tag_at(&alias.node, &TagScope::for_class(class), &inner, depth + 1);
            }
        }
        TypeResult::new(Type::class(ClassRef::Resolved(class.descriptor().clone()), generics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Project;
    use crate::parser::parse_module;

    fn project(src: &str) -> Project {
        Project::new(vec![parse_module(src, 0, None).unwrap()])
    }

    /// Resolve the tag of `var slot:<tag>` declared in class `Holder`.
    fn resolve(p: &Project, class: &str, resolver: &GenericResolver) -> String {
        let class = p.class_by_qualified_name(class).unwrap();
        let field = class.field("slot").unwrap();
        let r = TypeResolver::new(p);
        r.resolve_type_tag(field.type_tag().unwrap(), &TagScope::for_class(class), resolver).to_string()
    }

    #[test]
    fn builtins_and_primitives() {
        let p = project("class Holder { var slot:Array<Null<Int>>; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Array<Null<Int>>");
        let p = project("class Holder { var slot:Dynamic; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Dynamic");
    }

    #[test]
    fn generic_params_stay_textual_unless_bound() {
        let p = project("class Holder<T> { var slot:Array<T>; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Array<T>");
        let bound = GenericResolver::new().with("T", TypeResult::new(Type::string()));
        assert_eq!(resolve(&p, "Holder", &bound), "Array<String>");
    }

    #[test]
    fn function_tags() {
        let p = project("class Holder { var slot:Void -> Int; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Void -> Int");
        let p = project("class Holder { var slot:(a:Int, ?b:String) -> Void; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Int -> ?String -> Void");
    }

    #[test]
    fn typedefs_expand_with_arguments() {
        let p = project(
            "typedef Pair<A> = { first : A, second : A };\n\
             typedef Ints = Pair<Int>;\n\
             class Holder { var slot:Ints; }",
        );
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "{ first : Int, second : Int }");
    }

    #[test]
    fn cyclic_typedefs_give_up() {
        let p = project("typedef A = B;\ntypedef B = A;\nclass Holder { var slot:A; }");
        assert_eq!(resolve(&p, "Holder", &GenericResolver::new()), "Unknown");
    }

    #[test]
    fn declared_classes_resolve_unknown_names_stay_textual() {
        let p = project("class Foo {}\nclass Holder { var slot:Map<Foo, Bar>; }");
        let class = p.class_by_qualified_name("Holder").unwrap();
        let r = TypeResolver::new(&p);
        let ty = r.resolve_type_tag(class.field("slot").unwrap().type_tag().unwrap(), &TagScope::for_class(class), &GenericResolver::new()).ty;
        let Type::ClassInstance { class: map, generics } = ty else { panic!("expected class instance") };
        assert!(matches!(map, ClassRef::Unresolved(ref n) if n == "Map"));
        assert!(matches!(&generics[0], Type::ClassInstance { class: ClassRef::Resolved(d), .. } if d.name == "Foo"));
        assert!(matches!(&generics[1], Type::ClassInstance { class: ClassRef::Unresolved(n), .. } if n == "Bar"));
    }

    #[test]
    fn absent_tag_is_unknown() {
        let p = project("class A {}");
        let r = TypeResolver::new(&p);
        assert!(r.resolve_optional_tag(None, &TagScope::default(), &GenericResolver::new()).is_unknown());
    }
}
