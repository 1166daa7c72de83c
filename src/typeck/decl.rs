//! Types of declarations: fields, methods, enum constructors, parameters
//! and local function literals.

use crate::model::{ClassHandle, EnumValueHandle, FieldHandle, MethodHandle, ParamHandle};
use crate::parser::ast::{FunctionLiteral, GenericParam};

use super::context::EvaluationContext;
use super::generics::{GenericResolver, propagate_generics_to_type};
use super::tag::TagScope;
use super::types::{ClassRef, FnArg, Type, TypeResult};
use super::{EvalFault, EvalKey, EvalKind, TypeResolver};

/// Something with a value type or a return type.
#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Field(FieldHandle<'a>),
    Method(MethodHandle<'a>),
    EnumValue(EnumValueHandle<'a>),
    /// A function literal, with the class or module it is written in.
    Function {
        literal: &'a FunctionLiteral,
        class: Option<ClassHandle<'a>>,
        module: Option<usize>,
    },
}

/// A declaration that introduces generic parameters.
#[derive(Debug, Clone, Copy)]
pub enum GenericOwner<'a> {
    /// Classes, interfaces, typedefs, enums and abstracts.
    Class(ClassHandle<'a>),
    Method(MethodHandle<'a>),
    EnumValue(EnumValueHandle<'a>),
}

impl<'a> GenericOwner<'a> {
    fn params_and_scope(self) -> (&'a [GenericParam], TagScope<'a>) {
        match self {
            GenericOwner::Class(c) => (c.generic_params(), TagScope::for_class(c)),
            GenericOwner::Method(m) => (m.generic_params(), TagScope::for_method(m)),
            GenericOwner::EnumValue(v) => (v.generic_params(), TagScope::for_enum_value(v)),
        }
    }
}

impl<'p> TypeResolver<'p> {
    /// Value type of a field, or return type of a method, enum constructor or
    /// function literal, with `resolver`'s bindings applied.
    pub fn field_or_method_return_type(
        &mut self,
        decl: Declaration<'_>,
        resolver: Option<&GenericResolver>,
    ) -> TypeResult {
        let empty = GenericResolver::new();
        let resolver = resolver.unwrap_or(&empty);
        self.boundary(TypeResult::unknown(), |s| {
            let result = match decl {
                Declaration::Field(field) => s.field_type_inner(field)?,
                Declaration::Method(method) => s.method_return_inner(method, resolver)?,
                Declaration::EnumValue(value) => TypeResult::new(s.enum_value_result_type(value)),
                Declaration::Function { literal, class, module } => {
                    s.function_return_inner(literal, class, module, resolver)?
                }
            };
            Ok(s.resolve_parameterized_type(result, resolver))
        })
    }

    pub fn field_type(&mut self, field: FieldHandle<'_>) -> TypeResult {
        self.boundary(TypeResult::unknown(), |s| s.field_type_inner(field))
    }

    /// Type of a parameter: its tag, else the type of its default value.
    pub fn parameter_type(&mut self, param: ParamHandle<'_>, scope: &TagScope<'_>, resolver: &GenericResolver) -> TypeResult {
        self.boundary(TypeResult::unknown(), |s| s.parameter_type_inner(param, scope, resolver))
    }

    /// The `Function` type of a method, as seen through member access.
    pub fn method_function_type(&mut self, method: MethodHandle<'_>, resolver: &GenericResolver) -> Type {
        self.boundary(Type::Unknown, |s| s.method_function_type_inner(method, resolver))
    }

    /// Per generic parameter of `owner`, in order: the resolver's binding,
    /// else its first constraint, else `Unknown`.
    pub fn resolve_parameters_to_types(&self, owner: GenericOwner<'_>, resolver: &GenericResolver) -> Vec<TypeResult> {
        let (params, scope) = owner.params_and_scope();
        params
            .iter()
            .map(|param| match resolver.resolve(&param.name.node) {
                Some(bound) => bound,
                None => self.resolve_optional_tag(param.constraints.first(), &scope, resolver),
            })
            .collect()
    }

    /// Replace a bare parameter reference bound by `resolver`, then
    /// propagate bindings into generic arguments.
    pub fn resolve_parameterized_type(&self, result: TypeResult, resolver: &GenericResolver) -> TypeResult {
        if let Some(bound) = result.ty.as_type_param().and_then(|name| resolver.resolve(name)) {
            return bound;
        }
        TypeResult { ty: propagate_generics_to_type(&result.ty, resolver), constant: result.constant }
    }

    /// Bind every generic parameter in scope of `class` and `method` to its
    /// first constraint, or `Dynamic` when unconstrained.
    pub fn from_scope_parents(&self, class: Option<ClassHandle<'_>>, method: Option<MethodHandle<'_>>) -> GenericResolver {
        let empty = GenericResolver::new();
        let mut resolver = GenericResolver::new();
        let mut owners: Vec<(&[GenericParam], TagScope<'_>)> = Vec::new();
        if let Some(class) = class {
            owners.push((class.generic_params(), TagScope::for_class(class)));
        }
        if let Some(method) = method {
            owners.push((method.generic_params(), TagScope::for_method(method)));
        }
        for (params, scope) in owners {
            for param in params {
                let bound = match param.constraints.first() {
                    Some(constraint) => self.resolve_type_tag(constraint, &scope, &empty),
                    None => TypeResult::dynamic(),
                };
                resolver.add(param.name.node.clone(), bound);
            }
        }
        resolver
    }

    /// Declared field type, ordered: enum-abstract rule, initializer type,
    /// then the tag (which keeps the initializer's constant).
    pub(crate) fn field_type_inner(&mut self, field: FieldHandle<'_>) -> Result<TypeResult, EvalFault> {
        self.guarded(EvalKey::new(field.span(), EvalKind::FieldType), |s| {
            let class = field.containing_class();
            let init = match field.init() {
                Some(expr) => {
                    let mut ctx = EvaluationContext::new(expr).with_class(class);
                    Some(s.eval(expr, &mut ctx, &GenericResolver::new())?)
                }
                None => None,
            };
            if let Some(special) = s.rules.special_field_type(field, init.as_ref()) {
                return Ok(special);
            }
            let keep_constant = field.is_inline() && field.is_static();
            let init = init.map(|i| if keep_constant { i } else { i.without_constant() });
            Ok(match field.type_tag() {
                Some(tag) => {
                    let declared = s.resolve_type_tag(tag, &TagScope::for_class(class), &GenericResolver::new());
                    TypeResult { ty: declared.ty, constant: init.and_then(|i| i.constant) }
                }
                None => init.unwrap_or_else(TypeResult::unknown),
            })
        })
    }

    pub(crate) fn parameter_type_inner(
        &mut self,
        param: ParamHandle<'_>,
        scope: &TagScope<'_>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        if let Some(tag) = param.type_tag() {
            return Ok(self.resolve_type_tag(tag, scope, resolver));
        }
        let Some(default) = param.default() else {
            return Ok(TypeResult::unknown());
        };
        self.guarded(EvalKey::new(param.span(), EvalKind::ParameterType), |s| {
            let mut ctx = EvaluationContext::new(default);
            if let Some(module) = scope.module {
                ctx = ctx.with_module(module);
            }
            Ok(s.eval(default, &mut ctx, resolver)?.without_constant())
        })
    }

    /// Declared return type, else the type the body returns.
    pub(crate) fn method_return_inner(
        &mut self,
        method: MethodHandle<'_>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        if let Some(tag) = method.return_tag() {
            return Ok(self.resolve_type_tag(tag, &TagScope::for_method(method), resolver));
        }
        let Some(mut ctx) = EvaluationContext::for_method(method) else {
            return Ok(TypeResult::unknown());
        };
        self.guarded(EvalKey::new(method.span(), EvalKind::MethodReturn), |s| {
            s.declare_params(&mut ctx, method, resolver)?;
            s.eval(ctx.root(), &mut ctx, resolver)?;
            Ok(ctx.return_type())
        })
    }

    pub(crate) fn method_function_type_inner(
        &mut self,
        method: MethodHandle<'_>,
        resolver: &GenericResolver,
    ) -> Result<Type, EvalFault> {
        let scope = TagScope::for_method(method);
        let mut params = Vec::with_capacity(method.param_count());
        for param in method.params() {
            let ty = self.parameter_type_inner(param, &scope, resolver)?;
            params.push(FnArg {
                position: param.position(),
                optional: param.is_optional(),
                ty: self.resolve_parameterized_type(ty, resolver).ty,
                name: Some(param.name().to_string()),
            });
        }
        let ret = self.method_return_inner(method, resolver)?;
        let ret = self.resolve_parameterized_type(ret, resolver).ty;
        Ok(Type::Function { params, ret: Box::new(ret) })
    }

    fn function_return_inner(
        &mut self,
        literal: &FunctionLiteral,
        class: Option<ClassHandle<'_>>,
        module: Option<usize>,
        resolver: &GenericResolver,
    ) -> Result<TypeResult, EvalFault> {
        let scope = match class {
            Some(class) => TagScope::for_class(class),
            None => TagScope { module, ..TagScope::default() },
        };
        if let Some(tag) = &literal.return_tag {
            return Ok(self.resolve_type_tag(tag, &scope, resolver));
        }
        self.guarded(EvalKey::new(literal.body.span, EvalKind::FunctionReturn), |s| {
            let mut ctx = EvaluationContext::new(&literal.body);
            ctx = match (class, module) {
                (Some(class), _) => ctx.with_class(class),
                (None, Some(module)) => ctx.with_module(module),
                (None, None) => ctx,
            };
            for (position, param) in literal.params.iter().enumerate() {
                let ty = s.parameter_type_inner(ParamHandle::new(param, position), &scope, resolver)?;
                ctx.declare(param.name.node.clone(), ty);
            }
            s.eval(&literal.body, &mut ctx, resolver)?;
            Ok(ctx.return_type())
        })
    }

    /// The type an enum constructor produces: its declared tag, else the
    /// enum itself.
    pub(crate) fn enum_value_result_type(&self, value: EnumValueHandle<'_>) -> Type {
        match value.return_tag() {
            Some(tag) => self.resolve_type_tag(tag, &TagScope::for_enum_value(value), &GenericResolver::new()).ty,
            None => Type::EnumValue {
                enum_ref: ClassRef::Resolved(value.enum_class().descriptor().clone()),
                constructor: value.name().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Project;
    use crate::parser::{parse_expression, parse_module};
    use crate::typeck::types::Constant;

    fn project(src: &str) -> Project {
        Project::new(vec![parse_module(src, 0, None).unwrap()])
    }

    fn field_type(p: &Project, class: &str, field: &str) -> String {
        let class = p.class_by_qualified_name(class).unwrap();
        let mut r = TypeResolver::new(p);
        let result = r.field_type(class.field(field).unwrap());
        assert_eq!(r.guard_depth(), 0);
        result.describe()
    }

    #[test]
    fn field_type_precedence() {
        let p = project(
            "class Main {\n\
             static inline var A = 5;\n\
             var b = 5;\n\
             var c:Float = 5;\n\
             static inline var d:Float = 5;\n\
             var e;\n\
             }",
        );
        assert_eq!(field_type(&p, "Main", "A"), "Int = 5");
        assert_eq!(field_type(&p, "Main", "b"), "Int");
        assert_eq!(field_type(&p, "Main", "c"), "Float");
        assert_eq!(field_type(&p, "Main", "d"), "Float = 5");
        assert_eq!(field_type(&p, "Main", "e"), "Unknown");
    }

    #[test]
    fn self_referencing_field_is_dynamic() {
        let p = project("class Main { var x = x; var y = z; var z = y + 1; }");
        assert_eq!(field_type(&p, "Main", "x"), "Dynamic");
        // y -> z -> y: the inner y is cut off, so z is Dynamic + Int
        assert_eq!(field_type(&p, "Main", "z"), "Dynamic");
    }

    #[test]
    fn enum_abstract_values_take_the_abstract_type() {
        let p = project("enum abstract Level(Int) { var Low = 1; var High:Int = 2; }");
        assert_eq!(field_type(&p, "Level", "Low"), "Level = 1");
        assert_eq!(field_type(&p, "Level", "High"), "Level = 2");
    }

    #[test]
    fn method_returns_are_inferred() {
        let p = project(
            "class Main {\n\
             function f() { return 1; }\n\
             function g() return f();\n\
             function h() {}\n\
             function a() return b();\n\
             function b() return a();\n\
             }",
        );
        let main = p.class_by_qualified_name("Main").unwrap();
        let mut r = TypeResolver::new(&p);
        let mut ret = |name: &str| {
            r.field_or_method_return_type(Declaration::Method(main.method(name).unwrap()), None).ty
        };
        assert_eq!(ret("f"), Type::int());
        assert_eq!(ret("g"), Type::int());
        assert_eq!(ret("h"), Type::Void);
        assert_eq!(ret("a"), Type::Dynamic);
        assert_eq!(r.guard_depth(), 0);
    }

    #[test]
    fn generic_field_under_binding() {
        let p = project("class Box<T> { public var value:T; }");
        let boxed = p.class_by_qualified_name("Box").unwrap();
        let mut r = TypeResolver::new(&p);
        let resolver = GenericResolver::new().with("T", TypeResult::new(Type::int()));
        let field = Declaration::Field(boxed.field("value").unwrap());
        assert_eq!(r.field_or_method_return_type(field, Some(&resolver)).ty, Type::int());
        assert_eq!(r.field_or_method_return_type(field, None).ty, Type::named("T"));
    }

    #[test]
    fn enum_constructor_declared_tag() {
        let p = project("enum Expr<T> { IntLit(v:Int):Expr<Int>; Plain; }");
        let e = p.class_by_qualified_name("Expr").unwrap();
        let mut r = TypeResolver::new(&p);
        let tagged = r.field_or_method_return_type(Declaration::EnumValue(e.enum_value("IntLit").unwrap()), None);
        assert_eq!(tagged.to_string(), "Expr<Int>");
        let plain = r.field_or_method_return_type(Declaration::EnumValue(e.enum_value("Plain").unwrap()), None);
        assert_eq!(plain.to_string(), "Expr");
    }

    #[test]
    fn function_literal_return() {
        let p = project("class Main {}");
        let e = parse_expression("function(a:Int) { return a + 1; }").unwrap();
        let crate::parser::ast::Expr::Function(lit) = &e.node else { panic!("expected function literal") };
        let mut r = TypeResolver::new(&p);
        let decl = Declaration::Function { literal: lit, class: p.class_by_qualified_name("Main"), module: Some(0) };
        assert_eq!(r.field_or_method_return_type(decl, None).ty, Type::int());
    }

    #[test]
    fn parameters_to_types() {
        let p = project("class Plain {}\nclass Box<T, U:String> { function map<V>():Void {} }");
        let boxed = p.class_by_qualified_name("Box").unwrap();
        let r = TypeResolver::new(&p);
        let describe = |v: Vec<TypeResult>| v.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        assert_eq!(describe(r.resolve_parameters_to_types(GenericOwner::Class(boxed), &GenericResolver::new())), vec!["Unknown", "String"]);
        let bound = GenericResolver::new().with("T", TypeResult::new(Type::int()));
        assert_eq!(describe(r.resolve_parameters_to_types(GenericOwner::Class(boxed), &bound)), vec!["Int", "String"]);
        let method = GenericOwner::Method(boxed.method("map").unwrap());
        assert_eq!(describe(r.resolve_parameters_to_types(method, &GenericResolver::new())), vec!["Unknown"]);
        let plain = p.class_by_qualified_name("Plain").unwrap();
        assert!(r.resolve_parameters_to_types(GenericOwner::Class(plain), &GenericResolver::new()).is_empty());
    }

    #[test]
    fn method_function_type_marks_optionals() {
        let p = project("class Main { function run(a:Int, ?b:String, c = 1.5):Void {} }");
        let main = p.class_by_qualified_name("Main").unwrap();
        let mut r = TypeResolver::new(&p);
        let ty = r.method_function_type(main.method("run").unwrap(), &GenericResolver::new());
        assert_eq!(ty.to_string(), "Int -> ?String -> ?Float -> Void");
        assert_eq!(ty.required_arity(), 1);
    }

    #[test]
    fn constraint_resolver() {
        let p = project("class Base {}\nclass Box<T:Base, U> { function f<V:Int>() {} }");
        let boxed = p.class_by_qualified_name("Box").unwrap();
        let r = TypeResolver::new(&p);
        let resolver = r.from_scope_parents(Some(boxed), boxed.method("f"));
        assert_eq!(resolver.resolve("T").unwrap().to_string(), "Base");
        assert_eq!(resolver.resolve("U").unwrap().ty, Type::Dynamic);
        assert_eq!(resolver.resolve("V").unwrap().ty, Type::int());
    }

    #[test]
    fn inline_static_constant_survives_tag() {
        let p = project("class Main { static inline var NAME:String = 'x' + 1; }");
        let main = p.class_by_qualified_name("Main").unwrap();
        let mut r = TypeResolver::new(&p);
        let result = r.field_type(main.field("NAME").unwrap());
        assert_eq!(result.constant, Some(Constant::Str("x1".into())));
    }
}
