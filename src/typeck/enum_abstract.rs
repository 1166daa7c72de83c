//! Special typing of `enum abstract` value fields.

use crate::model::{ClassHandle, FieldHandle};

use super::types::{ClassRef, Type, TypeResult};

/// Hook consulted before the ordinary field rules.
pub trait AbstractEnumRules {
    /// Type of `field` when the language gives it a special one, given the
    /// evaluated initializer.
    fn special_field_type(&self, field: FieldHandle<'_>, init: Option<&TypeResult>) -> Option<TypeResult>;

    /// How an initializer expression is seen when checked against the
    /// field's declared tag.
    fn special_init_expression_type(&self, field: FieldHandle<'_>, init: &TypeResult) -> Option<TypeResult>;
}

/// Value fields of an `enum abstract` (or `@:enum abstract`) have the
/// abstract's own type and keep their literal constant. Static members are
/// ordinary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnumAbstracts;

impl AbstractEnumRules for EnumAbstracts {
    fn special_field_type(&self, field: FieldHandle<'_>, init: Option<&TypeResult>) -> Option<TypeResult> {
        let class = field.containing_class();
        if !is_value_field(class, field) {
            return None;
        }
        let result = TypeResult::new(abstract_type(class));
        Some(match init.and_then(|i| i.constant.clone()) {
            Some(constant) => result.with_constant(constant),
            None => result,
        })
    }

    fn special_init_expression_type(&self, field: FieldHandle<'_>, init: &TypeResult) -> Option<TypeResult> {
        let class = field.containing_class();
        if !is_value_field(class, field) {
            return None;
        }
        Some(TypeResult { ty: abstract_type(class), constant: init.constant.clone() })
    }
}

fn is_value_field(class: ClassHandle<'_>, field: FieldHandle<'_>) -> bool {
    class.is_enum_abstract() && !field.is_static() && !field.is_property()
}

fn abstract_type(class: ClassHandle<'_>) -> Type {
    Type::class(ClassRef::Resolved(class.descriptor().clone()), Vec::new())
}
