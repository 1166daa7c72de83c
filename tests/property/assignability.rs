//! Property-based tests for the assignability relation.

use hxsema::typeck::types::{FnArg, Primitive, Type, can_assign, unify};
use proptest::prelude::*;

fn arb_primitive() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        Just(Primitive::Int),
        Just(Primitive::UInt),
        Just(Primitive::Float),
        Just(Primitive::Bool),
        Just(Primitive::String),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Unknown),
        Just(Type::Invalid),
        Just(Type::Dynamic),
        Just(Type::Void),
        arb_primitive().prop_map(Type::Primitive),
        "[A-Z][a-z]{0,6}".prop_map(Type::named),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    arb_leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            ("[A-Z][a-z]{0,6}", prop::collection::vec(inner.clone(), 1..3))
                .prop_map(|(name, generics)| Type::class(hxsema::typeck::types::ClassRef::Unresolved(name), generics)),
            (prop::collection::vec((inner.clone(), any::<bool>()), 0..3), inner).prop_map(|(params, ret)| {
                Type::Function {
                    params: params
                        .into_iter()
                        .enumerate()
                        .map(|(position, (ty, optional))| FnArg { position, optional, ty, name: None })
                        .collect(),
                    ret: Box::new(ret),
                }
            }),
        ]
    })
}

proptest! {
    /// Property: Dynamic is assignable both ways
    #[test]
    fn dynamic_is_bidirectional(ty in arb_type()) {
        prop_assert!(can_assign(&Type::Dynamic, &ty));
        prop_assert!(can_assign(&ty, &Type::Dynamic));
    }

    /// Property: missing information never produces a mismatch
    #[test]
    fn unknown_and_invalid_accept_everything(ty in arb_type()) {
        prop_assert!(can_assign(&Type::Unknown, &ty));
        prop_assert!(can_assign(&Type::Invalid, &ty));
        prop_assert!(can_assign(&ty, &Type::Unknown));
    }

    /// Property: every type accepts itself
    #[test]
    fn assignability_is_reflexive(ty in arb_type()) {
        prop_assert!(can_assign(&ty, &ty));
    }

    /// Property: unifying a type with itself is the identity
    #[test]
    fn unify_is_idempotent(ty in arb_type()) {
        prop_assert_eq!(unify(&ty, &ty), ty);
    }

    /// Property: numeric widening only goes towards Float
    #[test]
    fn float_never_narrows(p in arb_primitive()) {
        let source = Type::Primitive(p);
        if p.is_numeric() {
            prop_assert!(can_assign(&Type::float(), &source));
        }
        if p != Primitive::Float {
            prop_assert!(!can_assign(&source, &Type::float()));
        }
    }
}
