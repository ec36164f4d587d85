//! Set operations over bags: intersection, union, at-least-one-member-of,
//! subset, set-equals.
//!
//! Bags are multisets; the set functions apply set semantics (results are
//! deduplicated, membership ignores multiplicity). Element equality is the
//! datatype-specific equality, so no hashing; membership is a linear scan,
//! which is fine at attribute-bag sizes.

use xacml_core::datatype::ALL_DATATYPES;
use xacml_core::{AttributeValue, Bag, Datatype, IndeterminateError, Value};

use super::{as_bag, eager, family_version, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    for dt in ALL_DATATYPES {
        let version = family_version(dt);
        let name = dt.function_name();

        registry.register(eager(
            urn(version, format_args!("{name}-intersection")),
            vec![dt.bag_of(), dt.bag_of()],
            dt.bag_of(),
            move |args| {
                let a = as_bag(&args[0])?;
                let b = as_bag(&args[1])?;
                let mut out: Vec<AttributeValue> = Vec::new();
                for v in a.iter() {
                    if b.contains(v) && !out.contains(v) {
                        out.push(v.clone());
                    }
                }
                new_bag(dt, out)
            },
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-union")),
            vec![dt.bag_of(), dt.bag_of()],
            dt.bag_of(),
            move |args| {
                let a = as_bag(&args[0])?;
                let b = as_bag(&args[1])?;
                let mut out: Vec<AttributeValue> = Vec::new();
                for v in a.iter().chain(b.iter()) {
                    if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
                new_bag(dt, out)
            },
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-at-least-one-member-of")),
            vec![dt.bag_of(), dt.bag_of()],
            Datatype::Boolean.into(),
            |args| {
                let a = as_bag(&args[0])?;
                let b = as_bag(&args[1])?;
                Ok(a.iter().any(|v| b.contains(v)).into())
            },
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-subset")),
            vec![dt.bag_of(), dt.bag_of()],
            Datatype::Boolean.into(),
            |args| {
                let a = as_bag(&args[0])?;
                let b = as_bag(&args[1])?;
                Ok(is_subset(a, b).into())
            },
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-set-equals")),
            vec![dt.bag_of(), dt.bag_of()],
            Datatype::Boolean.into(),
            |args| {
                let a = as_bag(&args[0])?;
                let b = as_bag(&args[1])?;
                Ok((is_subset(a, b) && is_subset(b, a)).into())
            },
        ));
    }
}

fn is_subset(a: &Bag, b: &Bag) -> bool {
    a.iter().all(|v| b.contains(v))
}

fn new_bag(dt: Datatype, values: Vec<AttributeValue>) -> xacml_core::EvalResult<Value> {
    Bag::new(dt, values)
        .map(Value::Bag)
        .map_err(|e| IndeterminateError::processing_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn int_bag(items: &[i64]) -> Value {
        Value::Bag(
            Bag::new(
                Datatype::Integer,
                items.iter().map(|i| AttributeValue::Integer(*i)).collect(),
            )
            .unwrap(),
        )
    }

    fn eval(suffix: &str, a: Value, b: Value) -> Value {
        let registry = FunctionRegistry::standard();
        let f = registry
            .first_order(&urn("1.0", format_args!("integer-{suffix}")))
            .unwrap();
        let exprs = vec![Expression::Constant(a), Expression::Constant(b)];
        f.new_call(exprs, &[]).unwrap().evaluate(None).unwrap()
    }

    #[test]
    fn intersection_deduplicates() {
        let out = eval("intersection", int_bag(&[1, 2, 2, 3]), int_bag(&[2, 3, 4]));
        assert_eq!(out, int_bag(&[2, 3]));
    }

    #[test]
    fn union_deduplicates() {
        let out = eval("union", int_bag(&[1, 2]), int_bag(&[2, 3]));
        assert_eq!(out, int_bag(&[1, 2, 3]));
    }

    #[test]
    fn subset_ignores_multiplicity() {
        assert_eq!(
            eval("subset", int_bag(&[1, 1, 2]), int_bag(&[1, 2, 3])),
            Value::from(true)
        );
        assert_eq!(
            eval("subset", int_bag(&[1, 4]), int_bag(&[1, 2, 3])),
            Value::from(false)
        );
    }

    #[test]
    fn set_equals() {
        assert_eq!(
            eval("set-equals", int_bag(&[1, 2, 2]), int_bag(&[2, 1])),
            Value::from(true)
        );
        assert_eq!(
            eval("set-equals", int_bag(&[1]), int_bag(&[1, 2])),
            Value::from(false)
        );
    }

    #[test]
    fn at_least_one_member_of() {
        assert_eq!(
            eval("at-least-one-member-of", int_bag(&[9, 2]), int_bag(&[2, 3])),
            Value::from(true)
        );
        assert_eq!(
            eval("at-least-one-member-of", int_bag(&[]), int_bag(&[2, 3])),
            Value::from(false)
        );
    }
}
