//! Bag functions for every datatype: one-and-only, bag-size, is-in, and the
//! bag constructor.

use xacml_core::datatype::ALL_DATATYPES;
use xacml_core::{AttributeValue, Bag, Datatype, IndeterminateError, Value};

use super::{as_bag, as_prim, eager, eager_varargs, family_version, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    for dt in ALL_DATATYPES {
        let version = family_version(dt);
        let name = dt.function_name();

        registry.register(eager(
            urn(version, format_args!("{name}-one-and-only")),
            vec![dt.bag_of()],
            dt.into(),
            move |args| {
                let bag = as_bag(&args[0])?;
                bag.single().cloned().map(Value::Primitive).ok_or_else(|| {
                    IndeterminateError::processing_error(format!(
                        "one-and-only: bag has {} values, expected exactly one",
                        bag.len()
                    ))
                })
            },
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-bag-size")),
            vec![dt.bag_of()],
            Datatype::Integer.into(),
            |args| Ok(AttributeValue::Integer(as_bag(&args[0])?.len() as i64).into()),
        ));

        registry.register(eager(
            urn(version, format_args!("{name}-is-in")),
            vec![dt.into(), dt.bag_of()],
            Datatype::Boolean.into(),
            |args| Ok(as_bag(&args[1])?.contains(as_prim(&args[0])?).into()),
        ));

        registry.register(eager_varargs(
            urn(version, format_args!("{name}-bag")),
            vec![],
            dt.into(),
            dt.bag_of(),
            move |args| {
                let values = args
                    .iter()
                    .map(|v| as_prim(v).map(Clone::clone))
                    .collect::<Result<Vec<_>, _>>()?;
                Bag::new(dt, values)
                    .map(Value::Bag)
                    .map_err(|e| IndeterminateError::processing_error(e.to_string()))
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use xacml_core::{EvalResult, StatusCode};

    fn string_bag(items: &[&str]) -> Value {
        Value::Bag(
            Bag::new(
                Datatype::String,
                items
                    .iter()
                    .map(|s| AttributeValue::String(s.to_string()))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn eval(id: &str, args: Vec<Value>) -> EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let f = registry.first_order(id).unwrap();
        let exprs = args.into_iter().map(Expression::Constant).collect();
        f.new_call(exprs, &[]).unwrap().evaluate(None)
    }

    #[test]
    fn one_and_only() {
        let id = "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only";
        assert_eq!(
            eval(id, vec![string_bag(&["only"])]).unwrap(),
            AttributeValue::String("only".into()).into()
        );
        for bag in [string_bag(&[]), string_bag(&["a", "b"])] {
            let err = eval(id, vec![bag]).unwrap_err();
            assert_eq!(err.status, StatusCode::ProcessingError);
        }
    }

    #[test]
    fn bag_size_and_is_in() {
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:string-bag-size",
                vec![string_bag(&["a", "b", "c"])]
            )
            .unwrap(),
            AttributeValue::Integer(3).into()
        );
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:string-is-in",
                vec![
                    AttributeValue::String("test".into()).into(),
                    string_bag(&["a", "test", "b"])
                ]
            )
            .unwrap(),
            Value::from(true)
        );
    }

    #[test]
    fn bag_constructor() {
        let out = eval(
            "urn:oasis:names:tc:xacml:1.0:function:integer-bag",
            vec![
                AttributeValue::Integer(1).into(),
                AttributeValue::Integer(2).into(),
            ],
        )
        .unwrap();
        let bag = out.expect_bag().unwrap();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.element_type(), Datatype::Integer);

        // empty constructor call still produces a correctly-typed bag
        let out = eval("urn:oasis:names:tc:xacml:1.0:function:integer-bag", vec![]).unwrap();
        assert_eq!(out.expect_bag().unwrap().element_type(), Datatype::Integer);
    }
}
