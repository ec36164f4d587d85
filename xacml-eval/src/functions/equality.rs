//! Equality functions: `<T>-equal` for every datatype, plus
//! `string-equal-ignore-case`.
//!
//! Equality is datatype-specific and delegated to the value model (temporal
//! by instant, binary by octets, names by their normalization rules).

use xacml_core::datatype::ALL_DATATYPES;
use xacml_core::{Datatype, Value};

use super::{as_prim, as_str, eager, family_version, urn};
use crate::function::{FirstOrderFunction, FunctionRegistry};

pub(super) fn register(registry: &mut FunctionRegistry) {
    for dt in ALL_DATATYPES {
        registry.register(equal_fn(
            urn(family_version(dt), format_args!("{}-equal", dt.function_name())),
            dt,
        ));
        // XACML 3.0 re-published the duration equality functions.
        if matches!(dt, Datatype::DayTimeDuration | Datatype::YearMonthDuration) {
            registry.register(equal_fn(
                urn("3.0", format_args!("{}-equal", dt.function_name())),
                dt,
            ));
        }
    }

    registry.register(eager(
        urn("3.0", "string-equal-ignore-case"),
        vec![Datatype::String.into(), Datatype::String.into()],
        Datatype::Boolean.into(),
        |args| {
            let a = as_str(&args[0])?;
            let b = as_str(&args[1])?;
            Ok(a.eq_ignore_ascii_case(b).into())
        },
    ));
}

fn equal_fn(id: String, dt: Datatype) -> FirstOrderFunction {
    eager(
        id,
        vec![dt.into(), dt.into()],
        Datatype::Boolean.into(),
        |args| Ok(Value::from(as_prim(&args[0])? == as_prim(&args[1])?)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionRegistry;
    use crate::expression::Expression;
    use xacml_core::AttributeValue;

    fn call(registry: &FunctionRegistry, id: &str, args: Vec<AttributeValue>) -> Value {
        let f = registry.first_order(id).unwrap();
        let exprs = args
            .into_iter()
            .map(|v| Expression::Constant(Value::Primitive(v)))
            .collect();
        f.new_call(exprs, &[]).unwrap().evaluate(None).unwrap()
    }

    #[test]
    fn string_equal() {
        let registry = FunctionRegistry::standard();
        let id = "urn:oasis:names:tc:xacml:1.0:function:string-equal";
        assert_eq!(
            call(&registry, id, vec![
                AttributeValue::String("a".into()),
                AttributeValue::String("a".into())
            ]),
            Value::from(true)
        );
        assert_eq!(
            call(&registry, id, vec![
                AttributeValue::String("a".into()),
                AttributeValue::String("A".into())
            ]),
            Value::from(false)
        );
    }

    #[test]
    fn string_equal_ignore_case() {
        let registry = FunctionRegistry::standard();
        let id = "urn:oasis:names:tc:xacml:3.0:function:string-equal-ignore-case";
        assert_eq!(
            call(&registry, id, vec![
                AttributeValue::String("Test".into()),
                AttributeValue::String("tEST".into())
            ]),
            Value::from(true)
        );
    }

    #[test]
    fn datetime_equal_by_instant() {
        let registry = FunctionRegistry::standard();
        let id = "urn:oasis:names:tc:xacml:1.0:function:dateTime-equal";
        let a = AttributeValue::parse(Datatype::DateTime, "2024-01-01T05:00:00Z").unwrap();
        let b = AttributeValue::parse(Datatype::DateTime, "2024-01-01T00:00:00-05:00").unwrap();
        assert_eq!(call(&registry, id, vec![a, b]), Value::from(true));
    }

    #[test]
    fn type_mismatch_rejected_at_bind() {
        let registry = FunctionRegistry::standard();
        let f = registry
            .first_order("urn:oasis:names:tc:xacml:1.0:function:integer-equal")
            .unwrap();
        let exprs = vec![
            Expression::Constant(Value::Primitive(AttributeValue::Integer(1))),
            Expression::Constant(Value::Primitive(AttributeValue::String("1".into()))),
        ];
        assert!(f.new_call(exprs, &[]).is_err());
    }
}
