//! Numeric arithmetic: add/subtract/multiply/divide/mod, abs, round, floor,
//! and the integer/double conversions.
//!
//! Integer arithmetic is checked; overflow and division by zero produce
//! Indeterminate(processing-error).

use xacml_core::{AttributeValue, Datatype, IndeterminateError, Value};

use super::{as_f64, as_i64, eager, eager_varargs, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let int = Datatype::Integer;
    let dbl = Datatype::Double;

    // add and multiply take two or more arguments
    registry.register(eager_varargs(
        urn("1.0", "integer-add"),
        vec![int.into(), int.into()],
        int.into(),
        int.into(),
        |args| {
            let mut sum: i64 = 0;
            for arg in args {
                sum = sum
                    .checked_add(as_i64(arg)?)
                    .ok_or_else(|| overflow("integer-add"))?;
            }
            Ok(AttributeValue::Integer(sum).into())
        },
    ));
    registry.register(eager_varargs(
        urn("1.0", "integer-multiply"),
        vec![int.into(), int.into()],
        int.into(),
        int.into(),
        |args| {
            let mut product: i64 = 1;
            for arg in args {
                product = product
                    .checked_mul(as_i64(arg)?)
                    .ok_or_else(|| overflow("integer-multiply"))?;
            }
            Ok(AttributeValue::Integer(product).into())
        },
    ));
    registry.register(eager(
        urn("1.0", "integer-subtract"),
        vec![int.into(), int.into()],
        int.into(),
        |args| {
            as_i64(&args[0])?
                .checked_sub(as_i64(&args[1])?)
                .map(|v| AttributeValue::Integer(v).into())
                .ok_or_else(|| overflow("integer-subtract"))
        },
    ));
    registry.register(eager(
        urn("1.0", "integer-divide"),
        vec![int.into(), int.into()],
        int.into(),
        |args| {
            as_i64(&args[0])?
                .checked_div(as_i64(&args[1])?)
                .map(|v| AttributeValue::Integer(v).into())
                .ok_or_else(|| {
                    IndeterminateError::processing_error("integer-divide: division by zero")
                })
        },
    ));
    registry.register(eager(
        urn("1.0", "integer-mod"),
        vec![int.into(), int.into()],
        int.into(),
        |args| {
            as_i64(&args[0])?
                .checked_rem(as_i64(&args[1])?)
                .map(|v| AttributeValue::Integer(v).into())
                .ok_or_else(|| IndeterminateError::processing_error("integer-mod: division by zero"))
        },
    ));
    registry.register(eager(
        urn("1.0", "integer-abs"),
        vec![int.into()],
        int.into(),
        |args| {
            as_i64(&args[0])?
                .checked_abs()
                .map(|v| AttributeValue::Integer(v).into())
                .ok_or_else(|| overflow("integer-abs"))
        },
    ));

    registry.register(eager_varargs(
        urn("1.0", "double-add"),
        vec![dbl.into(), dbl.into()],
        dbl.into(),
        dbl.into(),
        |args| {
            let mut sum = 0.0;
            for arg in args {
                sum += as_f64(arg)?;
            }
            Ok(AttributeValue::Double(sum).into())
        },
    ));
    registry.register(eager_varargs(
        urn("1.0", "double-multiply"),
        vec![dbl.into(), dbl.into()],
        dbl.into(),
        dbl.into(),
        |args| {
            let mut product = 1.0;
            for arg in args {
                product *= as_f64(arg)?;
            }
            Ok(AttributeValue::Double(product).into())
        },
    ));
    registry.register(eager(
        urn("1.0", "double-subtract"),
        vec![dbl.into(), dbl.into()],
        dbl.into(),
        |args| Ok(AttributeValue::Double(as_f64(&args[0])? - as_f64(&args[1])?).into()),
    ));
    registry.register(eager(
        urn("1.0", "double-divide"),
        vec![dbl.into(), dbl.into()],
        dbl.into(),
        |args| {
            let divisor = as_f64(&args[1])?;
            if divisor == 0.0 {
                return Err(IndeterminateError::processing_error(
                    "double-divide: division by zero",
                ));
            }
            Ok(AttributeValue::Double(as_f64(&args[0])? / divisor).into())
        },
    ));
    registry.register(eager(
        urn("1.0", "double-abs"),
        vec![dbl.into()],
        dbl.into(),
        |args| Ok(AttributeValue::Double(as_f64(&args[0])?.abs()).into()),
    ));
    registry.register(eager(urn("1.0", "round"), vec![dbl.into()], dbl.into(), |args| {
        // rounds half toward positive infinity
        Ok(AttributeValue::Double((as_f64(&args[0])? + 0.5).floor()).into())
    }));
    registry.register(eager(urn("1.0", "floor"), vec![dbl.into()], dbl.into(), |args| {
        Ok(AttributeValue::Double(as_f64(&args[0])?.floor()).into())
    }));

    registry.register(eager(
        urn("1.0", "integer-to-double"),
        vec![int.into()],
        dbl.into(),
        |args| Ok(AttributeValue::Double(as_i64(&args[0])? as f64).into()),
    ));
    registry.register(eager(
        urn("1.0", "double-to-integer"),
        vec![dbl.into()],
        int.into(),
        |args| Ok(AttributeValue::Integer(as_f64(&args[0])? as i64).into()),
    ));
}

fn overflow(id: &str) -> IndeterminateError {
    IndeterminateError::processing_error(format!("{id}: integer overflow"))
}
