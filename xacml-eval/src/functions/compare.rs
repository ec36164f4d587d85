//! Order comparisons: greater/less(-or-equal) for integer, double, string
//! and the temporal types, plus `time-in-range`.

use std::cmp::Ordering;

use xacml_core::{AttributeValue, Datatype, EvalResult, IndeterminateError, Value};

use super::{as_prim, eager, urn};
use crate::function::FunctionRegistry;

/// Comparator producing a total order for one datatype's values.
type Comparator = fn(&AttributeValue, &AttributeValue) -> EvalResult<Ordering>;

pub(super) fn register(registry: &mut FunctionRegistry) {
    register_family(registry, Datatype::Integer, cmp_integer);
    register_family(registry, Datatype::Double, cmp_double);
    register_family(registry, Datatype::String, cmp_string);
    register_family(registry, Datatype::Time, cmp_time);
    register_family(registry, Datatype::Date, cmp_date);
    register_family(registry, Datatype::DateTime, cmp_datetime);

    registry.register(eager(
        urn("2.0", "time-in-range"),
        vec![
            Datatype::Time.into(),
            Datatype::Time.into(),
            Datatype::Time.into(),
        ],
        Datatype::Boolean.into(),
        |args| {
            let (t, lo, hi) = match (as_prim(&args[0])?, as_prim(&args[1])?, as_prim(&args[2])?) {
                (
                    AttributeValue::Time(t),
                    AttributeValue::Time(lo),
                    AttributeValue::Time(hi),
                ) => (t, lo, hi),
                _ => {
                    return Err(IndeterminateError::processing_error(
                        "internal: time-in-range arguments are not times",
                    ))
                }
            };
            Ok(t.in_range(lo, hi).into())
        },
    ));
}

/// Registers `<T>-greater-than`, `<T>-greater-than-or-equal`,
/// `<T>-less-than`, `<T>-less-than-or-equal`.
fn register_family(registry: &mut FunctionRegistry, dt: Datatype, cmp: Comparator) {
    let name = dt.function_name();
    let variants: [(&str, fn(Ordering) -> bool); 4] = [
        ("greater-than", |o| o == Ordering::Greater),
        ("greater-than-or-equal", |o| o != Ordering::Less),
        ("less-than", |o| o == Ordering::Less),
        ("less-than-or-equal", |o| o != Ordering::Greater),
    ];
    for (suffix, accept) in variants {
        registry.register(eager(
            urn("1.0", format_args!("{name}-{suffix}")),
            vec![dt.into(), dt.into()],
            Datatype::Boolean.into(),
            move |args| {
                let ordering = cmp(as_prim(&args[0])?, as_prim(&args[1])?)?;
                Ok(accept(ordering).into())
            },
        ));
    }
}

fn internal_mismatch() -> IndeterminateError {
    IndeterminateError::processing_error("internal: comparison arguments have the wrong datatype")
}

fn cmp_integer(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::Integer(a), AttributeValue::Integer(b)) => Ok(a.cmp(b)),
        _ => Err(internal_mismatch()),
    }
}

fn cmp_double(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::Double(a), AttributeValue::Double(b)) => {
            a.partial_cmp(b).ok_or_else(|| {
                IndeterminateError::processing_error("double comparison with NaN")
            })
        }
        _ => Err(internal_mismatch()),
    }
}

fn cmp_string(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::String(a), AttributeValue::String(b)) => Ok(a.as_str().cmp(b.as_str())),
        _ => Err(internal_mismatch()),
    }
}

fn cmp_time(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::Time(a), AttributeValue::Time(b)) => Ok(a.cmp(b)),
        _ => Err(internal_mismatch()),
    }
}

fn cmp_date(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::Date(a), AttributeValue::Date(b)) => Ok(a.cmp(b)),
        _ => Err(internal_mismatch()),
    }
}

fn cmp_datetime(a: &AttributeValue, b: &AttributeValue) -> EvalResult<Ordering> {
    match (a, b) {
        (AttributeValue::DateTime(a), AttributeValue::DateTime(b)) => Ok(a.cmp(b)),
        _ => Err(internal_mismatch()),
    }
}
