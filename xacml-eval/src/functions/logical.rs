//! Boolean connectives: and, or, n-of, not.
//!
//! and/or/n-of are lazy: arguments evaluate left to right and evaluation
//! stops as soon as the result is decided. An Indeterminate argument is
//! deferred: it only surfaces if no decisive argument follows (XACML
//! A.3.5).

use xacml_core::{AttributeValue, Datatype, EvalResult, IndeterminateError, Value};

use crate::context::EvaluationContext;
use crate::expression::Expression;
use crate::function::{FirstOrderFunction, FunctionRegistry, Kernel, Signature};

use super::{as_bool, eager, urn};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(FirstOrderFunction::new(
        urn("1.0", "and"),
        Signature::varargs(vec![], Datatype::Boolean.into()),
        Datatype::Boolean.into(),
        Kernel::Lazy(Box::new(|args, ctx| connective(args, ctx, false))),
    ));
    registry.register(FirstOrderFunction::new(
        urn("1.0", "or"),
        Signature::varargs(vec![], Datatype::Boolean.into()),
        Datatype::Boolean.into(),
        Kernel::Lazy(Box::new(|args, ctx| connective(args, ctx, true))),
    ));
    registry.register(FirstOrderFunction::new(
        urn("1.0", "n-of"),
        Signature::varargs(vec![Datatype::Integer.into()], Datatype::Boolean.into()),
        Datatype::Boolean.into(),
        Kernel::Lazy(Box::new(n_of)),
    ));
    registry.register(eager(
        urn("1.0", "not"),
        vec![Datatype::Boolean.into()],
        Datatype::Boolean.into(),
        |args| Ok(Value::from(!as_bool(&args[0])?)),
    ));
}

fn eval_bool(expr: &Expression, ctx: Option<&EvaluationContext>) -> EvalResult<bool> {
    match expr.evaluate(ctx)? {
        Value::Primitive(AttributeValue::Boolean(b)) => Ok(b),
        _ => Err(IndeterminateError::processing_error(
            "internal: boolean connective argument is not a boolean",
        )),
    }
}

/// Shared and/or body. `decisive` is the value that short-circuits: true
/// for or, false for and; with no arguments the result is `!decisive`.
fn connective(
    args: &[Expression],
    ctx: Option<&EvaluationContext>,
    decisive: bool,
) -> EvalResult<Value> {
    let mut deferred: Option<IndeterminateError> = None;
    for arg in args {
        match eval_bool(arg, ctx) {
            Ok(b) if b == decisive => return Ok(Value::from(decisive)),
            Ok(_) => {}
            Err(e) => deferred = Some(deferred.unwrap_or(e)),
        }
    }
    match deferred {
        Some(e) => Err(e),
        None => Ok(Value::from(!decisive)),
    }
}

/// n-of: first argument is the required count n; true once n of the
/// remaining arguments are true. n greater than the number of remaining
/// arguments is a processing error (XACML A.3.5).
fn n_of(args: &[Expression], ctx: Option<&EvaluationContext>) -> EvalResult<Value> {
    let n = match args[0].evaluate(ctx)? {
        Value::Primitive(AttributeValue::Integer(n)) => n,
        _ => {
            return Err(IndeterminateError::processing_error(
                "internal: n-of first argument is not an integer",
            ))
        }
    };
    if n < 0 {
        return Err(IndeterminateError::processing_error(format!(
            "n-of: negative required count {n}"
        )));
    }
    let mut required = n as usize;
    if required == 0 {
        return Ok(Value::from(true));
    }
    let rest = &args[1..];
    if required > rest.len() {
        return Err(IndeterminateError::processing_error(format!(
            "n-of: required count {required} exceeds the {} remaining arguments",
            rest.len()
        )));
    }

    let mut deferred: Option<IndeterminateError> = None;
    for arg in rest {
        match eval_bool(arg, ctx) {
            Ok(true) => {
                required -= 1;
                if required == 0 {
                    return Ok(Value::from(true));
                }
            }
            Ok(false) => {}
            Err(e) => deferred = Some(deferred.unwrap_or(e)),
        }
    }
    match deferred {
        Some(e) => Err(e),
        None => Ok(Value::from(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::StatusCode;

    fn lit(b: bool) -> Expression {
        Expression::Constant(Value::from(b))
    }

    fn int(i: i64) -> Expression {
        Expression::Constant(Value::Primitive(AttributeValue::Integer(i)))
    }

    /// An expression that fails evaluation: a must-be-present designator
    /// with no context would do, but a simpler probe is a designator
    /// evaluated without context.
    fn failing() -> Expression {
        Expression::Designator(crate::expression::AttributeDesignator {
            fqn: xacml_core::AttributeFqn::new("c", "a", None::<&str>),
            datatype: Datatype::Boolean,
            must_be_present: true,
        })
    }

    #[test]
    fn and_or_defaults() {
        assert_eq!(connective(&[], None, false).unwrap(), Value::from(true));
        assert_eq!(connective(&[], None, true).unwrap(), Value::from(false));
    }

    #[test]
    fn or_short_circuits_past_errors() {
        // An error followed by true: true wins, the error is masked.
        let out = connective(&[failing(), lit(true)], None, true).unwrap();
        assert_eq!(out, Value::from(true));
    }

    #[test]
    fn and_surfaces_deferred_error_without_decisive_arg() {
        let err = connective(&[failing(), lit(true)], None, false).unwrap_err();
        assert_eq!(err.status, StatusCode::ProcessingError);
    }

    #[test]
    fn n_of_counts() {
        let out = n_of(&[int(2), lit(true), lit(false), lit(true)], None).unwrap();
        assert_eq!(out, Value::from(true));
        let out = n_of(&[int(3), lit(true), lit(false), lit(true)], None).unwrap();
        assert_eq!(out, Value::from(false));
    }

    #[test]
    fn n_of_zero_is_true() {
        assert_eq!(n_of(&[int(0)], None).unwrap(), Value::from(true));
    }

    #[test]
    fn n_of_impossible_count_is_processing_error() {
        let err = n_of(&[int(3), lit(true)], None).unwrap_err();
        assert_eq!(err.status, StatusCode::ProcessingError);
    }
}
