//! The XACML 3.0 standard function set.
//!
//! One module per category, mirroring the standard's own grouping. Each
//! module exposes `register(&mut FunctionRegistry)`; [`register_standard`]
//! wires them all. Function ids follow the standard URNs; where XACML 3.0
//! re-published a 1.x function under a new URN, both are registered.

mod arithmetic;
mod bags;
mod compare;
mod conversion;
mod duration;
mod equality;
mod logical;
mod matchers;
mod regexp;
mod sets;
mod strings;

use std::fmt::Display;

use xacml_core::{AttributeValue, Bag, Datatype, DatatypeId, EvalResult, IndeterminateError, Value};

use crate::function::{FirstOrderFunction, FunctionRegistry, Kernel, Signature};
use crate::higher_order::HigherOrderKind;

/// Registers the complete standard function set plus the higher-order
/// function ids.
pub fn register_standard(registry: &mut FunctionRegistry) {
    equality::register(registry);
    arithmetic::register(registry);
    compare::register(registry);
    duration::register(registry);
    logical::register(registry);
    strings::register(registry);
    conversion::register(registry);
    regexp::register(registry);
    bags::register(registry);
    sets::register(registry);
    matchers::register(registry);

    for version in ["1.0", "3.0"] {
        registry.register_higher_order(urn(version, "any-of"), HigherOrderKind::AnyOf);
        registry.register_higher_order(urn(version, "all-of"), HigherOrderKind::AllOf);
        registry.register_higher_order(urn(version, "any-of-any"), HigherOrderKind::AnyOfAny);
        registry.register_higher_order(urn(version, "all-of-any"), HigherOrderKind::AllOfAny);
        registry.register_higher_order(urn(version, "any-of-all"), HigherOrderKind::AnyOfAll);
        registry.register_higher_order(urn(version, "all-of-all"), HigherOrderKind::AllOfAll);
    }
    registry.register_higher_order(urn("3.0", "map"), HigherOrderKind::Map);
    registry.register_higher_order(urn("1.0", "map"), HigherOrderKind::Map);
}

/// Standard function URN.
pub(crate) fn urn(version: &str, name: impl Display) -> String {
    format!("urn:oasis:names:tc:xacml:{version}:function:{name}")
}

/// URN version under which a datatype's 1.x-family functions (equal, bag,
/// set) were introduced.
pub(crate) fn family_version(dt: Datatype) -> &'static str {
    match dt {
        Datatype::IpAddress | Datatype::DnsName => "2.0",
        _ => "1.0",
    }
}

pub(crate) fn eager(
    id: String,
    params: Vec<DatatypeId>,
    ret: DatatypeId,
    kernel: impl Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
) -> FirstOrderFunction {
    FirstOrderFunction::new(id, Signature::fixed(params), ret, Kernel::Eager(Box::new(kernel)))
}

pub(crate) fn eager_varargs(
    id: String,
    params: Vec<DatatypeId>,
    tail: DatatypeId,
    ret: DatatypeId,
    kernel: impl Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
) -> FirstOrderFunction {
    FirstOrderFunction::new(
        id,
        Signature::varargs(params, tail),
        ret,
        Kernel::Eager(Box::new(kernel)),
    )
}

/// Signature checking happens at load; a shape mismatch here is an engine
/// bug surfaced as processing-error, never a panic.
fn internal(expected: &str) -> IndeterminateError {
    IndeterminateError::processing_error(format!("internal: argument is not a {expected}"))
}

pub(crate) fn as_prim(v: &Value) -> EvalResult<&AttributeValue> {
    v.expect_primitive()
}

pub(crate) fn as_bag(v: &Value) -> EvalResult<&Bag> {
    v.expect_bag()
}

pub(crate) fn as_str(v: &Value) -> EvalResult<&str> {
    match v {
        Value::Primitive(AttributeValue::String(s)) => Ok(s),
        _ => Err(internal("string")),
    }
}

pub(crate) fn as_uri(v: &Value) -> EvalResult<&str> {
    match v {
        Value::Primitive(AttributeValue::AnyUri(s)) => Ok(s),
        _ => Err(internal("anyURI")),
    }
}

pub(crate) fn as_bool(v: &Value) -> EvalResult<bool> {
    match v {
        Value::Primitive(AttributeValue::Boolean(b)) => Ok(*b),
        _ => Err(internal("boolean")),
    }
}

pub(crate) fn as_i64(v: &Value) -> EvalResult<i64> {
    match v {
        Value::Primitive(AttributeValue::Integer(i)) => Ok(*i),
        _ => Err(internal("integer")),
    }
}

pub(crate) fn as_f64(v: &Value) -> EvalResult<f64> {
    match v {
        Value::Primitive(AttributeValue::Double(d)) => Ok(*d),
        _ => Err(internal("double")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_spec_surface() {
        let registry = FunctionRegistry::standard();
        let present = [
            "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            "urn:oasis:names:tc:xacml:1.0:function:boolean-equal",
            "urn:oasis:names:tc:xacml:1.0:function:integer-add",
            "urn:oasis:names:tc:xacml:1.0:function:and",
            "urn:oasis:names:tc:xacml:1.0:function:n-of",
            "urn:oasis:names:tc:xacml:2.0:function:string-concatenate",
            "urn:oasis:names:tc:xacml:3.0:function:string-substring",
            "urn:oasis:names:tc:xacml:3.0:function:boolean-from-string",
            "urn:oasis:names:tc:xacml:3.0:function:string-from-integer",
            "urn:oasis:names:tc:xacml:1.0:function:string-regexp-match",
            "urn:oasis:names:tc:xacml:1.0:function:string-one-and-only",
            "urn:oasis:names:tc:xacml:1.0:function:string-bag",
            "urn:oasis:names:tc:xacml:1.0:function:string-intersection",
            "urn:oasis:names:tc:xacml:1.0:function:string-set-equals",
            "urn:oasis:names:tc:xacml:1.0:function:x500Name-match",
            "urn:oasis:names:tc:xacml:1.0:function:rfc822Name-match",
            "urn:oasis:names:tc:xacml:3.0:function:anyURI-starts-with",
            "urn:oasis:names:tc:xacml:2.0:function:time-in-range",
            "urn:oasis:names:tc:xacml:3.0:function:dateTime-add-dayTimeDuration",
            "urn:oasis:names:tc:xacml:2.0:function:ipAddress-regexp-match",
            "urn:oasis:names:tc:xacml:3.0:function:any-of",
            "urn:oasis:names:tc:xacml:3.0:function:all-of-all",
            "urn:oasis:names:tc:xacml:3.0:function:map",
        ];
        for id in present {
            assert!(registry.contains(id), "missing standard function: {id}");
        }
    }
}
