//! Type conversions: `<T>-from-string` and `string-from-<T>`.
//!
//! Parsing failures are syntax errors; printing uses each value's canonical
//! lexical form, so parse ∘ print is the identity.

use xacml_core::{AttributeValue, Datatype, Value};

use super::{as_prim, as_str, eager, urn};
use crate::function::FunctionRegistry;

/// Datatypes with standard string conversions (everything except string
/// itself and the binary types).
const CONVERTIBLE: [Datatype; 13] = [
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::AnyUri,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::IpAddress,
    Datatype::DnsName,
];

pub(super) fn register(registry: &mut FunctionRegistry) {
    for dt in CONVERTIBLE {
        let name = dt.function_name();
        registry.register(eager(
            urn("3.0", format_args!("{name}-from-string")),
            vec![Datatype::String.into()],
            dt.into(),
            move |args| AttributeValue::parse(dt, as_str(&args[0])?).map(Value::Primitive),
        ));
        registry.register(eager(
            urn("3.0", format_args!("string-from-{name}")),
            vec![dt.into()],
            Datatype::String.into(),
            |args| Ok(AttributeValue::String(as_prim(&args[0])?.canonical()).into()),
        ));
    }
}
