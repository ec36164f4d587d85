//! Special matchers: x500Name-match, rfc822Name-match and the anyURI
//! part/whole functions.
//!
//! The XACML argument order puts the pattern/part first: for
//! `rfc822Name-match` the string pattern is arg #0, for the anyURI
//! functions the string part is arg #0 and the URI is arg #1.

use xacml_core::{AttributeValue, Datatype, IndeterminateError, Value};

use super::{as_prim, as_str, as_uri, eager, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(eager(
        urn("1.0", "x500Name-match"),
        vec![Datatype::X500Name.into(), Datatype::X500Name.into()],
        Datatype::Boolean.into(),
        |args| {
            let (a, b) = match (as_prim(&args[0])?, as_prim(&args[1])?) {
                (AttributeValue::X500Name(a), AttributeValue::X500Name(b)) => (a, b),
                _ => {
                    return Err(IndeterminateError::processing_error(
                        "internal: x500Name-match arguments are not x500Names",
                    ))
                }
            };
            Ok(a.matches_terminal_of(b).into())
        },
    ));

    registry.register(eager(
        urn("1.0", "rfc822Name-match"),
        vec![Datatype::String.into(), Datatype::Rfc822Name.into()],
        Datatype::Boolean.into(),
        |args| {
            let pattern = as_str(&args[0])?;
            let AttributeValue::Rfc822Name(name) = as_prim(&args[1])? else {
                return Err(IndeterminateError::processing_error(
                    "internal: rfc822Name-match second argument is not an rfc822Name",
                ));
            };
            Ok(name.matches_pattern(pattern).into())
        },
    ));

    let part_whole: [(&str, fn(&str, &str) -> bool); 3] = [
        ("anyURI-starts-with", |part, uri| uri.starts_with(part)),
        ("anyURI-ends-with", |part, uri| uri.ends_with(part)),
        ("anyURI-contains", |part, uri| uri.contains(part)),
    ];
    for (name, test) in part_whole {
        registry.register(eager(
            urn("3.0", name),
            vec![Datatype::String.into(), Datatype::AnyUri.into()],
            Datatype::Boolean.into(),
            move |args| Ok(test(as_str(&args[0])?, as_uri(&args[1])?).into()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn eval(id: &str, args: Vec<AttributeValue>) -> Value {
        let registry = FunctionRegistry::standard();
        let f = registry.first_order(id).unwrap();
        let exprs = args
            .into_iter()
            .map(|v| Expression::Constant(Value::Primitive(v)))
            .collect();
        f.new_call(exprs, &[]).unwrap().evaluate(None).unwrap()
    }

    #[test]
    fn x500_match() {
        let suffix = AttributeValue::parse(Datatype::X500Name, "o=Example,c=US").unwrap();
        let full =
            AttributeValue::parse(Datatype::X500Name, "cn=John Doe,o=Example,c=US").unwrap();
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:x500Name-match",
                vec![suffix, full]
            ),
            Value::from(true)
        );
    }

    #[test]
    fn rfc822_match_domain_pattern() {
        let name = AttributeValue::parse(Datatype::Rfc822Name, "anne@east.sun.com").unwrap();
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:rfc822Name-match",
                vec![AttributeValue::String(".sun.com".into()), name]
            ),
            Value::from(true)
        );
    }

    #[test]
    fn anyuri_part_is_first_argument() {
        let uri = AttributeValue::AnyUri("http://www.example.com".into());
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:3.0:function:anyURI-starts-with",
                vec![AttributeValue::String("http://".into()), uri.clone()]
            ),
            Value::from(true)
        );
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:3.0:function:anyURI-contains",
                vec![AttributeValue::String("example".into()), uri]
            ),
            Value::from(true)
        );
    }
}
