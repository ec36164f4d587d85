//! String functions: concatenate, normalize, substring,
//! starts-with / ends-with / contains.
//!
//! XACML argument order for the part/whole functions: the part (prefix,
//! suffix, contained string) is argument #0, the containing string is
//! argument #1.

use xacml_core::{AttributeValue, Datatype, EvalResult, IndeterminateError, Value};

use super::{as_i64, as_str, as_uri, eager, eager_varargs, urn};
use crate::function::FunctionRegistry;

pub(super) fn register(registry: &mut FunctionRegistry) {
    let s = Datatype::String;

    registry.register(eager_varargs(
        urn("2.0", "string-concatenate"),
        vec![s.into(), s.into()],
        s.into(),
        s.into(),
        |args| {
            let mut out = String::new();
            for arg in args {
                out.push_str(as_str(arg)?);
            }
            Ok(AttributeValue::String(out).into())
        },
    ));

    registry.register(eager(
        urn("1.0", "string-normalize-space"),
        vec![s.into()],
        s.into(),
        |args| Ok(AttributeValue::String(as_str(&args[0])?.trim().to_string()).into()),
    ));

    registry.register(eager(
        urn("1.0", "string-normalize-to-lower-case"),
        vec![s.into()],
        s.into(),
        |args| Ok(AttributeValue::String(as_str(&args[0])?.to_lowercase()).into()),
    ));

    registry.register(eager(
        urn("3.0", "string-substring"),
        vec![s.into(), Datatype::Integer.into(), Datatype::Integer.into()],
        s.into(),
        |args| {
            let text = as_str(&args[0])?;
            substring(text, as_i64(&args[1])?, as_i64(&args[2])?)
                .map(|out| AttributeValue::String(out).into())
        },
    ));
    registry.register(eager(
        urn("3.0", "anyURI-substring"),
        vec![
            Datatype::AnyUri.into(),
            Datatype::Integer.into(),
            Datatype::Integer.into(),
        ],
        s.into(),
        |args| {
            let text = as_uri(&args[0])?;
            substring(text, as_i64(&args[1])?, as_i64(&args[2])?)
                .map(|out| AttributeValue::String(out).into())
        },
    ));

    let part_whole: [(&str, fn(&str, &str) -> bool); 3] = [
        ("starts-with", |part, whole| whole.starts_with(part)),
        ("ends-with", |part, whole| whole.ends_with(part)),
        ("contains", |part, whole| whole.contains(part)),
    ];
    for (suffix, test) in part_whole {
        registry.register(eager(
            urn("3.0", format_args!("string-{suffix}")),
            vec![s.into(), s.into()],
            Datatype::Boolean.into(),
            move |args| Ok(test(as_str(&args[0])?, as_str(&args[1])?).into()),
        ));
    }
}

/// XACML substring bounds: `begin` is a zero-based character offset,
/// `end` is exclusive; `end == -1` means end-of-string. Any other
/// out-of-range combination is a processing error.
fn substring(text: &str, begin: i64, end: i64) -> EvalResult<String> {
    let err = |msg: String| IndeterminateError::processing_error(msg);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;

    if begin < 0 {
        return Err(err(format!("substring: negative begin index {begin}")));
    }
    let end = if end == -1 { len } else { end };
    if end < 0 {
        return Err(err(format!("substring: negative end index {end}")));
    }
    if begin > len || end > len || begin > end {
        return Err(err(format!(
            "substring: range [{begin}, {end}) out of bounds for length {len}"
        )));
    }
    Ok(chars[begin as usize..end as usize].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use xacml_core::StatusCode;

    fn eval(id: &str, args: Vec<AttributeValue>) -> EvalResult<Value> {
        let registry = FunctionRegistry::standard();
        let f = registry.first_order(id).unwrap();
        let exprs = args
            .into_iter()
            .map(|v| Expression::Constant(Value::Primitive(v)))
            .collect();
        f.new_call(exprs, &[]).unwrap().evaluate(None)
    }

    fn s(v: &str) -> AttributeValue {
        AttributeValue::String(v.into())
    }

    fn i(v: i64) -> AttributeValue {
        AttributeValue::Integer(v)
    }

    #[test]
    fn concatenate() {
        let out = eval(
            "urn:oasis:names:tc:xacml:2.0:function:string-concatenate",
            vec![s("foo"), s(""), s("bar")],
        )
        .unwrap();
        assert_eq!(out, s("foobar").into());
    }

    #[test]
    fn substring_spec_cases() {
        let id = "urn:oasis:names:tc:xacml:3.0:function:string-substring";
        assert_eq!(
            eval(id, vec![s("First test"), i(0), i(5)]).unwrap(),
            s("First").into()
        );
        assert_eq!(
            eval(id, vec![s("First test"), i(6), i(-1)]).unwrap(),
            s("test").into()
        );
        for (begin, end) in [(6, 106), (106, -1), (-1, -1), (4, 2), (0, -2)] {
            let err = eval(id, vec![s("First test"), i(begin), i(end)]).unwrap_err();
            assert_eq!(err.status, StatusCode::ProcessingError, "({begin}, {end})");
        }
    }

    #[test]
    fn anyuri_substring_returns_string() {
        let id = "urn:oasis:names:tc:xacml:3.0:function:anyURI-substring";
        let uri = AttributeValue::AnyUri("http://www.example.com".into());
        assert_eq!(
            eval(id, vec![uri.clone(), i(0), i(7)]).unwrap(),
            s("http://").into()
        );
        assert_eq!(
            eval(id, vec![uri, i(11), i(-1)]).unwrap(),
            s("example.com").into()
        );
    }

    #[test]
    fn part_is_first_argument() {
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:3.0:function:string-starts-with",
                vec![s("First"), s("First test")]
            )
            .unwrap(),
            Value::from(true)
        );
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:3.0:function:string-contains",
                vec![s("st te"), s("First test")]
            )
            .unwrap(),
            Value::from(true)
        );
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:3.0:function:string-ends-with",
                vec![s("First test"), s("test")]
            )
            .unwrap(),
            Value::from(false)
        );
    }

    #[test]
    fn normalize() {
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:string-normalize-space",
                vec![s("  padded  ")]
            )
            .unwrap(),
            s("padded").into()
        );
        assert_eq!(
            eval(
                "urn:oasis:names:tc:xacml:1.0:function:string-normalize-to-lower-case",
                vec![s("MiXeD")]
            )
            .unwrap(),
            s("mixed").into()
        );
    }
}
