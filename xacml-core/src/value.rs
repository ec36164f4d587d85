//! Attribute values: the polymorphic primitive value type.
//!
//! One enum covers the 16 standard datatypes. Equality is datatype-specific:
//! temporal values compare by instant, binary values by decoded octets,
//! x500Names by normalized RDN sequence, rfc822Names with case-insensitive
//! domain. Cross-datatype values are never equal.
//!
//! Every value has a canonical lexical form (the `string-from-<T>` output)
//! and can be parsed from its lexical form (`<T>-from-string`), such that
//! parse ∘ print is the identity on canonical values.

use crate::datatype::Datatype;
use crate::error::{EvalResult, IndeterminateError};
use crate::names::{DnsName, IpAddress, Rfc822Name, X500Name};
use crate::temporal::{Date, DateTime, DayTimeDuration, Time, YearMonthDuration};
use base64::Engine;
use std::fmt;

/// A primitive attribute value of one of the 16 standard datatypes.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Time(Time),
    Date(Date),
    /// Boxed to keep the enum small.
    DateTime(Box<DateTime>),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    AnyUri(String),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
    X500Name(Box<X500Name>),
    Rfc822Name(Box<Rfc822Name>),
    IpAddress(Box<IpAddress>),
    DnsName(Box<DnsName>),
}

impl AttributeValue {
    /// The datatype of this value.
    pub fn datatype(&self) -> Datatype {
        match self {
            AttributeValue::String(_) => Datatype::String,
            AttributeValue::Boolean(_) => Datatype::Boolean,
            AttributeValue::Integer(_) => Datatype::Integer,
            AttributeValue::Double(_) => Datatype::Double,
            AttributeValue::Time(_) => Datatype::Time,
            AttributeValue::Date(_) => Datatype::Date,
            AttributeValue::DateTime(_) => Datatype::DateTime,
            AttributeValue::DayTimeDuration(_) => Datatype::DayTimeDuration,
            AttributeValue::YearMonthDuration(_) => Datatype::YearMonthDuration,
            AttributeValue::AnyUri(_) => Datatype::AnyUri,
            AttributeValue::HexBinary(_) => Datatype::HexBinary,
            AttributeValue::Base64Binary(_) => Datatype::Base64Binary,
            AttributeValue::X500Name(_) => Datatype::X500Name,
            AttributeValue::Rfc822Name(_) => Datatype::Rfc822Name,
            AttributeValue::IpAddress(_) => Datatype::IpAddress,
            AttributeValue::DnsName(_) => Datatype::DnsName,
        }
    }

    /// Parses a lexical form into a value of the given datatype.
    ///
    /// Fails with Indeterminate(syntax-error); `boolean` accepts exactly
    /// `"true"` / `"false"`.
    pub fn parse(datatype: Datatype, s: &str) -> EvalResult<Self> {
        let syntax = |msg: String| IndeterminateError::syntax_error(msg);
        match datatype {
            Datatype::String => Ok(AttributeValue::String(s.to_string())),
            Datatype::Boolean => match s {
                "true" => Ok(AttributeValue::Boolean(true)),
                "false" => Ok(AttributeValue::Boolean(false)),
                other => Err(syntax(format!("invalid boolean literal: {other:?}"))),
            },
            Datatype::Integer => s
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|_| syntax(format!("invalid integer literal: {s:?}"))),
            Datatype::Double => s
                .parse::<f64>()
                .map(AttributeValue::Double)
                .map_err(|_| syntax(format!("invalid double literal: {s:?}"))),
            Datatype::Time => Time::parse(s).map(AttributeValue::Time).map_err(syntax),
            Datatype::Date => Date::parse(s).map(AttributeValue::Date).map_err(syntax),
            Datatype::DateTime => DateTime::parse(s)
                .map(|dt| AttributeValue::DateTime(Box::new(dt)))
                .map_err(syntax),
            Datatype::DayTimeDuration => DayTimeDuration::parse(s)
                .map(AttributeValue::DayTimeDuration)
                .map_err(syntax),
            Datatype::YearMonthDuration => YearMonthDuration::parse(s)
                .map(AttributeValue::YearMonthDuration)
                .map_err(syntax),
            Datatype::AnyUri => Ok(AttributeValue::AnyUri(s.to_string())),
            Datatype::HexBinary => hex::decode(s)
                .map(AttributeValue::HexBinary)
                .map_err(|_| syntax(format!("invalid hexBinary literal: {s:?}"))),
            Datatype::Base64Binary => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(AttributeValue::Base64Binary)
                .map_err(|_| syntax(format!("invalid base64Binary literal: {s:?}"))),
            Datatype::X500Name => X500Name::parse(s)
                .map(|n| AttributeValue::X500Name(Box::new(n)))
                .map_err(syntax),
            Datatype::Rfc822Name => Rfc822Name::parse(s)
                .map(|n| AttributeValue::Rfc822Name(Box::new(n)))
                .map_err(syntax),
            Datatype::IpAddress => IpAddress::parse(s)
                .map(|n| AttributeValue::IpAddress(Box::new(n)))
                .map_err(syntax),
            Datatype::DnsName => DnsName::parse(s)
                .map(|n| AttributeValue::DnsName(Box::new(n)))
                .map_err(syntax),
        }
    }

    /// Canonical lexical form, the `string-from-<T>` output.
    pub fn canonical(&self) -> String {
        match self {
            AttributeValue::String(s) | AttributeValue::AnyUri(s) => s.clone(),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Double(d) => {
                // Keep a fraction part so the form re-parses as a double.
                if d.fract() == 0.0 && d.is_finite() && d.abs() < 1e15 {
                    format!("{d:.1}")
                } else {
                    d.to_string()
                }
            }
            AttributeValue::Time(t) => t.lexical().to_string(),
            AttributeValue::Date(d) => d.lexical().to_string(),
            AttributeValue::DateTime(dt) => dt.lexical().to_string(),
            AttributeValue::DayTimeDuration(d) => d.lexical(),
            AttributeValue::YearMonthDuration(d) => d.lexical(),
            AttributeValue::HexBinary(bytes) => hex::encode_upper(bytes),
            AttributeValue::Base64Binary(bytes) => {
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            AttributeValue::X500Name(n) => n.lexical().to_string(),
            AttributeValue::Rfc822Name(n) => n.lexical().to_string(),
            AttributeValue::IpAddress(n) => n.lexical(),
            AttributeValue::DnsName(n) => n.lexical().to_string(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// The result of any value-producing evaluation: a primitive or a bag.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Primitive(AttributeValue),
    Bag(crate::bag::Bag),
}

impl Value {
    pub fn datatype_id(&self) -> crate::datatype::DatatypeId {
        match self {
            Value::Primitive(v) => crate::datatype::DatatypeId::Primitive(v.datatype()),
            Value::Bag(b) => crate::datatype::DatatypeId::Bag(b.element_type()),
        }
    }

    /// Unwraps a primitive. Type checking at load time makes a bag here an
    /// engine bug, reported as processing-error rather than a panic.
    pub fn expect_primitive(&self) -> EvalResult<&AttributeValue> {
        match self {
            Value::Primitive(v) => Ok(v),
            Value::Bag(_) => Err(IndeterminateError::processing_error(
                "internal: expected primitive value, got bag",
            )),
        }
    }

    /// Unwraps a bag; see [`Value::expect_primitive`].
    pub fn expect_bag(&self) -> EvalResult<&crate::bag::Bag> {
        match self {
            Value::Bag(b) => Ok(b),
            Value::Primitive(_) => Err(IndeterminateError::processing_error(
                "internal: expected bag value, got primitive",
            )),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(v: AttributeValue) -> Self {
        Value::Primitive(v)
    }
}

impl From<crate::bag::Bag> for Value {
    fn from(b: crate::bag::Bag) -> Self {
        Value::Bag(b)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Primitive(AttributeValue::Boolean(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::ALL_DATATYPES;

    #[test]
    fn boolean_accepts_exact_literals_only() {
        assert_eq!(
            AttributeValue::parse(Datatype::Boolean, "true").unwrap(),
            AttributeValue::Boolean(true)
        );
        assert_eq!(
            AttributeValue::parse(Datatype::Boolean, "false").unwrap(),
            AttributeValue::Boolean(false)
        );
        let err = AttributeValue::parse(Datatype::Boolean, "error").unwrap_err();
        assert_eq!(err.status, crate::error::StatusCode::SyntaxError);
        assert!(AttributeValue::parse(Datatype::Boolean, "True").is_err());
        assert!(AttributeValue::parse(Datatype::Boolean, "1").is_err());
    }

    #[test]
    fn integer_parse() {
        assert_eq!(
            AttributeValue::parse(Datatype::Integer, "-5").unwrap(),
            AttributeValue::Integer(-5)
        );
        assert!(AttributeValue::parse(Datatype::Integer, "5.0").is_err());
    }

    #[test]
    fn canonical_round_trip_all_datatypes() {
        let samples = [
            (Datatype::String, "First test"),
            (Datatype::Boolean, "true"),
            (Datatype::Integer, "-5"),
            (Datatype::Double, "5.2"),
            (Datatype::Time, "09:30:15"),
            (Datatype::Date, "2002-09-24"),
            (Datatype::DateTime, "2002-09-24T09:30:15"),
            (Datatype::DayTimeDuration, "P1DT2H"),
            (Datatype::YearMonthDuration, "P1Y2M"),
            (Datatype::AnyUri, "http://www.example.com"),
            (Datatype::HexBinary, "0FB7"),
            (Datatype::Base64Binary, "RXhhbXBsZQ=="),
            (Datatype::X500Name, "cn=John Doe,o=Example,c=US"),
            (Datatype::Rfc822Name, "Anne.Anderson@sun.com"),
            (Datatype::IpAddress, "10.0.0.1"),
            (Datatype::DnsName, "example.com"),
        ];
        assert_eq!(samples.len(), ALL_DATATYPES.len());
        for (dt, lexical) in samples {
            let v = AttributeValue::parse(dt, lexical).unwrap();
            let reparsed = AttributeValue::parse(dt, &v.canonical()).unwrap();
            assert_eq!(v, reparsed, "round-trip failed for {dt:?}");
        }
    }

    #[test]
    fn double_canonical_keeps_fraction() {
        assert_eq!(AttributeValue::Double(5.0).canonical(), "5.0");
        assert_eq!(AttributeValue::Double(5.2).canonical(), "5.2");
    }

    #[test]
    fn hex_binary_equality_by_octets() {
        let a = AttributeValue::parse(Datatype::HexBinary, "0fb7").unwrap();
        let b = AttributeValue::parse(Datatype::HexBinary, "0FB7").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canonical(), "0FB7");
    }

    #[test]
    fn cross_type_values_never_equal() {
        let s = AttributeValue::String("5".to_string());
        let i = AttributeValue::Integer(5);
        assert_ne!(s, i);
    }
}
