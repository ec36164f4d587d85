//! Attribute datatype identifiers.
//!
//! The 16 standard XACML 3.0 primitive datatypes, each with a unique
//! bag-of-T companion. Every [`crate::Value`] reports a [`DatatypeId`];
//! function signatures are checked against these at policy load.

use std::fmt;

/// A standard XACML primitive datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Datatype {
    String,
    Boolean,
    Integer,
    Double,
    Time,
    Date,
    DateTime,
    DayTimeDuration,
    YearMonthDuration,
    AnyUri,
    HexBinary,
    Base64Binary,
    X500Name,
    Rfc822Name,
    IpAddress,
    DnsName,
}

/// All primitive datatypes, in registry order.
pub const ALL_DATATYPES: [Datatype; 16] = [
    Datatype::String,
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::AnyUri,
    Datatype::HexBinary,
    Datatype::Base64Binary,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::IpAddress,
    Datatype::DnsName,
];

impl Datatype {
    /// The standard datatype URI.
    pub fn uri(self) -> &'static str {
        match self {
            Datatype::String => "http://www.w3.org/2001/XMLSchema#string",
            Datatype::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Datatype::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Datatype::Double => "http://www.w3.org/2001/XMLSchema#double",
            Datatype::Time => "http://www.w3.org/2001/XMLSchema#time",
            Datatype::Date => "http://www.w3.org/2001/XMLSchema#date",
            Datatype::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Datatype::DayTimeDuration => "http://www.w3.org/2001/XMLSchema#dayTimeDuration",
            Datatype::YearMonthDuration => "http://www.w3.org/2001/XMLSchema#yearMonthDuration",
            Datatype::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Datatype::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Datatype::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Datatype::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            Datatype::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            Datatype::IpAddress => "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress",
            Datatype::DnsName => "urn:oasis:names:tc:xacml:2.0:data-type:dnsName",
        }
    }

    /// Resolves a datatype URI. Returns `None` for non-standard URIs.
    pub fn from_uri(uri: &str) -> Option<Self> {
        ALL_DATATYPES.into_iter().find(|dt| dt.uri() == uri)
    }

    /// Short name used in standard function identifiers, e.g. `anyURI` in
    /// `urn:oasis:names:tc:xacml:1.0:function:anyURI-equal`.
    pub fn function_name(self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Boolean => "boolean",
            Datatype::Integer => "integer",
            Datatype::Double => "double",
            Datatype::Time => "time",
            Datatype::Date => "date",
            Datatype::DateTime => "dateTime",
            Datatype::DayTimeDuration => "dayTimeDuration",
            Datatype::YearMonthDuration => "yearMonthDuration",
            Datatype::AnyUri => "anyURI",
            Datatype::HexBinary => "hexBinary",
            Datatype::Base64Binary => "base64Binary",
            Datatype::X500Name => "x500Name",
            Datatype::Rfc822Name => "rfc822Name",
            Datatype::IpAddress => "ipAddress",
            Datatype::DnsName => "dnsName",
        }
    }

    /// The bag-of-self companion datatype.
    pub fn bag_of(self) -> DatatypeId {
        DatatypeId::Bag(self)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Datatype of a [`crate::Value`]: a primitive or a bag of one primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatatypeId {
    Primitive(Datatype),
    Bag(Datatype),
}

impl DatatypeId {
    /// The element type if this is a bag datatype.
    pub fn bag_element_type(self) -> Option<Datatype> {
        match self {
            DatatypeId::Bag(dt) => Some(dt),
            DatatypeId::Primitive(_) => None,
        }
    }

    pub fn is_bag(self) -> bool {
        matches!(self, DatatypeId::Bag(_))
    }

    /// The underlying primitive type, for both primitive and bag forms.
    pub fn primitive(self) -> Datatype {
        match self {
            DatatypeId::Primitive(dt) | DatatypeId::Bag(dt) => dt,
        }
    }
}

impl From<Datatype> for DatatypeId {
    fn from(dt: Datatype) -> Self {
        DatatypeId::Primitive(dt)
    }
}

impl fmt::Display for DatatypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatatypeId::Primitive(dt) => write!(f, "{}", dt.uri()),
            DatatypeId::Bag(dt) => write!(f, "bag<{}>", dt.uri()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        for dt in ALL_DATATYPES {
            assert_eq!(Datatype::from_uri(dt.uri()), Some(dt));
        }
    }

    #[test]
    fn unknown_uri() {
        assert_eq!(Datatype::from_uri("http://www.w3.org/2001/XMLSchema#float"), None);
    }

    #[test]
    fn bag_companion() {
        let bag = Datatype::String.bag_of();
        assert!(bag.is_bag());
        assert_eq!(bag.bag_element_type(), Some(Datatype::String));
        assert_eq!(bag.primitive(), Datatype::String);
    }
}
