//! Immutable bags of same-typed primitive values.
//!
//! XACML §7.3.5 requires attribute bags to behave as if fully populated
//! before first use and immutable thereafter. `Bag` enforces this
//! structurally: the element slice is behind an `Arc` and there is no
//! mutating API. Clones share the same storage.

use crate::datatype::Datatype;
use crate::error::{PdpError, Result};
use crate::value::AttributeValue;
use std::fmt;
use std::sync::Arc;

/// An ordered, possibly empty multiset of primitives of one datatype.
#[derive(Clone, Debug)]
pub struct Bag {
    element_type: Datatype,
    values: Arc<[AttributeValue]>,
}

impl Bag {
    /// Builds a bag, checking every element against the declared datatype.
    pub fn new(element_type: Datatype, values: Vec<AttributeValue>) -> Result<Self> {
        for v in &values {
            if v.datatype() != element_type {
                return Err(PdpError::InvalidArgument(format!(
                    "bag of {} cannot hold a {} value",
                    element_type.uri(),
                    v.datatype().uri()
                )));
            }
        }
        Ok(Self {
            element_type,
            values: values.into(),
        })
    }

    /// The empty bag of the given element type.
    pub fn empty(element_type: Datatype) -> Self {
        Self {
            element_type,
            values: Arc::from(Vec::new()),
        }
    }

    /// Single-element bag.
    pub fn singleton(value: AttributeValue) -> Self {
        Self {
            element_type: value.datatype(),
            values: Arc::from(vec![value]),
        }
    }

    pub fn element_type(&self) -> Datatype {
        self.element_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Membership test using datatype-specific equality.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// The sole element, if this bag has exactly one.
    pub fn single(&self) -> Option<&AttributeValue> {
        match &*self.values {
            [v] => Some(v),
            _ => None,
        }
    }

    /// True iff the two bags share the same storage. Used by tests asserting
    /// bag identity across repeated designator evaluations.
    pub fn same_instance(&self, other: &Bag) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl PartialEq for Bag {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type && self.values == other.values
    }
}

// Renders as `{v1, v2, ...}` for error messages.
impl fmt::Display for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_bag(items: &[&str]) -> Bag {
        Bag::new(
            Datatype::String,
            items.iter().map(|s| AttributeValue::String(s.to_string())).collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_mixed_types() {
        let err = Bag::new(
            Datatype::String,
            vec![AttributeValue::Integer(1)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn contains_and_single() {
        let bag = string_bag(&["a", "test", "b"]);
        assert!(bag.contains(&AttributeValue::String("test".into())));
        assert!(!bag.contains(&AttributeValue::String("missing".into())));
        assert_eq!(bag.single(), None);
        assert_eq!(
            Bag::singleton(AttributeValue::Integer(7)).single(),
            Some(&AttributeValue::Integer(7))
        );
    }

    #[test]
    fn clones_share_storage() {
        let bag = string_bag(&["x"]);
        let clone = bag.clone();
        assert!(bag.same_instance(&clone));
    }

    #[test]
    fn equal_by_contents() {
        assert_eq!(string_bag(&["a", "b"]), string_bag(&["a", "b"]));
        assert_ne!(string_bag(&["a", "b"]), string_bag(&["b", "a"]));
        assert_ne!(Bag::empty(Datatype::String), Bag::empty(Datatype::Integer));
    }
}
