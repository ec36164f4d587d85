//! The frozen, preprocessed decision request handed to evaluation.

use crate::attribute::AttributeFqn;
use crate::bag::Bag;
use std::collections::HashMap;
use std::sync::Arc;

/// One individual decision request: named attribute bags plus per-category
/// extra content. Immutable once built (XACML §7.3.5); the preprocessor in
/// `xacml-pdp` is the only producer.
#[derive(Debug, Clone, Default)]
pub struct IndividualDecisionRequest {
    named_attributes: HashMap<AttributeFqn, Bag>,
    extra_contents: HashMap<Arc<str>, Arc<str>>,
}

impl IndividualDecisionRequest {
    pub fn new(
        named_attributes: HashMap<AttributeFqn, Bag>,
        extra_contents: HashMap<Arc<str>, Arc<str>>,
    ) -> Self {
        Self {
            named_attributes,
            extra_contents,
        }
    }

    /// The frozen bag for a fully-qualified attribute name, if present.
    pub fn attribute_bag(&self, fqn: &AttributeFqn) -> Option<&Bag> {
        self.named_attributes.get(fqn)
    }

    /// The raw Content of a category, if the request carried one.
    pub fn extra_content(&self, category: &str) -> Option<&str> {
        self.extra_contents.get(category).map(|s| s.as_ref())
    }

    pub fn named_attributes(&self) -> impl Iterator<Item = (&AttributeFqn, &Bag)> {
        self.named_attributes.iter()
    }
}
