//! Fully-qualified attribute names.

use std::fmt;
use std::sync::Arc;

/// Standard XACML 3.0 attribute category URIs.
pub mod categories {
    pub const ACCESS_SUBJECT: &str =
        "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
    pub const RESOURCE: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
    pub const ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
    pub const ENVIRONMENT: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";
}

/// A fully-qualified attribute name: (category, attribute id, optional
/// issuer).
///
/// Issuer semantics depend on the PDP's issuer-match mode:
/// - strict: a missing issuer matches only a missing issuer
/// - lax: a designator without issuer also matches request attributes that
///   carry one (the preprocessor indexes those under the issuer-less FQN too)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeFqn {
    category: Arc<str>,
    id: Arc<str>,
    issuer: Option<Arc<str>>,
}

impl AttributeFqn {
    pub fn new(
        category: impl Into<Arc<str>>,
        id: impl Into<Arc<str>>,
        issuer: Option<impl Into<Arc<str>>>,
    ) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            issuer: issuer.map(Into::into),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// The same name without its issuer. Cheap: shares the interned parts.
    pub fn without_issuer(&self) -> Self {
        Self {
            category: Arc::clone(&self.category),
            id: Arc::clone(&self.id),
            issuer: None,
        }
    }
}

impl fmt::Display for AttributeFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.id)?;
        if let Some(issuer) = &self.issuer {
            write!(f, "#{issuer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_distinguishes_names() {
        let a = AttributeFqn::new(categories::ACCESS_SUBJECT, "subject-id", None::<&str>);
        let b = AttributeFqn::new(categories::ACCESS_SUBJECT, "subject-id", Some("issuer-x"));
        assert_ne!(a, b);
        assert_eq!(b.without_issuer(), a);
    }
}
