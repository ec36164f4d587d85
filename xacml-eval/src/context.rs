//! The per-request evaluation context.
//!
//! One context exists per individual decision request, lives on one thread,
//! and is dropped when the decision is returned. Memoization (variable
//! values, selector results) uses `RefCell`; the context is never shared,
//! so no locking (and no `Sync`) is needed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use xacml_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, EvalResult, IndeterminateError,
    IndividualDecisionRequest, Value,
};

/// Resource bounds enforced during evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalLimits {
    /// Maximum number of values per attribute bag.
    pub max_attribute_bag_size: usize,
    /// Maximum Cartesian product size a higher-order bag function may
    /// enumerate.
    pub max_higher_order_product: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_attribute_bag_size: 1000,
            max_higher_order_product: 1_000_000,
        }
    }
}

/// Pluggable XPath evaluation seam for AttributeSelectors.
///
/// Given a category's Content and an XPath expression, returns the selected
/// nodes converted to the expected datatype.
pub trait XPathEvaluator: std::fmt::Debug + Send + Sync {
    fn select(
        &self,
        content: &str,
        path: &str,
        datatype: Datatype,
    ) -> EvalResult<Vec<AttributeValue>>;
}

/// Default XPath seam: AttributeSelector evaluation is not supported.
#[derive(Debug, Default)]
pub struct XPathUnsupported;

impl XPathEvaluator for XPathUnsupported {
    fn select(&self, _: &str, path: &str, _: Datatype) -> EvalResult<Vec<AttributeValue>> {
        Err(IndeterminateError::processing_error(format!(
            "AttributeSelector {path:?}: no XPath evaluator is configured"
        )))
    }
}

type SelectorKey = (Arc<str>, Arc<str>, Datatype);

/// Process-local mutable state of one request evaluation.
pub struct EvaluationContext<'req> {
    request: &'req IndividualDecisionRequest,
    limits: EvalLimits,
    xpath: &'req dyn XPathEvaluator,
    /// Memoized variable values, keyed by definition identity.
    variable_cache: RefCell<HashMap<usize, Value>>,
    /// Memoized selector results, keyed by (category, path, datatype).
    selector_cache: RefCell<HashMap<SelectorKey, Bag>>,
}

impl<'req> EvaluationContext<'req> {
    pub fn new(
        request: &'req IndividualDecisionRequest,
        limits: EvalLimits,
        xpath: &'req dyn XPathEvaluator,
    ) -> Self {
        Self {
            request,
            limits,
            xpath,
            variable_cache: RefCell::new(HashMap::new()),
            selector_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn request(&self) -> &IndividualDecisionRequest {
        self.request
    }

    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    /// The request bag for a designator, if present with the expected
    /// element datatype. The returned clone shares the frozen storage.
    pub fn attribute_bag(&self, fqn: &AttributeFqn, datatype: Datatype) -> Option<Bag> {
        self.request
            .attribute_bag(fqn)
            .filter(|bag| bag.element_type() == datatype)
            .cloned()
    }

    pub(crate) fn cached_variable(&self, key: usize) -> Option<Value> {
        self.variable_cache.borrow().get(&key).cloned()
    }

    pub(crate) fn memoize_variable(&self, key: usize, value: Value) {
        self.variable_cache.borrow_mut().insert(key, value);
    }

    pub(crate) fn cached_selector(&self, key: &SelectorKey) -> Option<Bag> {
        self.selector_cache.borrow().get(key).cloned()
    }

    /// Runs the configured XPath evaluator and memoizes the frozen result.
    pub(crate) fn evaluate_selector(
        &self,
        category: &Arc<str>,
        path: &Arc<str>,
        datatype: Datatype,
    ) -> EvalResult<Option<Bag>> {
        let key = (Arc::clone(category), Arc::clone(path), datatype);
        if let Some(bag) = self.cached_selector(&key) {
            return Ok(Some(bag));
        }
        let Some(content) = self.request.extra_content(category) else {
            return Ok(None);
        };
        let values = self.xpath.select(content, path, datatype)?;
        if values.len() > self.limits.max_attribute_bag_size {
            return Err(IndeterminateError::processing_error(format!(
                "AttributeSelector {path:?} produced {} values, exceeding the configured maximum of {}",
                values.len(),
                self.limits.max_attribute_bag_size
            )));
        }
        for v in &values {
            if v.datatype() != datatype {
                return Err(IndeterminateError::syntax_error(format!(
                    "AttributeSelector {path:?}: node converted to {} where {} was expected",
                    v.datatype().uri(),
                    datatype.uri()
                )));
            }
        }
        let bag = Bag::new(datatype, values)
            .map_err(|e| IndeterminateError::processing_error(e.to_string()))?;
        self.selector_cache.borrow_mut().insert(key, bag.clone());
        Ok(Some(bag))
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::attribute::categories;

    #[test]
    fn attribute_bag_requires_matching_datatype() {
        let fqn = AttributeFqn::new(categories::RESOURCE, "resource-id", None::<&str>);
        let bag = Bag::new(
            Datatype::String,
            vec![AttributeValue::String("doc-1".into())],
        )
        .unwrap();
        let request = IndividualDecisionRequest::new(
            HashMap::from([(fqn.clone(), bag)]),
            HashMap::new(),
        );
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);

        assert!(ctx.attribute_bag(&fqn, Datatype::String).is_some());
        assert!(ctx.attribute_bag(&fqn, Datatype::Integer).is_none());
    }

    #[test]
    fn repeated_lookup_yields_same_bag_instance() {
        let fqn = AttributeFqn::new(categories::RESOURCE, "resource-id", None::<&str>);
        let bag = Bag::new(
            Datatype::String,
            vec![AttributeValue::String("doc-1".into())],
        )
        .unwrap();
        let request = IndividualDecisionRequest::new(
            HashMap::from([(fqn.clone(), bag)]),
            HashMap::new(),
        );
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);

        let a = ctx.attribute_bag(&fqn, Datatype::String).unwrap();
        let b = ctx.attribute_bag(&fqn, Datatype::String).unwrap();
        assert!(a.same_instance(&b));
    }
}
