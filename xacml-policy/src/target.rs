//! Target matching.
//!
//! A Target is a conjunction of AnyOf elements; an AnyOf is a disjunction
//! of AllOf elements; an AllOf is a conjunction of Match elements. A Match
//! applies its function to (literal, element) for each element of the
//! fetched bag and is true if any application is true.
//!
//! Error precedence follows the XACML 3.0 match tables: a definitive
//! "no match" beats a pending Indeterminate at the conjunction levels, a
//! definitive "match" beats one at the disjunction levels.

use xacml_core::{AttributeValue, Datatype, EvalResult, IndeterminateError, PdpError, Result, Value};
use xacml_eval::{
    AttributeDesignator, AttributeSelector, EvaluationContext, Expression, FirstOrderCall,
    FunctionRegistry,
};

use crate::tree::{MatchNode, MatchSourceNode, TargetNode};

/// Where a Match fetches its bag from.
#[derive(Debug, Clone)]
enum MatchSource {
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
}

impl MatchSource {
    fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult<xacml_core::Bag> {
        match self {
            MatchSource::Designator(d) => d.evaluate(Some(ctx)),
            MatchSource::Selector(s) => s.evaluate(Some(ctx)),
        }
    }

    fn datatype(&self) -> Datatype {
        match self {
            MatchSource::Designator(d) => d.datatype,
            MatchSource::Selector(s) => s.datatype,
        }
    }
}

/// One `<Match>`: a bound match-function call plus the attribute source.
#[derive(Debug, Clone)]
pub struct Match {
    call: FirstOrderCall,
    source: MatchSource,
}

impl Match {
    /// Builds a Match, checking the function against (literal datatype,
    /// fetched element datatype) and a boolean return type.
    pub fn new(node: &MatchNode, registry: &FunctionRegistry) -> Result<Self> {
        let func = registry
            .first_order(&node.function_id)
            .ok_or_else(|| PdpError::UnknownFunction(node.function_id.clone()))?;
        if func.return_type() != Datatype::Boolean.into() {
            return Err(PdpError::InvalidArgument(format!(
                "match function '{}' does not return boolean",
                node.function_id
            )));
        }

        let source = match &node.source {
            MatchSourceNode::Designator {
                category,
                id,
                issuer,
                datatype,
                must_be_present,
            } => MatchSource::Designator(AttributeDesignator {
                fqn: xacml_core::AttributeFqn::new(
                    category.as_str(),
                    id.as_str(),
                    issuer.as_deref(),
                ),
                datatype: *datatype,
                must_be_present: *must_be_present,
            }),
            MatchSourceNode::Selector {
                category,
                path,
                datatype,
                must_be_present,
            } => MatchSource::Selector(AttributeSelector {
                category: category.as_str().into(),
                path: path.as_str().into(),
                datatype: *datatype,
                must_be_present: *must_be_present,
            }),
        };

        let literal = Expression::Constant(Value::Primitive(node.literal.clone()));
        let call = func.new_call(vec![literal], &[source.datatype().into()])?;
        Ok(Self { call, source })
    }

    /// True iff the function matches any element of the fetched bag.
    pub fn matches(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        let bag = self.source.evaluate(ctx)?;
        let mut deferred: Option<IndeterminateError> = None;
        for element in bag.iter() {
            match self.call.evaluate_with_trailing(Some(ctx), &[element.clone()]) {
                Ok(Value::Primitive(AttributeValue::Boolean(true))) => return Ok(true),
                Ok(_) => {}
                Err(e) => deferred = Some(deferred.unwrap_or(e)),
            }
        }
        match deferred {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// A compiled Target. An empty Target matches every request.
#[derive(Debug, Clone, Default)]
pub struct Target {
    any_ofs: Vec<Vec<Vec<Match>>>,
}

impl Target {
    /// Compiles a Target node; `None` compiles to the always-matching
    /// empty target.
    pub fn new(node: Option<&TargetNode>, registry: &FunctionRegistry) -> Result<Self> {
        let Some(node) = node else {
            return Ok(Self::default());
        };
        let any_ofs = node
            .any_ofs
            .iter()
            .map(|any_of| {
                any_of
                    .all_ofs
                    .iter()
                    .map(|all_of| {
                        all_of
                            .matches
                            .iter()
                            .map(|m| Match::new(m, registry))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { any_ofs })
    }

    /// No AnyOf present: applicable to every request.
    pub fn is_empty(&self) -> bool {
        self.any_ofs.is_empty()
    }

    /// Evaluates the target; `Err` is target-Indeterminate.
    pub fn matches(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        let mut deferred: Option<IndeterminateError> = None;
        for any_of in &self.any_ofs {
            match Self::any_of_matches(any_of, ctx) {
                // one non-matching AnyOf settles the target
                Ok(false) => return Ok(false),
                Ok(true) => {}
                Err(e) => deferred = Some(deferred.unwrap_or(e)),
            }
        }
        match deferred {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    fn any_of_matches(all_ofs: &[Vec<Match>], ctx: &EvaluationContext) -> EvalResult<bool> {
        let mut deferred: Option<IndeterminateError> = None;
        for all_of in all_ofs {
            match Self::all_of_matches(all_of, ctx) {
                // one matching AllOf settles the AnyOf
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => deferred = Some(deferred.unwrap_or(e)),
            }
        }
        match deferred {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    fn all_of_matches(matches: &[Match], ctx: &EvaluationContext) -> EvalResult<bool> {
        let mut deferred: Option<IndeterminateError> = None;
        for m in matches {
            match m.matches(ctx) {
                Ok(false) => return Ok(false),
                Ok(true) => {}
                Err(e) => deferred = Some(deferred.unwrap_or(e)),
            }
        }
        match deferred {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AllOfNode, AnyOfNode};
    use std::collections::HashMap;
    use xacml_core::attribute::categories;
    use xacml_core::{AttributeFqn, Bag, IndividualDecisionRequest, StatusCode};
    use xacml_eval::{EvalLimits, XPathUnsupported};

    const STRING_EQUAL: &str = "urn:oasis:names:tc:xacml:1.0:function:string-equal";

    fn subject_id_match(function_id: &str, literal: &str, must_be_present: bool) -> MatchNode {
        MatchNode {
            function_id: function_id.into(),
            literal: AttributeValue::String(literal.into()),
            source: MatchSourceNode::Designator {
                category: categories::ACCESS_SUBJECT.into(),
                id: "subject-id".into(),
                issuer: None,
                datatype: Datatype::String,
                must_be_present,
            },
        }
    }

    fn target_node(matches: Vec<MatchNode>) -> TargetNode {
        TargetNode {
            any_ofs: vec![AnyOfNode {
                all_ofs: vec![AllOfNode { matches }],
            }],
        }
    }

    fn request_with_subject(values: &[&str]) -> IndividualDecisionRequest {
        let fqn = AttributeFqn::new(categories::ACCESS_SUBJECT, "subject-id", None::<&str>);
        let bag = Bag::new(
            Datatype::String,
            values
                .iter()
                .map(|s| AttributeValue::String(s.to_string()))
                .collect(),
        )
        .unwrap();
        IndividualDecisionRequest::new(HashMap::from([(fqn, bag)]), HashMap::new())
    }

    #[test]
    fn match_against_any_bag_element() {
        let registry = FunctionRegistry::standard();
        let target = Target::new(
            Some(&target_node(vec![subject_id_match(STRING_EQUAL, "alice", false)])),
            &registry,
        )
        .unwrap();

        let request = request_with_subject(&["bob", "alice"]);
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        assert!(target.matches(&ctx).unwrap());

        let request = request_with_subject(&["bob"]);
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        assert!(!target.matches(&ctx).unwrap());
    }

    #[test]
    fn empty_target_always_matches() {
        let registry = FunctionRegistry::standard();
        let target = Target::new(None, &registry).unwrap();
        assert!(target.is_empty());
        let request = IndividualDecisionRequest::default();
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        assert!(target.matches(&ctx).unwrap());
    }

    #[test]
    fn missing_required_attribute_is_indeterminate() {
        let registry = FunctionRegistry::standard();
        let target = Target::new(
            Some(&target_node(vec![subject_id_match(STRING_EQUAL, "alice", true)])),
            &registry,
        )
        .unwrap();
        let request = IndividualDecisionRequest::default();
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        let err = target.matches(&ctx).unwrap_err();
        assert_eq!(err.status, StatusCode::MissingAttribute);
    }

    #[test]
    fn unknown_match_function_is_load_error() {
        let registry = FunctionRegistry::standard();
        let err = Target::new(
            Some(&target_node(vec![subject_id_match("urn:nope", "x", false)])),
            &registry,
        );
        assert!(err.is_err());
    }
}
