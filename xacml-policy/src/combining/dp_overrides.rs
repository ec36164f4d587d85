//! deny-overrides / permit-overrides (and the ordered variants).
//!
//! One evaluator, parameterized on the overriding effect, implementing the
//! full XACML 3.0 flavor lattice: an Indeterminate leaning toward the
//! overriding effect combines with any overridden-leaning outcome into
//! Indeterminate{DP}.

use tracing::warn;
use xacml_core::{
    Decision, Effect, ExtendedDecision, IndeterminateError, IndeterminateFlavor, PepAction,
    PolicyIdent, Result,
};
use xacml_eval::EvaluationContext;

use super::{
    collect_applicable, Children, CombinedElement, CombiningEvaluator, ConstantDecisionEvaluator,
};

pub(super) fn build(
    overriding: Effect,
    children: Children,
) -> Result<Box<dyn CombiningEvaluator>> {
    if children.is_empty() {
        warn!(
            overriding_effect = %overriding,
            "overrides algorithm: no element to combine, replacing with constant NotApplicable evaluator"
        );
        return Ok(ConstantDecisionEvaluator::boxed(
            ExtendedDecision::not_applicable(),
        ));
    }
    Ok(Box::new(Evaluator {
        overriding,
        children: children.into_elements(),
    }))
}

#[derive(Debug)]
struct Evaluator {
    overriding: Effect,
    children: Vec<CombinedElement>,
}

impl CombiningEvaluator for Evaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        mut out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        let overriding_decision = self.overriding.as_decision();
        let overridden = self.overriding.dual();
        let overriding_flavor = IndeterminateFlavor::from_effect(self.overriding);
        let overridden_flavor = IndeterminateFlavor::from_effect(overridden);

        let mut overridden_pep: Vec<PepAction> = Vec::new();
        let mut saw_overridden = false;
        let mut first_err_overriding: Option<IndeterminateError> = None;
        let mut first_err_overridden: Option<IndeterminateError> = None;
        let mut first_err_dp: Option<IndeterminateError> = None;

        for child in &self.children {
            let result = child.evaluate(ctx, out_applicable.is_some());
            collect_applicable(&mut out_applicable, &result);

            match result.decision {
                d if d == overriding_decision => {
                    // the overriding effect wins immediately
                    out_pep.extend(result.pep_actions);
                    return ExtendedDecision::of_effect(self.overriding);
                }
                Decision::Permit | Decision::Deny => {
                    saw_overridden = true;
                    overridden_pep.extend(result.pep_actions);
                }
                Decision::Indeterminate => {
                    let error = result
                        .error
                        .unwrap_or_else(|| IndeterminateError::processing_error("Indeterminate"));
                    let slot = match result.flavor {
                        Some(f) if f == overriding_flavor => &mut first_err_overriding,
                        Some(f) if f == overridden_flavor => &mut first_err_overridden,
                        _ => &mut first_err_dp,
                    };
                    if slot.is_none() {
                        *slot = Some(error);
                    }
                }
                Decision::NotApplicable => {}
            }
        }

        // XACML 3.0 deny-overrides combination, generalized over the
        // overriding effect
        if let Some(e) = first_err_dp {
            return ExtendedDecision::indeterminate(IndeterminateFlavor::PermitDeny, e);
        }
        if let Some(e) = first_err_overriding {
            let flavor = if saw_overridden || first_err_overridden.is_some() {
                IndeterminateFlavor::PermitDeny
            } else {
                overriding_flavor
            };
            return ExtendedDecision::indeterminate(flavor, e);
        }
        if saw_overridden {
            out_pep.extend(overridden_pep);
            return ExtendedDecision::of_effect(overridden);
        }
        if let Some(e) = first_err_overridden {
            return ExtendedDecision::indeterminate(overridden_flavor, e);
        }
        ExtendedDecision::not_applicable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::CombiningAlg;
    use crate::rule::RuleEvaluator;
    use crate::tree::RuleNode;
    use std::sync::Arc;
    use xacml_core::{AttributeValue, IndividualDecisionRequest};
    use xacml_eval::{
        EvalLimits, EvaluationContext, ExpressionFactory, ExpressionNode, FunctionRegistry,
        VariableScope, XPathUnsupported,
    };

    fn rule(id: &str, effect: Effect, condition: Option<bool>) -> Arc<RuleEvaluator> {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let node = RuleNode {
            id: id.into(),
            effect,
            description: None,
            target: None,
            condition: condition.map(|b| ExpressionNode::Literal(AttributeValue::Boolean(b))),
            pep_actions: vec![],
        };
        Arc::new(RuleEvaluator::new(&node, &registry, &factory, &VariableScope::root()).unwrap())
    }

    /// A rule whose condition errors at evaluation (bad designator),
    /// yielding Indeterminate with the rule's effect flavor.
    fn erroring_rule(id: &str, effect: Effect) -> Arc<RuleEvaluator> {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let node = RuleNode {
            id: id.into(),
            effect,
            description: None,
            target: None,
            condition: Some(ExpressionNode::Apply {
                function_id: "urn:oasis:names:tc:xacml:1.0:function:boolean-one-and-only".into(),
                args: vec![ExpressionNode::Designator {
                    category: "urn:example:category".into(),
                    id: "urn:example:missing".into(),
                    issuer: None,
                    datatype: xacml_core::Datatype::Boolean,
                    must_be_present: true,
                }],
            }),
            pep_actions: vec![],
        };
        Arc::new(RuleEvaluator::new(&node, &registry, &factory, &VariableScope::root()).unwrap())
    }

    fn combine(alg: CombiningAlg, rules: Vec<Arc<RuleEvaluator>>) -> ExtendedDecision {
        let evaluator = alg.evaluator(Children::Rules(rules)).unwrap();
        let request = IndividualDecisionRequest::default();
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        let mut pep = Vec::new();
        evaluator.evaluate(&ctx, &mut pep, None)
    }

    #[test]
    fn first_deny_wins() {
        let decision = combine(
            CombiningAlg::DenyOverrides,
            vec![
                rule("p", Effect::Permit, None),
                rule("d", Effect::Deny, None),
            ],
        );
        assert_eq!(decision.decision, Decision::Deny);
    }

    #[test]
    fn permit_when_no_deny() {
        let decision = combine(
            CombiningAlg::DenyOverrides,
            vec![
                rule("na", Effect::Deny, Some(false)),
                rule("p", Effect::Permit, None),
            ],
        );
        assert_eq!(decision.decision, Decision::Permit);
    }

    #[test]
    fn indeterminate_d_plus_permit_is_dp() {
        let decision = combine(
            CombiningAlg::DenyOverrides,
            vec![
                erroring_rule("err-d", Effect::Deny),
                rule("p", Effect::Permit, None),
            ],
        );
        assert_eq!(decision.decision, Decision::Indeterminate);
        assert_eq!(decision.flavor, Some(IndeterminateFlavor::PermitDeny));
    }

    #[test]
    fn indeterminate_d_alone_keeps_flavor() {
        let decision = combine(
            CombiningAlg::DenyOverrides,
            vec![erroring_rule("err-d", Effect::Deny)],
        );
        assert_eq!(decision.decision, Decision::Indeterminate);
        assert_eq!(decision.flavor, Some(IndeterminateFlavor::Deny));
    }

    #[test]
    fn indeterminate_p_does_not_block_permit_overrides_dual() {
        // permit-overrides: an IndeterminateD alone yields IndeterminateD
        let decision = combine(
            CombiningAlg::PermitOverrides,
            vec![erroring_rule("err-d", Effect::Deny)],
        );
        assert_eq!(decision.flavor, Some(IndeterminateFlavor::Deny));
    }

    #[test]
    fn all_not_applicable() {
        let decision = combine(
            CombiningAlg::DenyOverrides,
            vec![rule("na", Effect::Permit, Some(false))],
        );
        assert_eq!(decision.decision, Decision::NotApplicable);
    }

    #[test]
    fn empty_children_collapse_to_not_applicable() {
        let decision = combine(CombiningAlg::DenyOverrides, vec![]);
        assert_eq!(decision.decision, Decision::NotApplicable);
    }
}
