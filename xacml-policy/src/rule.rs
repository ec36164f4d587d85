//! The rule evaluator.
//!
//! State machine per rule: Target no-match → NotApplicable; Target error →
//! Indeterminate with the rule's effect flavor; Condition false →
//! NotApplicable; Condition error → Indeterminate likewise; otherwise the
//! Effect, with the PEP actions whose FulfillOn matches it.
//!
//! The predicates consulted by combining-algorithm optimizers live here:
//! `is_always_applicable`, `is_empty_equivalent`, `has_any_pep_action`.

use std::sync::Arc;

use xacml_core::{
    Datatype, DecisionResult, Effect, IndeterminateFlavor, PdpError, Result,
};
use xacml_eval::{
    EvaluationContext, Expression, ExpressionFactory, FunctionRegistry, VariableScope,
};

use crate::pep::{evaluate_pep_actions, PepActionExpression};
use crate::target::Target;
use crate::tree::RuleNode;

#[derive(Debug)]
pub struct RuleEvaluator {
    id: Arc<str>,
    effect: Effect,
    target: Target,
    condition: Option<Expression>,
    pep_actions: Vec<PepActionExpression>,
}

impl RuleEvaluator {
    pub fn new(
        node: &RuleNode,
        registry: &FunctionRegistry,
        factory: &ExpressionFactory,
        scope: &VariableScope,
    ) -> Result<Self> {
        let target = Target::new(node.target.as_ref(), registry)?;
        let condition = node
            .condition
            .as_ref()
            .map(|c| {
                let expr = factory.build(c, scope)?;
                if expr.return_type() != Datatype::Boolean.into() {
                    return Err(PdpError::InvalidArgument(format!(
                        "rule '{}': condition does not return boolean",
                        node.id
                    )));
                }
                Ok(expr)
            })
            .transpose()?;
        let pep_actions = node
            .pep_actions
            .iter()
            .map(|p| PepActionExpression::new(p, factory, scope))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: Arc::from(node.id.as_str()),
            effect: node.effect,
            target,
            condition,
            pep_actions,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// No target and no condition: always yields a decision.
    pub fn is_always_applicable(&self) -> bool {
        self.target.is_empty() && self.condition.is_none()
    }

    /// Always applicable and without PEP actions: equivalent to a bare
    /// Effect.
    pub fn is_empty_equivalent(&self) -> bool {
        self.is_always_applicable() && self.pep_actions.is_empty()
    }

    pub fn has_any_pep_action(&self) -> bool {
        !self.pep_actions.is_empty()
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> DecisionResult {
        let flavor = IndeterminateFlavor::from_effect(self.effect);

        match self.target.matches(ctx) {
            Ok(true) => {}
            Ok(false) => return DecisionResult::not_applicable(),
            Err(e) => {
                return DecisionResult::indeterminate(
                    flavor,
                    e.context(format!("rule '{}': error evaluating target", self.id)),
                )
            }
        }

        if let Some(condition) = &self.condition {
            match condition.evaluate(Some(ctx)) {
                Ok(v) => match v {
                    xacml_core::Value::Primitive(xacml_core::AttributeValue::Boolean(true)) => {}
                    _ => return DecisionResult::not_applicable(),
                },
                Err(e) => {
                    return DecisionResult::indeterminate(
                        flavor,
                        e.context(format!("rule '{}': error evaluating condition", self.id)),
                    )
                }
            }
        }

        match evaluate_pep_actions(&self.pep_actions, self.effect, ctx) {
            Ok(pep_actions) => match self.effect {
                Effect::Permit => DecisionResult::permit(pep_actions),
                Effect::Deny => DecisionResult::deny(pep_actions),
            },
            Err(e) => DecisionResult::indeterminate(
                flavor,
                e.context(format!("rule '{}': error evaluating PEP actions", self.id)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AllOfNode, AnyOfNode, MatchNode, MatchSourceNode, TargetNode};
    use std::collections::HashMap;
    use xacml_core::attribute::categories;
    use xacml_core::{AttributeFqn, AttributeValue, Bag, Decision, IndividualDecisionRequest};
    use xacml_eval::{EvalLimits, ExpressionNode, XPathUnsupported};

    fn rule_node(effect: Effect, target: Option<TargetNode>, condition: Option<bool>) -> RuleNode {
        RuleNode {
            id: "rule-1".into(),
            effect,
            description: None,
            target,
            condition: condition
                .map(|b| ExpressionNode::Literal(AttributeValue::Boolean(b))),
            pep_actions: vec![],
        }
    }

    fn build(node: &RuleNode) -> RuleEvaluator {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        RuleEvaluator::new(node, &registry, &factory, &VariableScope::root()).unwrap()
    }

    fn empty_ctx_eval(rule: &RuleEvaluator) -> DecisionResult {
        let request = IndividualDecisionRequest::default();
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        rule.evaluate(&ctx)
    }

    #[test]
    fn empty_rule_yields_its_effect() {
        let rule = build(&rule_node(Effect::Permit, None, None));
        assert!(rule.is_empty_equivalent());
        assert!(rule.is_always_applicable());
        assert_eq!(empty_ctx_eval(&rule).decision, Decision::Permit);
    }

    #[test]
    fn false_condition_is_not_applicable() {
        let rule = build(&rule_node(Effect::Deny, None, Some(false)));
        assert!(!rule.is_always_applicable());
        assert_eq!(empty_ctx_eval(&rule).decision, Decision::NotApplicable);
    }

    #[test]
    fn target_error_takes_effect_flavor() {
        let target = TargetNode {
            any_ofs: vec![AnyOfNode {
                all_ofs: vec![AllOfNode {
                    matches: vec![MatchNode {
                        function_id: "urn:oasis:names:tc:xacml:1.0:function:string-equal".into(),
                        literal: AttributeValue::String("x".into()),
                        source: MatchSourceNode::Designator {
                            category: categories::ACCESS_SUBJECT.into(),
                            id: "subject-id".into(),
                            issuer: None,
                            datatype: Datatype::String,
                            must_be_present: true,
                        },
                    }],
                }],
            }],
        };
        let rule = build(&rule_node(Effect::Deny, Some(target), None));
        let result = empty_ctx_eval(&rule);
        assert_eq!(result.decision, Decision::Indeterminate);
        assert_eq!(result.flavor, Some(IndeterminateFlavor::Deny));
    }

    #[test]
    fn matching_target_yields_effect() {
        let target = TargetNode {
            any_ofs: vec![AnyOfNode {
                all_ofs: vec![AllOfNode {
                    matches: vec![MatchNode {
                        function_id: "urn:oasis:names:tc:xacml:1.0:function:string-equal".into(),
                        literal: AttributeValue::String("alice".into()),
                        source: MatchSourceNode::Designator {
                            category: categories::ACCESS_SUBJECT.into(),
                            id: "subject-id".into(),
                            issuer: None,
                            datatype: Datatype::String,
                            must_be_present: false,
                        },
                    }],
                }],
            }],
        };
        let rule = build(&rule_node(Effect::Permit, Some(target), None));

        let fqn = AttributeFqn::new(categories::ACCESS_SUBJECT, "subject-id", None::<&str>);
        let bag = Bag::new(
            Datatype::String,
            vec![AttributeValue::String("alice".into())],
        )
        .unwrap();
        let request =
            IndividualDecisionRequest::new(HashMap::from([(fqn, bag)]), HashMap::new());
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        assert_eq!(rule.evaluate(&ctx).decision, Decision::Permit);
    }

    #[test]
    fn non_boolean_condition_is_load_error() {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let node = RuleNode {
            id: "bad".into(),
            effect: Effect::Permit,
            description: None,
            target: None,
            condition: Some(ExpressionNode::Literal(AttributeValue::Integer(1))),
            pep_actions: vec![],
        };
        assert!(RuleEvaluator::new(&node, &registry, &factory, &VariableScope::root()).is_err());
    }
}
