//! deny-unless-permit / permit-unless-deny.
//!
//! One effect overrides; the other is the unconditional fallback. The
//! final decision is never NotApplicable or Indeterminate.
//!
//! Rule specialization (the "children may be processed in any order"
//! license, used at load time): rules with the overriding effect are walked
//! first and short-circuit; rules with the overridden effect matter only
//! for their PEP actions, so those without any are dropped. An
//! empty-equivalent rule with the overriding effect collapses the whole
//! evaluator to a constant.

use std::sync::Arc;

use tracing::{debug, warn};
use xacml_core::{
    Decision, Effect, ExtendedDecision, PepAction, PolicyIdent, Result,
};
use xacml_eval::EvaluationContext;

use super::{
    collect_applicable, Children, CombinedElement, CombiningEvaluator, ConstantDecisionEvaluator,
};
use crate::rule::RuleEvaluator;

pub(super) fn build(overriding: Effect, children: Children) -> Result<Box<dyn CombiningEvaluator>> {
    let overridden = overriding.dual();

    if children.is_empty() {
        warn!(
            %overridden,
            "unless-algorithm: no element to combine, replacing with constant evaluator"
        );
        return Ok(ConstantDecisionEvaluator::boxed(ExtendedDecision::of_effect(
            overridden,
        )));
    }

    let rules = match children {
        Children::Rules(rules) => rules,
        other => {
            return Ok(Box::new(GenericEvaluator {
                overriding,
                children: other.into_elements(),
            }))
        }
    };

    // Partition the rules; see module docs.
    let mut with_overriding_effect: Vec<Arc<RuleEvaluator>> = Vec::new();
    let mut with_overridden_effect_and_pep: Vec<Arc<RuleEvaluator>> = Vec::new();
    for rule in rules {
        if rule.effect() == overriding {
            if rule.is_empty_equivalent() {
                warn!(
                    rule = rule.id(),
                    effect = %overriding,
                    "rule is empty-equivalent with the overriding effect; the algorithm always returns it, other rules are ignored"
                );
                return Ok(ConstantDecisionEvaluator::boxed(ExtendedDecision::of_effect(
                    overriding,
                )));
            }
            with_overriding_effect.push(rule);
        } else if rule.has_any_pep_action() {
            with_overridden_effect_and_pep.push(rule);
        } else {
            warn!(
                rule = rule.id(),
                effect = %overridden,
                "rule with the overridden effect and no PEP action cannot affect the result, dropping it"
            );
        }
    }

    if with_overriding_effect.is_empty() && with_overridden_effect_and_pep.is_empty() {
        warn!(
            %overridden,
            "no remaining rule can affect the result, replacing with constant evaluator"
        );
        return Ok(ConstantDecisionEvaluator::boxed(ExtendedDecision::of_effect(
            overridden,
        )));
    }

    debug!(
        overriding_rules = with_overriding_effect.len(),
        overridden_rules_with_pep = with_overridden_effect_and_pep.len(),
        "unless-algorithm: rules with the overriding effect are processed first"
    );
    Ok(Box::new(OverridingEffectFirstEvaluator {
        overriding,
        with_overriding_effect,
        with_overridden_effect_and_pep,
    }))
}

/// Unoptimized form, used when the children are policies.
#[derive(Debug)]
struct GenericEvaluator {
    overriding: Effect,
    children: Vec<CombinedElement>,
}

impl CombiningEvaluator for GenericEvaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        mut out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        let overriding_decision = self.overriding.as_decision();
        let overridden = self.overriding.dual();
        let mut overridden_pep: Vec<PepAction> = Vec::new();

        for child in &self.children {
            let result = child.evaluate(ctx, out_applicable.is_some());
            // The final decision cannot be NotApplicable, so every
            // applicable child lands in the list directly.
            collect_applicable(&mut out_applicable, &result);

            if result.decision == overriding_decision {
                out_pep.extend(result.pep_actions);
                return ExtendedDecision::of_effect(self.overriding);
            }
            if result.decision == overridden.as_decision() {
                overridden_pep.extend(result.pep_actions);
            }
            // NotApplicable / Indeterminate count as "not the overriding
            // effect"
        }

        out_pep.extend(overridden_pep);
        ExtendedDecision::of_effect(overridden)
    }
}

/// Rule-specialized form: overriding-effect rules first, then the
/// overridden-effect rules kept only for their PEP actions.
#[derive(Debug)]
struct OverridingEffectFirstEvaluator {
    overriding: Effect,
    with_overriding_effect: Vec<Arc<RuleEvaluator>>,
    with_overridden_effect_and_pep: Vec<Arc<RuleEvaluator>>,
}

impl CombiningEvaluator for OverridingEffectFirstEvaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        _out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        let overriding_decision = self.overriding.as_decision();
        for rule in &self.with_overriding_effect {
            let result = rule.evaluate(ctx);
            if result.decision == overriding_decision {
                out_pep.extend(result.pep_actions);
                return ExtendedDecision::of_effect(self.overriding);
            }
            // NotApplicable or Indeterminate: ignore
        }

        let overridden = self.overriding.dual();
        for rule in &self.with_overridden_effect_and_pep {
            let result = rule.evaluate(ctx);
            if result.decision == overridden.as_decision() {
                out_pep.extend(result.pep_actions);
            }
        }
        ExtendedDecision::of_effect(overridden)
    }
}
