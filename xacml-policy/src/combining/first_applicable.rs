//! first-applicable: the first non-NotApplicable child decision is
//! returned verbatim.
//!
//! Rule specialization: the child list is truncated after the first
//! always-applicable rule; nothing past it can be reached.

use tracing::{debug, warn};
use xacml_core::{Decision, ExtendedDecision, PepAction, PolicyIdent, Result};
use xacml_eval::EvaluationContext;

use super::{
    collect_applicable, Children, CombinedElement, CombiningEvaluator, ConstantDecisionEvaluator,
};

pub(super) fn build(children: Children) -> Result<Box<dyn CombiningEvaluator>> {
    if children.is_empty() {
        warn!("first-applicable: no element to combine, replacing with constant NotApplicable evaluator");
        return Ok(ConstantDecisionEvaluator::boxed(
            ExtendedDecision::not_applicable(),
        ));
    }

    let children = match children {
        Children::Rules(rules) => {
            let total = rules.len();
            let mut kept: Vec<CombinedElement> = Vec::with_capacity(total);
            for rule in rules {
                let stop = rule.is_always_applicable();
                kept.push(CombinedElement::Rule(rule));
                if stop {
                    break;
                }
            }
            if kept.len() < total {
                debug!(
                    kept = kept.len(),
                    total,
                    "first-applicable: rules after the first always-applicable rule are unreachable, dropping them"
                );
            }
            kept
        }
        other => other.into_elements(),
    };

    Ok(Box::new(Evaluator { children }))
}

#[derive(Debug)]
struct Evaluator {
    children: Vec<CombinedElement>,
}

impl CombiningEvaluator for Evaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        mut out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        for child in &self.children {
            let result = child.evaluate(ctx, out_applicable.is_some());
            match result.decision {
                Decision::NotApplicable => continue,
                Decision::Permit | Decision::Deny => {
                    collect_applicable(&mut out_applicable, &result);
                    let extended = result.extended();
                    out_pep.extend(result.pep_actions);
                    return extended;
                }
                Decision::Indeterminate => {
                    collect_applicable(&mut out_applicable, &result);
                    return result.extended();
                }
            }
        }
        ExtendedDecision::not_applicable()
    }
}
