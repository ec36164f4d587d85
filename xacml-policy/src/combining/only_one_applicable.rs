//! only-one-applicable (policy combining only).
//!
//! Applicability is determined from targets alone. More than one applicable
//! child, or any error while checking applicability, is Indeterminate{DP};
//! exactly one applicable child is evaluated and its decision returned.

use std::sync::Arc;

use tracing::warn;
use xacml_core::{
    Decision, ExtendedDecision, IndeterminateError, IndeterminateFlavor, PdpError, PepAction,
    PolicyIdent, Result,
};
use xacml_eval::EvaluationContext;

use super::{Children, CombiningEvaluator, ConstantDecisionEvaluator};
use crate::policy::PolicyEvaluator;

pub(super) fn build(children: Children) -> Result<Box<dyn CombiningEvaluator>> {
    let policies = match children {
        Children::Policies(policies) => policies,
        Children::Rules(_) => {
            return Err(PdpError::InvalidArgument(
                "only-one-applicable is a policy combining algorithm; it cannot combine rules"
                    .to_string(),
            ))
        }
    };
    if policies.is_empty() {
        warn!("only-one-applicable: no element to combine, replacing with constant NotApplicable evaluator");
        return Ok(ConstantDecisionEvaluator::boxed(
            ExtendedDecision::not_applicable(),
        ));
    }
    Ok(Box::new(Evaluator { policies }))
}

#[derive(Debug)]
struct Evaluator {
    policies: Vec<Arc<PolicyEvaluator>>,
}

impl CombiningEvaluator for Evaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        mut out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        let mut selected: Option<&Arc<PolicyEvaluator>> = None;
        for policy in &self.policies {
            match policy.is_applicable_by_target(ctx) {
                Err(e) => {
                    return ExtendedDecision::indeterminate(
                        IndeterminateFlavor::PermitDeny,
                        e.context(format!(
                            "only-one-applicable: error checking applicability of policy '{}'",
                            policy.ident()
                        )),
                    )
                }
                Ok(true) => {
                    if let Some(previous) = selected {
                        return ExtendedDecision::indeterminate(
                            IndeterminateFlavor::PermitDeny,
                            IndeterminateError::processing_error(format!(
                                "only-one-applicable: more than one applicable policy ('{}' and '{}')",
                                previous.ident(),
                                policy.ident()
                            )),
                        );
                    }
                    selected = Some(policy);
                }
                Ok(false) => {}
            }
        }

        let Some(policy) = selected else {
            return ExtendedDecision::not_applicable();
        };

        let result = policy.evaluate(ctx, out_applicable.is_some());
        if result.decision != Decision::NotApplicable {
            if let Some(list) = out_applicable.as_deref_mut() {
                list.extend(result.applicable_policies.iter().cloned());
            }
        }
        let extended = result.extended();
        if matches!(result.decision, Decision::Permit | Decision::Deny) {
            out_pep.extend(result.pep_actions);
        }
        extended
    }
}
