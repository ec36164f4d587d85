//! Policy and PolicySet evaluation.
//!
//! One evaluator type covers both: a Policy combines rules, a PolicySet
//! combines policies, and the difference is entirely inside the combining
//! evaluator. Per XACML §7.13, when the target is Indeterminate the
//! combined decision is still computed and then downgraded (Permit →
//! Indeterminate{P}, Deny → Indeterminate{D}) with PEP actions discarded.

use std::fmt;

use xacml_core::{
    Decision, DecisionResult, Effect, EvalResult, IndeterminateFlavor, PepAction, PolicyIdent,
};
use xacml_eval::EvaluationContext;

use crate::combining::CombiningEvaluator;
use crate::pep::{evaluate_pep_actions, PepActionExpression};
use crate::target::Target;

pub struct PolicyEvaluator {
    ident: PolicyIdent,
    target: Target,
    combiner: Box<dyn CombiningEvaluator>,
    pep_actions: Vec<PepActionExpression>,
}

impl fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("ident", &self.ident)
            .field("combiner", &self.combiner)
            .finish_non_exhaustive()
    }
}

impl PolicyEvaluator {
    pub(crate) fn new(
        ident: PolicyIdent,
        target: Target,
        combiner: Box<dyn CombiningEvaluator>,
        pep_actions: Vec<PepActionExpression>,
    ) -> Self {
        Self {
            ident,
            target,
            combiner,
            pep_actions,
        }
    }

    pub fn ident(&self) -> &PolicyIdent {
        &self.ident
    }

    /// Target-only applicability, used by only-one-applicable.
    pub fn is_applicable_by_target(&self, ctx: &EvaluationContext) -> EvalResult<bool> {
        self.target.matches(ctx)
    }

    pub fn evaluate(&self, ctx: &EvaluationContext, want_applicable: bool) -> DecisionResult {
        match self.target.matches(ctx) {
            Ok(false) => DecisionResult::not_applicable(),
            Ok(true) => self.evaluate_combined(ctx, want_applicable),
            Err(target_error) => self.evaluate_with_indeterminate_target(ctx, target_error),
        }
    }

    fn evaluate_combined(&self, ctx: &EvaluationContext, want_applicable: bool) -> DecisionResult {
        let mut pep: Vec<PepAction> = Vec::new();
        let mut applicable: Vec<PolicyIdent> = Vec::new();
        let extended =
            self.combiner
                .evaluate(ctx, &mut pep, want_applicable.then_some(&mut applicable));

        match extended.decision {
            Decision::NotApplicable => DecisionResult::not_applicable(),
            Decision::Indeterminate => {
                applicable.push(self.ident.clone());
                DecisionResult {
                    decision: Decision::Indeterminate,
                    flavor: extended.flavor,
                    error: extended.error,
                    applicable_policies: if want_applicable { applicable } else { Vec::new() },
                    pep_actions: Vec::new(),
                }
            }
            Decision::Permit | Decision::Deny => {
                let effect = match extended.decision {
                    Decision::Permit => Effect::Permit,
                    _ => Effect::Deny,
                };
                // The policy's own PEP actions, filtered by FulfillOn.
                match evaluate_pep_actions(&self.pep_actions, effect, ctx) {
                    Ok(own) => pep.extend(own),
                    Err(e) => {
                        return DecisionResult::indeterminate(
                            IndeterminateFlavor::from_effect(effect),
                            e.context(format!(
                                "policy '{}': error evaluating PEP actions",
                                self.ident
                            )),
                        )
                    }
                }
                applicable.push(self.ident.clone());
                DecisionResult {
                    decision: extended.decision,
                    flavor: None,
                    error: None,
                    applicable_policies: if want_applicable { applicable } else { Vec::new() },
                    pep_actions: pep,
                }
            }
        }
    }

    /// Target was Indeterminate: compute the combined decision to find the
    /// flavor, discard its PEP actions, report the target error.
    fn evaluate_with_indeterminate_target(
        &self,
        ctx: &EvaluationContext,
        target_error: xacml_core::IndeterminateError,
    ) -> DecisionResult {
        let mut discarded_pep = Vec::new();
        let extended = self.combiner.evaluate(ctx, &mut discarded_pep, None);

        let flavor = match extended.decision {
            Decision::NotApplicable => return DecisionResult::not_applicable(),
            Decision::Permit => IndeterminateFlavor::Permit,
            Decision::Deny => IndeterminateFlavor::Deny,
            Decision::Indeterminate => extended
                .flavor
                .unwrap_or(IndeterminateFlavor::PermitDeny),
        };
        let mut result = DecisionResult::indeterminate(
            flavor,
            target_error.context(format!(
                "policy '{}': error evaluating target",
                self.ident
            )),
        );
        result.applicable_policies.push(self.ident.clone());
        result
    }
}
