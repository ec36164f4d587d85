//! The combining-algorithm suite.
//!
//! Each algorithm builds an immutable evaluator over its children at policy
//! load. Load-time rewrites (constant collapses, rule partitioning,
//! truncation) happen in the `build` functions and are logged; the
//! evaluators themselves never mutate.
//!
//! Contracts shared by every evaluator:
//! - the applicable-policy out-list gets every child whose decision is not
//!   NotApplicable (when the caller asked for the list)
//! - PEP actions are emitted only from children whose decision equals the
//!   final decision (XACML §7.18)

mod dp_overrides;
mod first_applicable;
mod only_one_applicable;
mod unless;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use xacml_core::{
    DecisionResult, Effect, ExtendedDecision, PdpError, PepAction, PolicyIdent, Result,
};
use xacml_eval::EvaluationContext;

use crate::policy::PolicyEvaluator;
use crate::rule::RuleEvaluator;

/// A combining-algorithm evaluator, built once per policy element.
pub trait CombiningEvaluator: std::fmt::Debug + Send + Sync {
    /// Combines the children. PEP actions matching the returned decision
    /// are appended to `out_pep`; applicable policies to `out_applicable`
    /// when present.
    fn evaluate(
        &self,
        ctx: &EvaluationContext,
        out_pep: &mut Vec<PepAction>,
        out_applicable: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision;
}

/// The children a combining algorithm runs over: a Policy combines rules,
/// a PolicySet combines policies (including resolved references).
#[derive(Debug)]
pub enum Children {
    Rules(Vec<Arc<RuleEvaluator>>),
    Policies(Vec<Arc<PolicyEvaluator>>),
}

impl Children {
    fn is_empty(&self) -> bool {
        match self {
            Children::Rules(rules) => rules.is_empty(),
            Children::Policies(policies) => policies.is_empty(),
        }
    }

    fn into_elements(self) -> Vec<CombinedElement> {
        match self {
            Children::Rules(rules) => rules.into_iter().map(CombinedElement::Rule).collect(),
            Children::Policies(policies) => {
                policies.into_iter().map(CombinedElement::Policy).collect()
            }
        }
    }
}

/// One combinable child.
#[derive(Debug, Clone)]
pub(crate) enum CombinedElement {
    Rule(Arc<RuleEvaluator>),
    Policy(Arc<PolicyEvaluator>),
}

impl CombinedElement {
    pub(crate) fn evaluate(
        &self,
        ctx: &EvaluationContext,
        want_applicable: bool,
    ) -> DecisionResult {
        match self {
            CombinedElement::Rule(rule) => rule.evaluate(ctx),
            CombinedElement::Policy(policy) => policy.evaluate(ctx, want_applicable),
        }
    }
}

/// The standard combining algorithms. Ordered variants share evaluators
/// with their unordered forms; children are always walked in declared
/// order; the "any order" license is only used for load-time rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiningAlg {
    DenyOverrides,
    PermitOverrides,
    FirstApplicable,
    OnlyOneApplicable,
    DenyUnlessPermit,
    PermitUnlessDeny,
}

impl CombiningAlg {
    /// Builds the evaluator for this algorithm over the given children.
    pub fn evaluator(self, children: Children) -> Result<Box<dyn CombiningEvaluator>> {
        match self {
            CombiningAlg::DenyOverrides => dp_overrides::build(Effect::Deny, children),
            CombiningAlg::PermitOverrides => dp_overrides::build(Effect::Permit, children),
            CombiningAlg::FirstApplicable => first_applicable::build(children),
            CombiningAlg::OnlyOneApplicable => only_one_applicable::build(children),
            CombiningAlg::DenyUnlessPermit => unless::build(Effect::Permit, children),
            CombiningAlg::PermitUnlessDeny => unless::build(Effect::Deny, children),
        }
    }
}

/// What kind of children an algorithm URI is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgScope {
    RuleCombining,
    PolicyCombining,
}

/// Registry of recognized combining-algorithm URIs.
#[derive(Debug)]
pub struct CombiningAlgRegistry {
    by_uri: HashMap<String, (CombiningAlg, AlgScope)>,
}

impl CombiningAlgRegistry {
    /// All standard XACML 1.0/1.1/3.0 URIs. The 1.x (legacy) overrides
    /// algorithms resolve to the 3.0 implementations.
    pub fn standard() -> Self {
        let mut by_uri: HashMap<String, (CombiningAlg, AlgScope)> = HashMap::new();

        use AlgScope::{PolicyCombining, RuleCombining};
        use CombiningAlg::*;

        let mut both = |version: &str, name: &str, alg: CombiningAlg| {
            by_uri.insert(
                format!("urn:oasis:names:tc:xacml:{version}:rule-combining-algorithm:{name}"),
                (alg, RuleCombining),
            );
            by_uri.insert(
                format!("urn:oasis:names:tc:xacml:{version}:policy-combining-algorithm:{name}"),
                (alg, PolicyCombining),
            );
        };

        // legacy 1.x URIs, kept recognized for old policies
        both("1.0", "deny-overrides", DenyOverrides);
        both("1.0", "permit-overrides", PermitOverrides);
        both("1.1", "ordered-deny-overrides", DenyOverrides);
        both("1.1", "ordered-permit-overrides", PermitOverrides);

        both("3.0", "deny-overrides", DenyOverrides);
        both("3.0", "ordered-deny-overrides", DenyOverrides);
        both("3.0", "permit-overrides", PermitOverrides);
        both("3.0", "ordered-permit-overrides", PermitOverrides);
        both("3.0", "deny-unless-permit", DenyUnlessPermit);
        both("3.0", "permit-unless-deny", PermitUnlessDeny);

        both("1.0", "first-applicable", FirstApplicable);
        // only-one-applicable is policy-combining only
        by_uri.insert(
            "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable"
                .to_string(),
            (OnlyOneApplicable, PolicyCombining),
        );

        Self { by_uri }
    }

    pub fn get(&self, uri: &str, scope: AlgScope) -> Result<CombiningAlg> {
        match self.by_uri.get(uri) {
            Some((alg, declared)) if *declared == scope => {
                if uri.contains(":1.0:") || uri.contains(":1.1:") {
                    debug!(uri, "legacy combining algorithm resolved to its 3.0 implementation");
                }
                Ok(*alg)
            }
            Some(_) => Err(PdpError::UnknownCombiningAlg(format!(
                "'{uri}' is not defined for this combining scope"
            ))),
            None => Err(PdpError::UnknownCombiningAlg(uri.to_string())),
        }
    }
}

/// Evaluator returning a fixed decision; load-time rewrites collapse to
/// this when children cannot affect the outcome.
#[derive(Debug)]
pub(crate) struct ConstantDecisionEvaluator {
    decision: ExtendedDecision,
}

impl ConstantDecisionEvaluator {
    pub(crate) fn boxed(decision: ExtendedDecision) -> Box<dyn CombiningEvaluator> {
        Box::new(Self { decision })
    }
}

impl CombiningEvaluator for ConstantDecisionEvaluator {
    fn evaluate(
        &self,
        _: &EvaluationContext,
        _: &mut Vec<PepAction>,
        _: Option<&mut Vec<PolicyIdent>>,
    ) -> ExtendedDecision {
        self.decision.clone()
    }
}

/// Appends a child's applicable policies when the caller wants the list
/// and the child's decision was not NotApplicable.
pub(crate) fn collect_applicable(
    out: &mut Option<&mut Vec<PolicyIdent>>,
    result: &DecisionResult,
) {
    if result.decision != xacml_core::Decision::NotApplicable {
        if let Some(list) = out.as_deref_mut() {
            list.extend(result.applicable_policies.iter().cloned());
        }
    }
}
