//! The decision model: effects, decisions, Indeterminate flavors, PEP
//! actions, and the intermediate/final result types.
//!
//! `ExtendedDecision` is what combining-algorithm evaluators return (no
//! applicable-policy list); `DecisionResult` is the per-element and final
//! PDP result. Invariant: NotApplicable and Indeterminate results carry no
//! PEP actions.

use crate::error::IndeterminateError;
use crate::value::AttributeValue;
use crate::version::PolicyVersion;
use std::fmt;
use std::sync::Arc;

/// A rule's intended outcome when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    /// The opposite effect.
    pub fn dual(self) -> Effect {
        match self {
            Effect::Permit => Effect::Deny,
            Effect::Deny => Effect::Permit,
        }
    }

    pub fn as_decision(self) -> Decision {
        match self {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Permit => f.write_str("Permit"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

/// An authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate,
}

/// The subset of decisions an Indeterminate could have been.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IndeterminateFlavor {
    /// Indeterminate{P}: could only have been Permit.
    Permit,
    /// Indeterminate{D}: could only have been Deny.
    Deny,
    /// Indeterminate{DP}: could have been either.
    PermitDeny,
}

impl IndeterminateFlavor {
    pub fn from_effect(effect: Effect) -> Self {
        match effect {
            Effect::Permit => IndeterminateFlavor::Permit,
            Effect::Deny => IndeterminateFlavor::Deny,
        }
    }

    /// Least upper bound of two flavors.
    pub fn join(self, other: IndeterminateFlavor) -> IndeterminateFlavor {
        if self == other {
            self
        } else {
            IndeterminateFlavor::PermitDeny
        }
    }
}

impl fmt::Display for IndeterminateFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndeterminateFlavor::Permit => f.write_str("Indeterminate{P}"),
            IndeterminateFlavor::Deny => f.write_str("Indeterminate{D}"),
            IndeterminateFlavor::PermitDeny => f.write_str("Indeterminate{DP}"),
        }
    }
}

/// One AttributeAssignment inside a fulfilled PEP action.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeAssignment {
    pub attribute_id: Arc<str>,
    pub category: Option<Arc<str>>,
    pub issuer: Option<Arc<str>>,
    pub value: AttributeValue,
}

/// An obligation or advice directed at the PEP.
#[derive(Debug, Clone, PartialEq)]
pub struct PepAction {
    pub id: Arc<str>,
    /// True for obligations (the PEP must fulfill), false for advice.
    pub mandatory: bool,
    pub assignments: Vec<AttributeAssignment>,
}

/// Identity of a policy that was applicable to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyIdent {
    pub id: Arc<str>,
    pub version: PolicyVersion,
}

impl fmt::Display for PolicyIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#v{}", self.id, self.version)
    }
}

/// Intermediate decision produced by combining-algorithm evaluators: the
/// decision with its Indeterminate annotations, but no policy list (the
/// caller owns the out-parameter lists).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedDecision {
    pub decision: Decision,
    pub flavor: Option<IndeterminateFlavor>,
    pub error: Option<IndeterminateError>,
}

impl ExtendedDecision {
    pub fn permit() -> Self {
        Self {
            decision: Decision::Permit,
            flavor: None,
            error: None,
        }
    }

    pub fn deny() -> Self {
        Self {
            decision: Decision::Deny,
            flavor: None,
            error: None,
        }
    }

    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            flavor: None,
            error: None,
        }
    }

    pub fn indeterminate(flavor: IndeterminateFlavor, error: IndeterminateError) -> Self {
        Self {
            decision: Decision::Indeterminate,
            flavor: Some(flavor),
            error: Some(error),
        }
    }

    pub fn of_effect(effect: Effect) -> Self {
        match effect {
            Effect::Permit => Self::permit(),
            Effect::Deny => Self::deny(),
        }
    }
}

/// A complete decision: what the PDP returns for one request, and what each
/// rule/policy returns to its parent combining algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionResult {
    pub decision: Decision,
    pub flavor: Option<IndeterminateFlavor>,
    pub error: Option<IndeterminateError>,
    /// Policies applicable to this request, in evaluation order. Populated
    /// only when the caller requested it.
    pub applicable_policies: Vec<PolicyIdent>,
    /// Obligations and advice matching the decision, in child order.
    pub pep_actions: Vec<PepAction>,
}

impl DecisionResult {
    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            flavor: None,
            error: None,
            applicable_policies: Vec::new(),
            pep_actions: Vec::new(),
        }
    }

    pub fn permit(pep_actions: Vec<PepAction>) -> Self {
        Self {
            decision: Decision::Permit,
            flavor: None,
            error: None,
            applicable_policies: Vec::new(),
            pep_actions,
        }
    }

    pub fn deny(pep_actions: Vec<PepAction>) -> Self {
        Self {
            decision: Decision::Deny,
            flavor: None,
            error: None,
            applicable_policies: Vec::new(),
            pep_actions,
        }
    }

    pub fn indeterminate(flavor: IndeterminateFlavor, error: IndeterminateError) -> Self {
        Self {
            decision: Decision::Indeterminate,
            flavor: Some(flavor),
            error: Some(error),
            applicable_policies: Vec::new(),
            pep_actions: Vec::new(),
        }
    }

    /// Builds the final result from a combining evaluator's output.
    pub fn from_extended(
        extended: ExtendedDecision,
        applicable_policies: Vec<PolicyIdent>,
        pep_actions: Vec<PepAction>,
    ) -> Self {
        debug_assert!(
            matches!(extended.decision, Decision::Permit | Decision::Deny)
                || pep_actions.is_empty(),
            "PEP actions on a {:?} decision",
            extended.decision
        );
        Self {
            decision: extended.decision,
            flavor: extended.flavor,
            error: extended.error,
            applicable_policies,
            pep_actions,
        }
    }

    pub fn extended(&self) -> ExtendedDecision {
        ExtendedDecision {
            decision: self.decision,
            flavor: self.flavor,
            error: self.error.clone(),
        }
    }
}
