//! The unresolved policy AST.
//!
//! This is the typed tree a policy parser (XACML/XML, out of scope here)
//! delivers, structurally equivalent to the OASIS schema. The
//! [`crate::compile::PolicyCompiler`] turns it into immutable evaluators,
//! failing fast on anything invalid.

use xacml_core::{AttributeValue, Datatype, Effect, VersionPatterns};
use xacml_eval::ExpressionNode;

/// `<Policy>`: a target, variable definitions, rules, and a rule combining
/// algorithm.
#[derive(Debug, Clone)]
pub struct PolicyNode {
    pub id: String,
    pub version: String,
    pub description: Option<String>,
    pub target: Option<TargetNode>,
    /// (variable id, expression), in document order; XACML requires
    /// definition before use.
    pub variables: Vec<(String, ExpressionNode)>,
    pub rule_combining_alg_id: String,
    pub rules: Vec<RuleNode>,
    pub pep_actions: Vec<PepActionNode>,
}

/// `<PolicySet>`: a target, child policies / policy sets / references, and
/// a policy combining algorithm.
#[derive(Debug, Clone)]
pub struct PolicySetNode {
    pub id: String,
    pub version: String,
    pub description: Option<String>,
    pub target: Option<TargetNode>,
    pub policy_combining_alg_id: String,
    pub children: Vec<PolicyChildNode>,
    pub pep_actions: Vec<PepActionNode>,
}

#[derive(Debug, Clone)]
pub enum PolicyChildNode {
    Policy(PolicyNode),
    PolicySet(PolicySetNode),
    /// `<PolicyIdReference>` / `<PolicySetIdReference>` with version
    /// constraints, resolved statically at load.
    Reference(PolicyRefNode),
}

#[derive(Debug, Clone)]
pub struct PolicyRefNode {
    pub id: String,
    pub patterns: VersionPatterns,
}

#[derive(Debug, Clone)]
pub struct RuleNode {
    pub id: String,
    pub effect: Effect,
    pub description: Option<String>,
    pub target: Option<TargetNode>,
    pub condition: Option<ExpressionNode>,
    pub pep_actions: Vec<PepActionNode>,
}

/// `<Target>`: conjunction of AnyOf, each a disjunction of AllOf, each a
/// conjunction of Match elements.
#[derive(Debug, Clone, Default)]
pub struct TargetNode {
    pub any_ofs: Vec<AnyOfNode>,
}

#[derive(Debug, Clone)]
pub struct AnyOfNode {
    pub all_ofs: Vec<AllOfNode>,
}

#[derive(Debug, Clone)]
pub struct AllOfNode {
    pub matches: Vec<MatchNode>,
}

/// `<Match>`: a match function applied to (literal, fetched attribute).
#[derive(Debug, Clone)]
pub struct MatchNode {
    pub function_id: String,
    pub literal: AttributeValue,
    pub source: MatchSourceNode,
}

#[derive(Debug, Clone)]
pub enum MatchSourceNode {
    Designator {
        category: String,
        id: String,
        issuer: Option<String>,
        datatype: Datatype,
        must_be_present: bool,
    },
    Selector {
        category: String,
        path: String,
        datatype: Datatype,
        must_be_present: bool,
    },
}

/// `<ObligationExpression>` / `<AdviceExpression>`.
#[derive(Debug, Clone)]
pub struct PepActionNode {
    pub id: String,
    /// True for obligations, false for advice.
    pub mandatory: bool,
    pub fulfill_on: Effect,
    pub assignments: Vec<AssignmentNode>,
}

/// `<AttributeAssignmentExpression>`.
#[derive(Debug, Clone)]
pub struct AssignmentNode {
    pub attribute_id: String,
    pub category: Option<String>,
    pub issuer: Option<String>,
    pub expression: ExpressionNode,
}
