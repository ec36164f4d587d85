//! Compiles the unresolved policy AST into immutable evaluators.
//!
//! All validation happens here: unknown functions and combining
//! algorithms, type mismatches, undefined variables, unresolvable
//! references. Nothing fails lazily at evaluation time.

use std::sync::Arc;

use xacml_core::{PdpError, PolicyIdent, PolicyVersion, Result};
use xacml_eval::{ExpressionFactory, VariableScope};

use crate::combining::{AlgScope, Children, CombiningAlgRegistry};
use crate::pep::PepActionExpression;
use crate::policy::PolicyEvaluator;
use crate::resolver::StaticRefResolver;
use crate::rule::RuleEvaluator;
use crate::target::Target;
use crate::tree::{PolicyChildNode, PolicyNode, PolicySetNode};

pub struct PolicyCompiler<'a> {
    factory: &'a ExpressionFactory<'a>,
    algs: &'a CombiningAlgRegistry,
}

impl<'a> PolicyCompiler<'a> {
    pub fn new(factory: &'a ExpressionFactory<'a>, algs: &'a CombiningAlgRegistry) -> Self {
        Self { factory, algs }
    }

    fn ident(id: &str, version: &str) -> Result<PolicyIdent> {
        Ok(PolicyIdent {
            id: Arc::from(id),
            version: PolicyVersion::parse(version)
                .map_err(|e| PdpError::InvalidArgument(format!("policy '{id}': {e}")))?,
        })
    }

    /// Compiles a `<Policy>`: variables, rules, rule combining algorithm.
    pub fn compile_policy(&self, node: &PolicyNode) -> Result<Arc<PolicyEvaluator>> {
        let ident = Self::ident(&node.id, &node.version)?;
        let registry = self.factory.registry();
        let target = Target::new(node.target.as_ref(), registry)?;

        // VariableDefinitions are lexically scoped to the policy and must
        // be defined before use.
        let mut scope = VariableScope::root();
        for (var_id, expr_node) in &node.variables {
            let def = self.factory.build_variable(var_id, expr_node, &scope)?;
            scope.define(def);
        }

        let rules = node
            .rules
            .iter()
            .map(|r| RuleEvaluator::new(r, registry, self.factory, &scope).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let alg = self
            .algs
            .get(&node.rule_combining_alg_id, AlgScope::RuleCombining)?;
        let combiner = alg.evaluator(Children::Rules(rules))?;

        let pep_actions = node
            .pep_actions
            .iter()
            .map(|p| PepActionExpression::new(p, self.factory, &scope))
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(PolicyEvaluator::new(
            ident,
            target,
            combiner,
            pep_actions,
        )))
    }

    /// Compiles a `<PolicySet>`. References among the children are
    /// resolved through `resolver`; passing `None` makes any reference a
    /// load error.
    pub fn compile_policy_set(
        &self,
        node: &PolicySetNode,
        resolver: Option<&StaticRefResolver<'_>>,
    ) -> Result<Arc<PolicyEvaluator>> {
        let ident = Self::ident(&node.id, &node.version)?;
        let registry = self.factory.registry();
        let target = Target::new(node.target.as_ref(), registry)?;

        let children = node
            .children
            .iter()
            .map(|child| match child {
                PolicyChildNode::Policy(p) => self.compile_policy(p),
                PolicyChildNode::PolicySet(ps) => self.compile_policy_set(ps, resolver),
                PolicyChildNode::Reference(r) => match resolver {
                    Some(resolver) => resolver.resolve(&r.id, &r.patterns),
                    None => Err(PdpError::UnresolvedReference(format!(
                        "'{}' (no reference resolver configured)",
                        r.id
                    ))),
                },
            })
            .collect::<Result<Vec<_>>>()?;

        let alg = self
            .algs
            .get(&node.policy_combining_alg_id, AlgScope::PolicyCombining)?;
        let combiner = alg.evaluator(Children::Policies(children))?;

        // PolicySets define no variables; PEP actions see an empty scope.
        let scope = VariableScope::root();
        let pep_actions = node
            .pep_actions
            .iter()
            .map(|p| PepActionExpression::new(p, self.factory, &scope))
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(PolicyEvaluator::new(
            ident,
            target,
            combiner,
            pep_actions,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RuleNode;
    use xacml_core::{Decision, Effect, IndividualDecisionRequest};
    use xacml_eval::{EvalLimits, EvaluationContext, FunctionRegistry, XPathUnsupported};

    fn policy_node(id: &str, alg: &str, rules: Vec<RuleNode>) -> PolicyNode {
        PolicyNode {
            id: id.into(),
            version: "1.0".into(),
            description: None,
            target: None,
            variables: vec![],
            rule_combining_alg_id: alg.into(),
            rules,
            pep_actions: vec![],
        }
    }

    fn permit_rule(id: &str) -> RuleNode {
        RuleNode {
            id: id.into(),
            effect: Effect::Permit,
            description: None,
            target: None,
            condition: None,
            pep_actions: vec![],
        }
    }

    #[test]
    fn compile_and_evaluate_policy() {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let algs = CombiningAlgRegistry::standard();
        let compiler = PolicyCompiler::new(&factory, &algs);

        let policy = compiler
            .compile_policy(&policy_node(
                "P1",
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides",
                vec![permit_rule("r1")],
            ))
            .unwrap();

        let request = IndividualDecisionRequest::default();
        let xpath = XPathUnsupported;
        let ctx = EvaluationContext::new(&request, EvalLimits::default(), &xpath);
        let result = policy.evaluate(&ctx, true);
        assert_eq!(result.decision, Decision::Permit);
        assert_eq!(result.applicable_policies.len(), 1);
        assert_eq!(&*result.applicable_policies[0].id, "P1");
    }

    #[test]
    fn unknown_combining_algorithm_fails_load() {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let algs = CombiningAlgRegistry::standard();
        let compiler = PolicyCompiler::new(&factory, &algs);

        let err = compiler.compile_policy(&policy_node("P1", "urn:nope", vec![permit_rule("r")]));
        assert!(matches!(err, Err(PdpError::UnknownCombiningAlg(_))));
    }

    #[test]
    fn rule_combining_uri_rejected_for_policy_sets() {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let algs = CombiningAlgRegistry::standard();
        let compiler = PolicyCompiler::new(&factory, &algs);

        let node = PolicySetNode {
            id: "PS".into(),
            version: "1.0".into(),
            description: None,
            target: None,
            // rule-combining URI in a policy-set position
            policy_combining_alg_id:
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides".into(),
            children: vec![],
            pep_actions: vec![],
        };
        assert!(compiler.compile_policy_set(&node, None).is_err());
    }

    #[test]
    fn reference_without_resolver_fails_load() {
        let registry = FunctionRegistry::standard();
        let factory = ExpressionFactory::new(&registry, 10);
        let algs = CombiningAlgRegistry::standard();
        let compiler = PolicyCompiler::new(&factory, &algs);

        let node = PolicySetNode {
            id: "PS".into(),
            version: "1.0".into(),
            description: None,
            target: None,
            policy_combining_alg_id:
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable".into(),
            children: vec![PolicyChildNode::Reference(crate::tree::PolicyRefNode {
                id: "missing".into(),
                patterns: Default::default(),
            })],
            pep_actions: vec![],
        };
        assert!(matches!(
            compiler.compile_policy_set(&node, None),
            Err(PdpError::UnresolvedReference(_))
        ));
    }
}
