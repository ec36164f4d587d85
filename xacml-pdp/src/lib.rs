//! # XACML PDP
//!
//! The Policy Decision Point facade: wires the function and combining
//! registries, compiles the root policy (resolving static references),
//! preprocesses requests, and evaluates them.
//!
//! The built [`Pdp`] is immutable and `Send + Sync`; requests evaluate
//! concurrently on independent threads, each with its own per-request
//! context. `evaluate` never fails; every error becomes an Indeterminate
//! decision with the appropriate status code.
//!
//! ```
//! use xacml_core::Effect;
//! use xacml_pdp::{Pdp, PdpConfig, RawRequest};
//! use xacml_policy::tree::{PolicyNode, RuleNode};
//!
//! let policy = PolicyNode {
//!     id: "example".into(),
//!     version: "1.0".into(),
//!     description: None,
//!     target: None,
//!     variables: vec![],
//!     rule_combining_alg_id:
//!         "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-unless-permit".into(),
//!     rules: vec![RuleNode {
//!         id: "permit-all".into(),
//!         effect: Effect::Permit,
//!         description: None,
//!         target: None,
//!         condition: None,
//!         pep_actions: vec![],
//!     }],
//!     pep_actions: vec![],
//! };
//!
//! let pdp = Pdp::builder(PdpConfig::default())
//!     .root_policy(policy)
//!     .build()
//!     .unwrap();
//! let result = pdp.evaluate(&RawRequest::default());
//! assert_eq!(result.decision, xacml_core::Decision::Permit);
//! ```

pub mod config;
pub mod request;

use std::sync::Arc;

use tracing::info;
use xacml_core::{DecisionResult, IndeterminateFlavor, PdpError, Result};
use xacml_eval::{EvaluationContext, ExpressionFactory, FunctionRegistry, XPathEvaluator, XPathUnsupported};
use xacml_policy::tree::{PolicyNode, PolicySetNode};
use xacml_policy::{
    CombiningAlgRegistry, PolicyCompiler, PolicyEvaluator, PolicySource, StaticRefResolver,
};

pub use config::PdpConfig;
pub use request::{preprocess, RawAttribute, RawCategory, RawRequest};

/// The root policy element handed to the builder.
#[derive(Debug)]
enum RootNode {
    Policy(PolicyNode),
    PolicySet(PolicySetNode),
}

/// Builder for [`Pdp`].
pub struct PdpBuilder {
    config: PdpConfig,
    functions: Option<Arc<FunctionRegistry>>,
    root: Option<RootNode>,
    referenced: Vec<PolicySource>,
    xpath: Box<dyn XPathEvaluator>,
}

impl PdpBuilder {
    pub fn root_policy(mut self, node: PolicyNode) -> Self {
        self.root = Some(RootNode::Policy(node));
        self
    }

    pub fn root_policy_set(mut self, node: PolicySetNode) -> Self {
        self.root = Some(RootNode::PolicySet(node));
        self
    }

    /// Registers policies available to Policy(Set)IdReference resolution.
    pub fn referenced_policies(mut self, sources: impl IntoIterator<Item = PolicySource>) -> Self {
        self.referenced.extend(sources);
        self
    }

    /// Replaces the standard function registry (e.g. to add extension
    /// functions).
    pub fn function_registry(mut self, registry: FunctionRegistry) -> Self {
        self.functions = Some(Arc::new(registry));
        self
    }

    /// Plugs in an XPath evaluator for AttributeSelector support.
    pub fn xpath_evaluator(mut self, xpath: Box<dyn XPathEvaluator>) -> Self {
        self.xpath = xpath;
        self
    }

    /// Compiles everything; any invalid policy or unknown identifier fails
    /// here, never during evaluation.
    pub fn build(self) -> Result<Pdp> {
        let root = self
            .root
            .ok_or_else(|| PdpError::InvalidArgument("no root policy configured".to_string()))?;
        let functions = self.functions.unwrap_or_else(FunctionRegistry::standard_shared);
        let algs = CombiningAlgRegistry::standard();
        let factory = ExpressionFactory::new(&functions, self.config.max_variable_ref_depth);
        let compiler = PolicyCompiler::new(&factory, &algs);
        let resolver =
            StaticRefResolver::new(&compiler, self.referenced, self.config.max_policy_ref_depth)?;

        let root = match &root {
            RootNode::Policy(p) => compiler.compile_policy(p)?,
            RootNode::PolicySet(ps) => resolver.compile_root(ps)?,
        };

        info!(
            root = %root.ident(),
            functions = functions.len(),
            "PDP initialized"
        );
        Ok(Pdp {
            config: self.config,
            root,
            xpath: self.xpath,
        })
    }
}

/// An initialized Policy Decision Point.
pub struct Pdp {
    config: PdpConfig,
    root: Arc<PolicyEvaluator>,
    xpath: Box<dyn XPathEvaluator>,
}

impl Pdp {
    pub fn builder(config: PdpConfig) -> PdpBuilder {
        PdpBuilder {
            config,
            functions: None,
            root: None,
            referenced: Vec::new(),
            xpath: Box::new(XPathUnsupported),
        }
    }

    pub fn config(&self) -> &PdpConfig {
        &self.config
    }

    /// Evaluates one decision request.
    pub fn evaluate(&self, request: &RawRequest) -> DecisionResult {
        let individual = match request::preprocess(request, &self.config) {
            Ok(individual) => individual,
            // A malformed request yields Indeterminate{DP} with the
            // preprocessing status code.
            Err(e) => return DecisionResult::indeterminate(IndeterminateFlavor::PermitDeny, e),
        };
        let ctx = EvaluationContext::new(&individual, self.config.eval_limits(), self.xpath.as_ref());
        let want_applicable =
            self.config.return_applicable_policies || request.return_policy_id_list;
        self.root.evaluate(&ctx, want_applicable)
    }
}

impl std::fmt::Debug for Pdp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdp")
            .field("root", &self.root.ident())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
