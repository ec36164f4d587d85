//! # XACML Policy
//!
//! The policy decision tree: rules, targets, PEP action expressions,
//! policies and policy sets, the combining-algorithm suite, and static
//! policy reference resolution.
//!
//! Everything here is built once at PDP initialization from the unresolved
//! [`tree`] AST (what a policy parser delivers) and is immutable afterwards.
//! Evaluators never fail at runtime; evaluation errors travel as
//! Indeterminate decisions with the effect flavor of the element that
//! raised them.

pub mod combining;
pub mod compile;
pub mod pep;
pub mod policy;
pub mod policy_map;
pub mod resolver;
pub mod rule;
pub mod target;
pub mod tree;

pub use combining::{AlgScope, CombiningAlg, CombiningAlgRegistry, CombiningEvaluator};
pub use compile::PolicyCompiler;
pub use pep::PepActionExpression;
pub use policy::PolicyEvaluator;
pub use policy_map::{PolicyMap, PolicyVersions};
pub use resolver::{PolicySource, StaticRefResolver};
pub use rule::RuleEvaluator;
pub use target::{Match, Target};
