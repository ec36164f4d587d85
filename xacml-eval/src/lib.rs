//! # XACML Eval
//!
//! The expression evaluator and standard function set:
//!
//! - `context`: the per-request [`EvaluationContext`] with its memoization
//!   tables and resource limits, and the pluggable XPath seam
//! - `expression`: the resolved [`Expression`] tree, the unresolved
//!   [`ExpressionNode`] AST handed over by parsers, and the
//!   [`ExpressionFactory`] that links and constant-folds
//! - `function`: first-order function machinery (signatures, bound calls,
//!   registry)
//! - `higher_order`: the any-of / all-of family and `map`
//! - `functions`: the complete XACML 3.0 standard function set
//!
//! Functions evaluate against an `Option<&EvaluationContext>`: `None` is the
//! constant-folding probe, under which anything touching the request fails
//! with Indeterminate.

pub mod context;
pub mod expression;
pub mod function;
pub mod functions;
pub mod higher_order;

pub use context::{EvalLimits, EvaluationContext, XPathEvaluator, XPathUnsupported};
pub use expression::{
    AttributeDesignator, AttributeSelector, Expression, ExpressionFactory, ExpressionNode,
    FunctionCall, VariableDefinition, VariableScope,
};
pub use function::{FirstOrderCall, FirstOrderFunction, FunctionRegistry, Kernel, Signature};
pub use higher_order::{HigherOrderCall, HigherOrderKind};
