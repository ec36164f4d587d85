//! The expression tree.
//!
//! Parsers deliver an unresolved [`ExpressionNode`] AST. The
//! [`ExpressionFactory`] resolves function ids against the registry,
//! type-checks every application, links variable references to their
//! definitions, and constant-folds applications whose static evaluation
//! succeeds. The resolved [`Expression`] is what evaluators walk.

use std::sync::Arc;

use tracing::debug;
use xacml_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, DatatypeId, EvalResult, IndeterminateError,
    PdpError, Result, Value,
};

use crate::context::EvaluationContext;
use crate::function::{FirstOrderCall, FunctionRegistry};
use crate::higher_order::HigherOrderCall;

/// A named, reusable expression (XACML VariableDefinition).
///
/// `depth` is the length of the longest VariableReference chain below this
/// definition; the factory bounds it at build time.
#[derive(Debug)]
pub struct VariableDefinition {
    pub id: Arc<str>,
    pub expression: Expression,
    pub(crate) depth: usize,
}

/// An AttributeDesignator: fetches a request bag by fully-qualified name.
#[derive(Debug, Clone)]
pub struct AttributeDesignator {
    pub fqn: AttributeFqn,
    pub datatype: Datatype,
    pub must_be_present: bool,
}

impl AttributeDesignator {
    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Bag> {
        let Some(ctx) = ctx else {
            return Err(IndeterminateError::processing_error(format!(
                "AttributeDesignator {}: no evaluation context",
                self.fqn
            )));
        };
        match ctx.attribute_bag(&self.fqn, self.datatype) {
            Some(bag) => Ok(bag),
            None if self.must_be_present => {
                Err(IndeterminateError::missing_attribute(self.fqn.clone()))
            }
            None => Ok(Bag::empty(self.datatype)),
        }
    }
}

/// An AttributeSelector: XPath over a category's Content.
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pub category: Arc<str>,
    pub path: Arc<str>,
    pub datatype: Datatype,
    pub must_be_present: bool,
}

impl AttributeSelector {
    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Bag> {
        let Some(ctx) = ctx else {
            return Err(IndeterminateError::processing_error(format!(
                "AttributeSelector {:?}: no evaluation context",
                self.path
            )));
        };
        match ctx.evaluate_selector(&self.category, &self.path, self.datatype)? {
            Some(bag) => Ok(bag),
            None if self.must_be_present => Err(IndeterminateError::missing_attribute(
                AttributeFqn::new(Arc::clone(&self.category), Arc::clone(&self.path), None::<&str>),
            )),
            None => Ok(Bag::empty(self.datatype)),
        }
    }
}

/// A bound function application: first-order or higher-order.
#[derive(Debug, Clone)]
pub enum FunctionCall {
    FirstOrder(FirstOrderCall),
    HigherOrder(HigherOrderCall),
}

impl FunctionCall {
    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Value> {
        match self {
            FunctionCall::FirstOrder(call) => call.evaluate(ctx),
            FunctionCall::HigherOrder(call) => call.evaluate(ctx),
        }
    }

    pub fn return_type(&self) -> DatatypeId {
        match self {
            FunctionCall::FirstOrder(call) => call.return_type(),
            FunctionCall::HigherOrder(call) => call.return_type(),
        }
    }

    fn is_pure(&self) -> bool {
        match self {
            FunctionCall::FirstOrder(call) => call.function().is_pure(),
            FunctionCall::HigherOrder(call) => call.sub_function().is_pure(),
        }
    }
}

/// A resolved, type-checked expression.
#[derive(Debug, Clone)]
pub enum Expression {
    Constant(Value),
    Designator(AttributeDesignator),
    Selector(AttributeSelector),
    VariableRef(Arc<VariableDefinition>),
    Apply(Box<FunctionCall>),
}

impl Expression {
    /// The statically known result, for constants.
    pub fn static_value(&self) -> Option<&Value> {
        match self {
            Expression::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn return_type(&self) -> DatatypeId {
        match self {
            Expression::Constant(v) => v.datatype_id(),
            Expression::Designator(d) => d.datatype.bag_of(),
            Expression::Selector(s) => s.datatype.bag_of(),
            Expression::VariableRef(def) => def.expression.return_type(),
            Expression::Apply(call) => call.return_type(),
        }
    }

    /// Evaluates to a value or raises Indeterminate. `ctx == None` is the
    /// constant-folding probe: anything touching the request fails it.
    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Value> {
        match self {
            Expression::Constant(v) => Ok(v.clone()),
            Expression::Designator(d) => d.evaluate(ctx).map(Value::Bag),
            Expression::Selector(s) => s.evaluate(ctx).map(Value::Bag),
            Expression::VariableRef(def) => {
                let Some(ctx) = ctx else {
                    return Err(IndeterminateError::processing_error(format!(
                        "VariableReference {:?}: no evaluation context",
                        def.id
                    )));
                };
                let key = Arc::as_ptr(def) as usize;
                if let Some(v) = ctx.cached_variable(key) {
                    return Ok(v);
                }
                let v = def.expression.evaluate(Some(ctx))?;
                ctx.memoize_variable(key, v.clone());
                Ok(v)
            }
            Expression::Apply(call) => call.evaluate(ctx),
        }
    }
}

/// The unresolved expression AST delivered by parsers.
#[derive(Debug, Clone)]
pub enum ExpressionNode {
    /// A typed literal (AttributeValue element).
    Literal(AttributeValue),
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
    VariableRef(String),
    Apply {
        function_id: String,
        args: Vec<ExpressionNode>,
    },
    /// `<Function FunctionId=…/>`: only valid as the first argument of a
    /// higher-order function application.
    FunctionRef(String),
}

/// Lexically scoped VariableDefinitions visible while building an
/// expression. XACML requires definition before use, so a plain chain of
/// maps suffices and reference cycles cannot form.
#[derive(Debug, Default)]
pub struct VariableScope<'a> {
    parent: Option<&'a VariableScope<'a>>,
    vars: std::collections::HashMap<String, Arc<VariableDefinition>>,
}

impl<'a> VariableScope<'a> {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&'a self) -> VariableScope<'a> {
        VariableScope {
            parent: Some(self),
            vars: Default::default(),
        }
    }

    pub fn define(&mut self, def: Arc<VariableDefinition>) {
        self.vars.insert(def.id.to_string(), def);
    }

    pub fn lookup(&self, id: &str) -> Option<&Arc<VariableDefinition>> {
        self.vars
            .get(id)
            .or_else(|| self.parent.and_then(|p| p.lookup(id)))
    }
}

/// Builds resolved expressions: function lookup, type checking, variable
/// linking, constant folding.
#[derive(Debug)]
pub struct ExpressionFactory<'r> {
    registry: &'r FunctionRegistry,
    max_variable_ref_depth: usize,
}

impl<'r> ExpressionFactory<'r> {
    pub fn new(registry: &'r FunctionRegistry, max_variable_ref_depth: usize) -> Self {
        Self {
            registry,
            max_variable_ref_depth,
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        self.registry
    }

    /// Builds a VariableDefinition, bounding the reference chain depth.
    pub fn build_variable(
        &self,
        id: &str,
        node: &ExpressionNode,
        scope: &VariableScope,
    ) -> Result<Arc<VariableDefinition>> {
        let expression = self.build(node, scope)?;
        let depth = 1 + max_ref_depth(&expression);
        if depth > self.max_variable_ref_depth {
            return Err(PdpError::VariableRefDepthExceeded(
                self.max_variable_ref_depth,
            ));
        }
        Ok(Arc::new(VariableDefinition {
            id: Arc::from(id),
            expression,
            depth,
        }))
    }

    /// Resolves and type-checks one expression node.
    pub fn build(&self, node: &ExpressionNode, scope: &VariableScope) -> Result<Expression> {
        match node {
            ExpressionNode::Literal(v) => Ok(Expression::Constant(Value::Primitive(v.clone()))),
            ExpressionNode::Designator {
                category,
                id,
                issuer,
                datatype,
                must_be_present,
            } => Ok(Expression::Designator(AttributeDesignator {
                fqn: AttributeFqn::new(category.as_str(), id.as_str(), issuer.as_deref()),
                datatype: *datatype,
                must_be_present: *must_be_present,
            })),
            ExpressionNode::Selector {
                category,
                path,
                datatype,
                must_be_present,
            } => Ok(Expression::Selector(AttributeSelector {
                category: Arc::from(category.as_str()),
                path: Arc::from(path.as_str()),
                datatype: *datatype,
                must_be_present: *must_be_present,
            })),
            ExpressionNode::VariableRef(id) => scope
                .lookup(id)
                .map(|def| Expression::VariableRef(Arc::clone(def)))
                .ok_or_else(|| PdpError::UndefinedVariable(id.clone())),
            ExpressionNode::FunctionRef(id) => Err(PdpError::InvalidArgument(format!(
                "function reference '{id}' is only valid as the first argument of a higher-order function"
            ))),
            ExpressionNode::Apply { function_id, args } => {
                self.build_apply(function_id, args, scope)
            }
        }
    }

    fn build_apply(
        &self,
        function_id: &str,
        args: &[ExpressionNode],
        scope: &VariableScope,
    ) -> Result<Expression> {
        let call = if let Some(kind) = self.registry.higher_order(function_id) {
            // First argument must be a reference to the boolean (or, for
            // map, any primitive-returning) sub-function.
            let Some((ExpressionNode::FunctionRef(sub_id), rest)) = args.split_first() else {
                return Err(PdpError::InvalidArgument(format!(
                    "higher-order function '{function_id}': first argument must be a <Function>"
                )));
            };
            let sub = self
                .registry
                .first_order(sub_id)
                .ok_or_else(|| PdpError::UnknownFunction(sub_id.clone()))?;
            let rest = rest
                .iter()
                .map(|n| self.build(n, scope))
                .collect::<Result<Vec<_>>>()?;
            FunctionCall::HigherOrder(HigherOrderCall::new(
                function_id,
                kind,
                Arc::clone(sub),
                rest,
            )?)
        } else if let Some(func) = self.registry.first_order(function_id) {
            let args = args
                .iter()
                .map(|n| self.build(n, scope))
                .collect::<Result<Vec<_>>>()?;
            FunctionCall::FirstOrder(func.new_call(args, &[])?)
        } else {
            return Err(PdpError::UnknownFunction(function_id.to_string()));
        };

        // Constant folding: probe static evaluation in the null context.
        // Only pure functions are eligible; a probe failure just means the
        // expression depends on the request.
        if call.is_pure() {
            if let Ok(value) = call.evaluate(None) {
                debug!(function = function_id, "constant-folded function application");
                return Ok(Expression::Constant(value));
            }
        }
        Ok(Expression::Apply(Box::new(call)))
    }
}

/// Longest VariableReference chain within an expression.
fn max_ref_depth(expr: &Expression) -> usize {
    match expr {
        Expression::VariableRef(def) => def.depth,
        Expression::Apply(call) => match call.as_ref() {
            FunctionCall::FirstOrder(c) => {
                c.args().iter().map(max_ref_depth).max().unwrap_or(0)
            }
            FunctionCall::HigherOrder(c) => {
                c.args().into_iter().map(max_ref_depth).max().unwrap_or(0)
            }
        },
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionRegistry;

    fn factory(registry: &FunctionRegistry) -> ExpressionFactory<'_> {
        ExpressionFactory::new(registry, 10)
    }

    fn str_lit(s: &str) -> ExpressionNode {
        ExpressionNode::Literal(AttributeValue::String(s.into()))
    }

    #[test]
    fn constant_folding_replaces_static_applications() {
        let registry = FunctionRegistry::standard();
        let factory = factory(&registry);
        let node = ExpressionNode::Apply {
            function_id: "urn:oasis:names:tc:xacml:1.0:function:string-equal".into(),
            args: vec![str_lit("a"), str_lit("a")],
        };
        let expr = factory.build(&node, &VariableScope::root()).unwrap();
        assert_eq!(expr.static_value(), Some(&Value::from(true)));
    }

    #[test]
    fn designator_applications_stay_variable() {
        let registry = FunctionRegistry::standard();
        let factory = factory(&registry);
        let node = ExpressionNode::Apply {
            function_id: "urn:oasis:names:tc:xacml:1.0:function:string-bag-size".into(),
            args: vec![ExpressionNode::Designator {
                category: xacml_core::attribute::categories::ACCESS_SUBJECT.into(),
                id: "subject-id".into(),
                issuer: None,
                datatype: Datatype::String,
                must_be_present: false,
            }],
        };
        let expr = factory.build(&node, &VariableScope::root()).unwrap();
        assert!(expr.static_value().is_none());
        assert_eq!(expr.return_type(), Datatype::Integer.into());
    }

    #[test]
    fn unknown_function_is_load_error() {
        let registry = FunctionRegistry::standard();
        let factory = factory(&registry);
        let node = ExpressionNode::Apply {
            function_id: "urn:example:no-such-function".into(),
            args: vec![],
        };
        assert!(matches!(
            factory.build(&node, &VariableScope::root()),
            Err(PdpError::UnknownFunction(_))
        ));
    }

    #[test]
    fn undefined_variable_is_load_error() {
        let registry = FunctionRegistry::standard();
        let factory = factory(&registry);
        let node = ExpressionNode::VariableRef("missing".into());
        assert!(matches!(
            factory.build(&node, &VariableScope::root()),
            Err(PdpError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn variable_definitions_resolve_and_memoize() {
        let registry = FunctionRegistry::standard();
        let factory = factory(&registry);
        let mut scope = VariableScope::root();
        let def = factory
            .build_variable("is-admin", &str_lit("admin"), &scope)
            .unwrap();
        scope.define(def);

        let expr = factory
            .build(&ExpressionNode::VariableRef("is-admin".into()), &scope)
            .unwrap();
        let request = xacml_core::IndividualDecisionRequest::default();
        let xpath = crate::context::XPathUnsupported;
        let ctx = EvaluationContext::new(&request, Default::default(), &xpath);
        let v1 = expr.evaluate(Some(&ctx)).unwrap();
        let v2 = expr.evaluate(Some(&ctx)).unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn missing_designator_with_must_be_present_is_missing_attribute() {
        let designator = AttributeDesignator {
            fqn: AttributeFqn::new("cat", "id", None::<&str>),
            datatype: Datatype::String,
            must_be_present: true,
        };
        let request = xacml_core::IndividualDecisionRequest::default();
        let xpath = crate::context::XPathUnsupported;
        let ctx = EvaluationContext::new(&request, Default::default(), &xpath);
        let err = designator.evaluate(Some(&ctx)).unwrap_err();
        assert_eq!(err.status, xacml_core::StatusCode::MissingAttribute);

        let optional = AttributeDesignator {
            must_be_present: false,
            ..designator
        };
        let bag = optional.evaluate(Some(&ctx)).unwrap();
        assert!(bag.is_empty());
    }
}
