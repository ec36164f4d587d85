//! First-order function machinery.
//!
//! The source design's tower of abstract function classes collapses to a
//! single [`FirstOrderFunction`] value: an id, a signature, a return type
//! and a kernel. A [`Kernel::Eager`] receives fully evaluated argument
//! values; a [`Kernel::Lazy`] receives the argument expressions and drives
//! its own evaluation (the boolean connectives need this for their
//! short-circuit semantics).
//!
//! `new_call` performs strict signature checking at policy load and returns
//! a bound [`FirstOrderCall`]; nothing is type-checked again at evaluation
//! time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use xacml_core::{AttributeValue, DatatypeId, EvalResult, PdpError, Result, Value};

use crate::context::EvaluationContext;
use crate::expression::Expression;
use crate::higher_order::HigherOrderKind;

/// Declared parameter shape of a first-order function.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Required leading parameters.
    pub params: Vec<DatatypeId>,
    /// Type of any number of additional trailing parameters.
    pub varargs: Option<DatatypeId>,
}

impl Signature {
    pub fn fixed(params: Vec<DatatypeId>) -> Self {
        Self {
            params,
            varargs: None,
        }
    }

    pub fn varargs(params: Vec<DatatypeId>, tail: DatatypeId) -> Self {
        Self {
            params,
            varargs: Some(tail),
        }
    }

    /// Checks actual argument types against the declaration.
    fn check(&self, function_id: &str, arg_types: &[DatatypeId]) -> Result<()> {
        match self.varargs {
            None if arg_types.len() != self.params.len() => {
                return Err(PdpError::InvalidArgument(format!(
                    "function '{function_id}': invalid number of arguments ({}), required: {}",
                    arg_types.len(),
                    self.params.len()
                )));
            }
            Some(_) if arg_types.len() < self.params.len() => {
                return Err(PdpError::InvalidArgument(format!(
                    "function '{function_id}': invalid number of arguments ({}), required: >= {}",
                    arg_types.len(),
                    self.params.len()
                )));
            }
            _ => {}
        }

        for (i, actual) in arg_types.iter().enumerate() {
            let expected = self.params.get(i).or(self.varargs.as_ref()).copied();
            // varargs presence was checked above
            let Some(expected) = expected else { break };
            if *actual != expected {
                return Err(PdpError::InvalidArgument(format!(
                    "function '{function_id}': invalid type of arg #{i}: expected {expected}, got {actual}"
                )));
            }
        }
        Ok(())
    }
}

/// The computation behind a function.
pub enum Kernel {
    /// Pure value transformer; arguments are evaluated by the call.
    Eager(Box<dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync>),
    /// Drives its own argument evaluation (short-circuit connectives).
    Lazy(Box<dyn Fn(&[Expression], Option<&EvaluationContext>) -> EvalResult<Value> + Send + Sync>),
}

/// A first-order function: evaluates all (needed) arguments to values, then
/// computes. Immutable; registered once at PDP initialization.
pub struct FirstOrderFunction {
    id: Arc<str>,
    signature: Signature,
    return_type: DatatypeId,
    /// Impure functions are exempt from constant folding.
    pure: bool,
    kernel: Kernel,
}

impl fmt::Debug for FirstOrderFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstOrderFunction")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl FirstOrderFunction {
    pub fn new(
        id: impl Into<Arc<str>>,
        signature: Signature,
        return_type: DatatypeId,
        kernel: Kernel,
    ) -> Self {
        Self {
            id: id.into(),
            signature,
            return_type,
            pure: true,
            kernel,
        }
    }

    /// Marks the function impure, exempting it from constant folding.
    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn return_type(&self) -> DatatypeId {
        self.return_type
    }

    pub fn is_pure(&self) -> bool {
        self.pure
    }

    /// Type-checks and binds a call.
    ///
    /// `trailing_types` declares arguments that will be supplied as values
    /// per invocation (higher-order functions bind bag elements this way);
    /// they follow the expression arguments positionally.
    pub fn new_call(
        self: &Arc<Self>,
        args: Vec<Expression>,
        trailing_types: &[DatatypeId],
    ) -> Result<FirstOrderCall> {
        let mut arg_types: Vec<DatatypeId> =
            args.iter().map(Expression::return_type).collect();
        arg_types.extend_from_slice(trailing_types);
        self.signature.check(&self.id, &arg_types)?;
        Ok(FirstOrderCall {
            func: Arc::clone(self),
            args,
        })
    }
}

/// A bound first-order call: the function plus its argument expressions.
#[derive(Debug, Clone)]
pub struct FirstOrderCall {
    func: Arc<FirstOrderFunction>,
    args: Vec<Expression>,
}

impl FirstOrderCall {
    pub fn function(&self) -> &Arc<FirstOrderFunction> {
        &self.func
    }

    /// The bound argument expressions.
    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    pub fn return_type(&self) -> DatatypeId {
        self.func.return_type
    }

    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Value> {
        match &self.func.kernel {
            Kernel::Lazy(kernel) => kernel(&self.args, ctx),
            Kernel::Eager(kernel) => {
                let mut values = Vec::with_capacity(self.args.len());
                for (i, arg) in self.args.iter().enumerate() {
                    let v = arg.evaluate(ctx).map_err(|e| {
                        e.context(format!("function '{}': Indeterminate arg #{i}", self.func.id))
                    })?;
                    values.push(v);
                }
                kernel(&values)
            }
        }
    }

    /// Evaluates with additional trailing argument values, used by
    /// higher-order functions to inject bag elements.
    pub fn evaluate_with_trailing(
        &self,
        ctx: Option<&EvaluationContext>,
        trailing: &[AttributeValue],
    ) -> EvalResult<Value> {
        match &self.func.kernel {
            Kernel::Eager(kernel) => {
                let mut values = Vec::with_capacity(self.args.len() + trailing.len());
                for (i, arg) in self.args.iter().enumerate() {
                    let v = arg.evaluate(ctx).map_err(|e| {
                        e.context(format!("function '{}': Indeterminate arg #{i}", self.func.id))
                    })?;
                    values.push(v);
                }
                values.extend(trailing.iter().cloned().map(Value::Primitive));
                kernel(&values)
            }
            Kernel::Lazy(kernel) => {
                // Lazy kernels consume expressions; materialize the trailing
                // values as constants.
                let mut exprs = self.args.clone();
                exprs.extend(
                    trailing
                        .iter()
                        .map(|v| Expression::Constant(Value::Primitive(v.clone()))),
                );
                kernel(&exprs, ctx)
            }
        }
    }
}

/// The function registry: an explicit handle, constructed once at PDP
/// initialization and passed by reference through the expression factory.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    first_order: HashMap<Arc<str>, Arc<FirstOrderFunction>>,
    higher_order: HashMap<Arc<str>, HigherOrderKind>,
}

impl FunctionRegistry {
    /// An empty registry; callers register their own functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The complete XACML 3.0 standard function set.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        crate::functions::register_standard(&mut registry);
        registry
    }

    /// Process-wide shared instance of the standard registry; building the
    /// full set is not free and its content never varies.
    pub fn standard_shared() -> Arc<FunctionRegistry> {
        static STANDARD: Lazy<Arc<FunctionRegistry>> =
            Lazy::new(|| Arc::new(FunctionRegistry::standard()));
        Arc::clone(&STANDARD)
    }

    /// Registers a first-order function, replacing any previous entry with
    /// the same id.
    pub fn register(&mut self, function: FirstOrderFunction) {
        let function = Arc::new(function);
        self.first_order
            .insert(Arc::clone(function.id()), function);
    }

    pub fn register_higher_order(&mut self, id: impl Into<Arc<str>>, kind: HigherOrderKind) {
        self.higher_order.insert(id.into(), kind);
    }

    pub fn first_order(&self, id: &str) -> Option<&Arc<FirstOrderFunction>> {
        self.first_order.get(id)
    }

    pub fn higher_order(&self, id: &str) -> Option<HigherOrderKind> {
        self.higher_order.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.first_order.contains_key(id) || self.higher_order.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.first_order.len() + self.higher_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::Datatype;

    fn dummy(id: &str, signature: Signature) -> Arc<FirstOrderFunction> {
        Arc::new(FirstOrderFunction::new(
            id,
            signature,
            Datatype::Boolean.into(),
            Kernel::Eager(Box::new(|_| Ok(Value::from(true)))),
        ))
    }

    #[test]
    fn fixed_arity_is_enforced() {
        let f = dummy(
            "test:two-strings",
            Signature::fixed(vec![Datatype::String.into(), Datatype::String.into()]),
        );
        let one_arg = vec![Expression::Constant(Value::Primitive(
            AttributeValue::String("x".into()),
        ))];
        assert!(f.new_call(one_arg, &[]).is_err());
    }

    #[test]
    fn trailing_types_count_toward_arity() {
        let f = dummy(
            "test:two-strings",
            Signature::fixed(vec![Datatype::String.into(), Datatype::String.into()]),
        );
        let call = f
            .new_call(
                vec![Expression::Constant(Value::Primitive(
                    AttributeValue::String("x".into()),
                ))],
                &[Datatype::String.into()],
            )
            .unwrap();
        let out = call
            .evaluate_with_trailing(None, &[AttributeValue::String("y".into())])
            .unwrap();
        assert_eq!(out, Value::from(true));
    }

    #[test]
    fn type_mismatch_is_invalid_argument() {
        let f = dummy(
            "test:one-string",
            Signature::fixed(vec![Datatype::String.into()]),
        );
        let arg = vec![Expression::Constant(Value::Primitive(
            AttributeValue::Integer(3),
        ))];
        let err = f.new_call(arg, &[]).unwrap_err();
        assert!(matches!(err, PdpError::InvalidArgument(_)));
    }

    #[test]
    fn varargs_minimum() {
        let f = dummy(
            "test:concat",
            Signature::varargs(
                vec![Datatype::String.into(), Datatype::String.into()],
                Datatype::String.into(),
            ),
        );
        let mk = |n: usize| {
            (0..n)
                .map(|_| {
                    Expression::Constant(Value::Primitive(AttributeValue::String("s".into())))
                })
                .collect::<Vec<_>>()
        };
        assert!(f.new_call(mk(1), &[]).is_err());
        assert!(f.new_call(mk(2), &[]).is_ok());
        assert!(f.new_call(mk(5), &[]).is_ok());
    }
}
