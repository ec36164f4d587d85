//! Higher-order bag functions: any-of, all-of, any-of-any, all-of-any,
//! any-of-all, all-of-all, map.
//!
//! All take a first-order sub-function reference as their first argument
//! and apply it over bag elements:
//!
//! - any-of / all-of / map: exactly one bag among the remaining arguments,
//!   the rest primitives; the sub-function sees each bag element in the
//!   bag's position
//! - all-of-any / any-of-all / all-of-all: exactly two bags
//! - any-of-any: any mix of primitives and bags; the sub-function is applied
//!   over the full Cartesian product
//!
//! Bag arguments are evaluated exactly once. Empty-bag results follow the
//! XACML tables: any-of → false, all-of → true, map → empty bag, and the
//! two-bag / any-of-any forms → false for any empty bag. Sub-function
//! Indeterminates propagate immediately. Cartesian enumeration is bounded
//! by the configured maximum product size.

use std::sync::Arc;

use xacml_core::{
    AttributeValue, Bag, Datatype, DatatypeId, EvalResult, IndeterminateError, PdpError, Result,
    Value,
};

use crate::context::{EvalLimits, EvaluationContext};
use crate::expression::Expression;
use crate::function::{FirstOrderCall, FirstOrderFunction};

/// Which higher-order function an application names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HigherOrderKind {
    AnyOf,
    AllOf,
    AnyOfAny,
    AllOfAny,
    AnyOfAll,
    AllOfAll,
    Map,
}

/// One-bag evaluation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OneBagMode {
    /// Short-circuit on true, default false.
    AnyOf,
    /// Short-circuit on false, default true.
    AllOf,
    /// Collect sub-function results into a bag.
    Map,
}

/// Two-bag evaluation modes, named for the quantifier structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TwoBagMode {
    /// ∀x∈B₀ ∀y∈B₁ : f(x, y)
    AllOfAll,
    /// ∀x∈B₀ ∃y∈B₁ : f(x, y)
    AllOfAny,
    /// ∀y∈B₁ ∃x∈B₀ : f(x, y)
    AnyOfAll,
}

#[derive(Debug, Clone)]
enum Body {
    OneBag {
        mode: OneBagMode,
        before: Vec<Expression>,
        bag: Expression,
        after: Vec<Expression>,
    },
    TwoBags {
        mode: TwoBagMode,
        bag0: Expression,
        bag1: Expression,
    },
    AnyOfAny {
        args: Vec<Expression>,
    },
}

/// A bound higher-order function call.
#[derive(Debug, Clone)]
pub struct HigherOrderCall {
    id: Arc<str>,
    /// Sub-function call bound with no expressions; every argument is
    /// supplied as a trailing value per invocation.
    sub_call: FirstOrderCall,
    body: Body,
    return_type: DatatypeId,
}

impl HigherOrderCall {
    /// Type-checks a higher-order application and binds the sub-function.
    pub fn new(
        function_id: &str,
        kind: HigherOrderKind,
        sub: Arc<FirstOrderFunction>,
        args: Vec<Expression>,
    ) -> Result<Self> {
        let invalid = |msg: String| PdpError::InvalidArgument(format!("function '{function_id}': {msg}"));

        let sub_return = match sub.return_type() {
            DatatypeId::Primitive(dt) => dt,
            bag => {
                return Err(invalid(format!(
                    "sub-function '{}' returns {bag}, expected a primitive datatype",
                    sub.id()
                )))
            }
        };
        if kind != HigherOrderKind::Map && sub_return != Datatype::Boolean {
            return Err(invalid(format!(
                "sub-function '{}' must return boolean, returns {}",
                sub.id(),
                sub_return.uri()
            )));
        }

        match kind {
            HigherOrderKind::AnyOf | HigherOrderKind::AllOf | HigherOrderKind::Map => {
                if args.is_empty() {
                    return Err(invalid("invalid number of arguments, required: >= 2".into()));
                }
                let mut before = Vec::new();
                let mut bag = None;
                let mut after = Vec::new();
                for (i, arg) in args.into_iter().enumerate() {
                    if arg.return_type().is_bag() {
                        if bag.is_some() {
                            return Err(invalid(format!(
                                "invalid argument type (expected: primitive, actual: bag) for arg #{}",
                                i + 1
                            )));
                        }
                        bag = Some(arg);
                    } else if bag.is_none() {
                        before.push(arg);
                    } else {
                        after.push(arg);
                    }
                }
                let bag = bag
                    .ok_or_else(|| invalid("expected one and only one bag argument, got none".into()))?;

                // The sub-function sees: before values, the bag element,
                // after values, all as trailing values.
                let elem_type = bag
                    .return_type()
                    .bag_element_type()
                    .expect("bag argument has a bag datatype");
                let mut types: Vec<DatatypeId> =
                    before.iter().map(Expression::return_type).collect();
                types.push(elem_type.into());
                types.extend(after.iter().map(Expression::return_type));
                let sub_call = sub.new_call(Vec::new(), &types)?;

                let (mode, return_type) = match kind {
                    HigherOrderKind::AnyOf => (OneBagMode::AnyOf, Datatype::Boolean.into()),
                    HigherOrderKind::AllOf => (OneBagMode::AllOf, Datatype::Boolean.into()),
                    _ => (OneBagMode::Map, sub_return.bag_of()),
                };
                Ok(Self {
                    id: Arc::from(function_id),
                    sub_call,
                    body: Body::OneBag {
                        mode,
                        before,
                        bag,
                        after,
                    },
                    return_type,
                })
            }

            HigherOrderKind::AllOfAny | HigherOrderKind::AnyOfAll | HigherOrderKind::AllOfAll => {
                let [bag0, bag1]: [Expression; 2] = args
                    .try_into()
                    .map_err(|_| invalid("invalid number of arguments, required: 3".into()))?;
                let elem0 = bag0.return_type().bag_element_type().ok_or_else(|| {
                    invalid("invalid second argument type: primitive, required: a bag".into())
                })?;
                let elem1 = bag1.return_type().bag_element_type().ok_or_else(|| {
                    invalid("invalid last argument type: primitive, required: a bag".into())
                })?;
                let sub_call = sub.new_call(Vec::new(), &[elem0.into(), elem1.into()])?;
                let mode = match kind {
                    HigherOrderKind::AllOfAny => TwoBagMode::AllOfAny,
                    HigherOrderKind::AnyOfAll => TwoBagMode::AnyOfAll,
                    _ => TwoBagMode::AllOfAll,
                };
                Ok(Self {
                    id: Arc::from(function_id),
                    sub_call,
                    body: Body::TwoBags { mode, bag0, bag1 },
                    return_type: Datatype::Boolean.into(),
                })
            }

            HigherOrderKind::AnyOfAny => {
                if args.is_empty() {
                    return Err(invalid("invalid number of arguments, required: >= 2".into()));
                }
                // Bags contribute their element type to the sub-function
                // signature, primitives their own type.
                let types: Vec<DatatypeId> = args
                    .iter()
                    .map(|a| match a.return_type() {
                        DatatypeId::Bag(elem) => elem.into(),
                        prim => prim,
                    })
                    .collect();
                let sub_call = sub.new_call(Vec::new(), &types)?;
                Ok(Self {
                    id: Arc::from(function_id),
                    sub_call,
                    body: Body::AnyOfAny { args },
                    return_type: Datatype::Boolean.into(),
                })
            }
        }
    }

    pub fn sub_function(&self) -> &Arc<FirstOrderFunction> {
        self.sub_call.function()
    }

    pub fn return_type(&self) -> DatatypeId {
        self.return_type
    }

    /// All argument expressions after the sub-function reference.
    pub fn args(&self) -> Vec<&Expression> {
        match &self.body {
            Body::OneBag {
                before, bag, after, ..
            } => before.iter().chain([bag]).chain(after.iter()).collect(),
            Body::TwoBags { bag0, bag1, .. } => vec![bag0, bag1],
            Body::AnyOfAny { args } => args.iter().collect(),
        }
    }

    pub fn evaluate(&self, ctx: Option<&EvaluationContext>) -> EvalResult<Value> {
        let limits = ctx.map(EvaluationContext::limits).unwrap_or_default();
        match &self.body {
            Body::OneBag {
                mode,
                before,
                bag,
                after,
            } => self.eval_one_bag(*mode, before, bag, after, ctx),
            Body::TwoBags { mode, bag0, bag1 } => {
                self.eval_two_bags(*mode, bag0, bag1, ctx, limits)
            }
            Body::AnyOfAny { args } => self.eval_any_of_any(args, ctx, limits),
        }
    }

    fn sub_bool(
        &self,
        ctx: Option<&EvaluationContext>,
        args: &[AttributeValue],
    ) -> EvalResult<bool> {
        let result = self.sub_call.evaluate_with_trailing(ctx, args).map_err(|e| {
            e.context(format!("function '{}': error evaluating sub-function", self.id))
        })?;
        match result {
            Value::Primitive(AttributeValue::Boolean(b)) => Ok(b),
            other => Err(IndeterminateError::processing_error(format!(
                "function '{}': sub-function returned {other:?}, expected boolean",
                self.id
            ))),
        }
    }

    fn eval_primitive_args(
        &self,
        exprs: &[Expression],
        ctx: Option<&EvaluationContext>,
    ) -> EvalResult<Vec<AttributeValue>> {
        exprs
            .iter()
            .map(|e| {
                e.evaluate(ctx)
                    .and_then(|v| v.expect_primitive().map(Clone::clone))
                    .map_err(|err| {
                        err.context(format!("function '{}': error evaluating argument", self.id))
                    })
            })
            .collect()
    }

    fn eval_bag(&self, expr: &Expression, ctx: Option<&EvaluationContext>) -> EvalResult<Bag> {
        expr.evaluate(ctx)
            .and_then(|v| v.expect_bag().map(Clone::clone))
            .map_err(|e| e.context(format!("function '{}': error evaluating bag argument", self.id)))
    }

    fn eval_one_bag(
        &self,
        mode: OneBagMode,
        before: &[Expression],
        bag_expr: &Expression,
        after: &[Expression],
        ctx: Option<&EvaluationContext>,
    ) -> EvalResult<Value> {
        // Each argument expression is evaluated exactly once.
        let before_vals = self.eval_primitive_args(before, ctx)?;
        let bag = self.eval_bag(bag_expr, ctx)?;
        let after_vals = self.eval_primitive_args(after, ctx)?;

        let mut sub_args: Vec<AttributeValue> =
            Vec::with_capacity(before_vals.len() + 1 + after_vals.len());

        match mode {
            OneBagMode::AnyOf | OneBagMode::AllOf => {
                let any = mode == OneBagMode::AnyOf;
                for elem in bag.iter() {
                    sub_args.clear();
                    sub_args.extend_from_slice(&before_vals);
                    sub_args.push(elem.clone());
                    sub_args.extend_from_slice(&after_vals);
                    let result = self.sub_bool(ctx, &sub_args)?;
                    if result == any {
                        return Ok(Value::from(any));
                    }
                }
                // any-of over an empty bag is false, all-of is true
                Ok(Value::from(!any))
            }
            OneBagMode::Map => {
                let elem_type = self
                    .return_type
                    .bag_element_type()
                    .expect("map returns a bag");
                let mut results = Vec::with_capacity(bag.len());
                for elem in bag.iter() {
                    sub_args.clear();
                    sub_args.extend_from_slice(&before_vals);
                    sub_args.push(elem.clone());
                    sub_args.extend_from_slice(&after_vals);
                    let result = self
                        .sub_call
                        .evaluate_with_trailing(ctx, &sub_args)
                        .map_err(|e| {
                            e.context(format!(
                                "function '{}': error calling sub-function with bag element {elem}",
                                self.id
                            ))
                        })?;
                    results.push(result.expect_primitive()?.clone());
                }
                Bag::new(elem_type, results)
                    .map(Value::Bag)
                    .map_err(|e| IndeterminateError::processing_error(e.to_string()))
            }
        }
    }

    fn eval_two_bags(
        &self,
        mode: TwoBagMode,
        bag0_expr: &Expression,
        bag1_expr: &Expression,
        ctx: Option<&EvaluationContext>,
        limits: EvalLimits,
    ) -> EvalResult<Value> {
        let bag0 = self.eval_bag(bag0_expr, ctx)?;
        // No predicate can hold over an empty bag.
        if bag0.is_empty() {
            return Ok(Value::from(false));
        }
        let bag1 = self.eval_bag(bag1_expr, ctx)?;
        if bag1.is_empty() {
            return Ok(Value::from(false));
        }

        self.check_product(bag0.len().saturating_mul(bag1.len()), limits)?;

        let result = match mode {
            TwoBagMode::AllOfAll => {
                let mut all = true;
                'outer: for x in bag0.iter() {
                    for y in bag1.iter() {
                        if !self.sub_bool(ctx, &[x.clone(), y.clone()])? {
                            all = false;
                            break 'outer;
                        }
                    }
                }
                all
            }
            TwoBagMode::AllOfAny => self.for_all_exists(ctx, &bag0, &bag1, false)?,
            TwoBagMode::AnyOfAll => self.for_all_exists(ctx, &bag1, &bag0, true)?,
        };
        Ok(Value::from(result))
    }

    /// ∀a∈all ∃e∈exists : f(…). `swap` places the "exists" element first in
    /// the sub-function argument list (any-of-all quantifies over the second
    /// bag but keeps argument positions).
    fn for_all_exists(
        &self,
        ctx: Option<&EvaluationContext>,
        all: &Bag,
        exists: &Bag,
        swap: bool,
    ) -> EvalResult<bool> {
        for a in all.iter() {
            let mut found = false;
            for e in exists.iter() {
                let args = if swap {
                    [e.clone(), a.clone()]
                } else {
                    [a.clone(), e.clone()]
                };
                if self.sub_bool(ctx, &args)? {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn eval_any_of_any(
        &self,
        args: &[Expression],
        ctx: Option<&EvaluationContext>,
        limits: EvalLimits,
    ) -> EvalResult<Value> {
        // Evaluate every argument expression exactly once; tuples are built
        // from these memoized results.
        let values = args
            .iter()
            .map(|e| {
                e.evaluate(ctx).map_err(|err| {
                    err.context(format!(
                        "function '{}': error evaluating one of the arguments after sub-function",
                        self.id
                    ))
                })
            })
            .collect::<EvalResult<Vec<_>>>()?;

        let mut product: usize = 1;
        for v in &values {
            if let Value::Bag(b) = v {
                product = product.saturating_mul(b.len().max(1));
            }
        }
        self.check_product(product, limits)?;

        let mut stack: Vec<AttributeValue> = Vec::with_capacity(values.len());
        self.any_of_any_dfs(ctx, &values, &mut stack).map(Value::from)
    }

    /// Depth-first tuple enumeration with a stack of chosen values,
    /// short-circuiting on the first true.
    fn any_of_any_dfs(
        &self,
        ctx: Option<&EvaluationContext>,
        remaining: &[Value],
        stack: &mut Vec<AttributeValue>,
    ) -> EvalResult<bool> {
        let Some((next, rest)) = remaining.split_first() else {
            return self.sub_bool(ctx, stack);
        };
        match next {
            Value::Primitive(v) => {
                stack.push(v.clone());
                let result = self.any_of_any_dfs(ctx, rest, stack);
                stack.pop();
                result
            }
            Value::Bag(bag) => {
                // An empty bag leaves no possible tuple.
                if bag.is_empty() {
                    return Ok(false);
                }
                for elem in bag.iter() {
                    stack.push(elem.clone());
                    let result = self.any_of_any_dfs(ctx, rest, stack);
                    stack.pop();
                    if result? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn check_product(&self, product: usize, limits: EvalLimits) -> EvalResult<()> {
        if product > limits.max_higher_order_product {
            return Err(IndeterminateError::processing_error(format!(
                "function '{}': Cartesian product of {product} sub-function calls exceeds the configured maximum of {}",
                self.id, limits.max_higher_order_product
            )));
        }
        Ok(())
    }
}
