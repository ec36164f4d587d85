//! PEP action expressions (obligations and advice).
//!
//! An expression is fulfilled only when the enclosing element's decision
//! equals its FulfillOn effect. An assignment expression returning a bag
//! fans out into one AttributeAssignment per element (XACML §5.41).

use std::sync::Arc;

use xacml_core::{
    AttributeAssignment, Effect, EvalResult, PepAction, Result, Value,
};
use xacml_eval::{EvaluationContext, Expression, ExpressionFactory, VariableScope};

use crate::tree::PepActionNode;

#[derive(Debug)]
struct AssignmentExpression {
    attribute_id: Arc<str>,
    category: Option<Arc<str>>,
    issuer: Option<Arc<str>>,
    expression: Expression,
}

/// A compiled ObligationExpression / AdviceExpression.
#[derive(Debug)]
pub struct PepActionExpression {
    id: Arc<str>,
    mandatory: bool,
    fulfill_on: Effect,
    assignments: Vec<AssignmentExpression>,
}

impl PepActionExpression {
    pub fn new(
        node: &PepActionNode,
        factory: &ExpressionFactory,
        scope: &VariableScope,
    ) -> Result<Self> {
        let assignments = node
            .assignments
            .iter()
            .map(|a| {
                Ok(AssignmentExpression {
                    attribute_id: Arc::from(a.attribute_id.as_str()),
                    category: a.category.as_deref().map(Arc::from),
                    issuer: a.issuer.as_deref().map(Arc::from),
                    expression: factory.build(&a.expression, scope)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: Arc::from(node.id.as_str()),
            mandatory: node.mandatory,
            fulfill_on: node.fulfill_on,
            assignments,
        })
    }

    pub fn fulfill_on(&self) -> Effect {
        self.fulfill_on
    }

    fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult<PepAction> {
        let mut assignments = Vec::with_capacity(self.assignments.len());
        for a in &self.assignments {
            let value = a.expression.evaluate(Some(ctx)).map_err(|e| {
                e.context(format!(
                    "error evaluating AttributeAssignment '{}' of PEP action '{}'",
                    a.attribute_id, self.id
                ))
            })?;
            match value {
                Value::Primitive(v) => assignments.push(AttributeAssignment {
                    attribute_id: Arc::clone(&a.attribute_id),
                    category: a.category.clone(),
                    issuer: a.issuer.clone(),
                    value: v,
                }),
                // a bag-valued expression yields one assignment per element
                Value::Bag(bag) => {
                    for v in bag.iter() {
                        assignments.push(AttributeAssignment {
                            attribute_id: Arc::clone(&a.attribute_id),
                            category: a.category.clone(),
                            issuer: a.issuer.clone(),
                            value: v.clone(),
                        });
                    }
                }
            }
        }
        Ok(PepAction {
            id: Arc::clone(&self.id),
            mandatory: self.mandatory,
            assignments,
        })
    }
}

/// Evaluates the actions whose FulfillOn matches `effect`, in declaration
/// order. Any assignment failure aborts the whole list; the caller
/// converts that into an Indeterminate decision.
pub fn evaluate_pep_actions(
    actions: &[PepActionExpression],
    effect: Effect,
    ctx: &EvaluationContext,
) -> EvalResult<Vec<PepAction>> {
    actions
        .iter()
        .filter(|a| a.fulfill_on == effect)
        .map(|a| a.evaluate(ctx))
        .collect()
}
