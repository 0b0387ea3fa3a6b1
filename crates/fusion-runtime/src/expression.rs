//! Embedded-expression evaluation contract.
//!
//! The expression language itself is external; the runtime only needs
//! "evaluate this expression text against these bindings, return a value
//! or fail".

use crate::context::ContextMap;
use crate::objects::FusionObject;
use fusion_types::{FusionResult, Value};

/// Evaluator for embedded `${…}` expressions.
pub trait ExpressionEvaluator {
    /// Evaluate the stored expression text against the current context
    /// bindings. `this_object` is the Fusion object the expression belongs
    /// to, if any.
    fn evaluate(
        &self,
        expression: &str,
        context: &ContextMap,
        this_object: Option<&dyn FusionObject>,
    ) -> FusionResult<Value>;
}
