//! The operator conversion contract and helpers shared by its implementations

use thiserror::Error;

use segql_ir::{NativeExpression, NativeFilter, RowSignature, VirtualColumnRegistry};
use segql_rex::{RexCall, RexLiteral, RexNode, SqlOperator};

use crate::context::PlannerContext;
use crate::expressions;

/// Contract violations in a call handed to a conversion.
///
/// These are planner bugs or malformed input trees, not "cannot translate";
/// that case is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Operator {operator} operand {position} must be a literal, got {actual}")]
    NonLiteralOperand {
        operator: String,
        position: usize,
        actual: String,
    },

    #[error("Operator {operator} is missing operand {position}")]
    MissingOperand { operator: String, position: usize },
}

/// Outcome of a conversion: `Ok(None)` means the construct is unconvertible
pub type Conversion<T> = Result<Option<T>, ConversionError>;

/// Translation of one SQL operator into the native expression and filter model
pub trait OperatorConversion: Send + Sync {
    /// Declaration of the operator this conversion handles
    fn sql_operator(&self) -> &SqlOperator;

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression>;

    /// Structured filter for a boolean call. Operators without a native filter
    /// form keep the default, and callers fall back to an expression filter.
    fn to_native_filter(
        &self,
        _ctx: &PlannerContext<'_>,
        _signature: &RowSignature,
        _virtual_columns: Option<&mut VirtualColumnRegistry>,
        _call: &RexCall,
    ) -> Conversion<NativeFilter> {
        Ok(None)
    }
}

/// Operand at `position`, which the operator's arity guarantees exists
pub fn operand(call: &RexCall, position: usize) -> Result<&RexNode, ConversionError> {
    call.operand(position).ok_or_else(|| ConversionError::MissingOperand {
        operator: call.operator.clone(),
        position,
    })
}

/// Literal operand at `position`
pub fn literal_operand(call: &RexCall, position: usize) -> Result<&RexLiteral, ConversionError> {
    let node = operand(call, position)?;
    node.as_literal().ok_or_else(|| non_literal(call, position, node))
}

/// Literal operand at an optional `position`; `None` when the call omits it
pub fn optional_literal_operand(
    call: &RexCall,
    position: usize,
) -> Result<Option<&RexLiteral>, ConversionError> {
    match call.operand(position) {
        None => Ok(None),
        Some(node) => node
            .as_literal()
            .map(Some)
            .ok_or_else(|| non_literal(call, position, node)),
    }
}

/// Fail when any literal-only operand of `operator` is bound to a non-literal
pub fn check_literal_operands(operator: &SqlOperator, call: &RexCall) -> Result<(), ConversionError> {
    for &position in operator.literal_operands() {
        if let Some(node) = call.operand(position) {
            if !node.is_literal() {
                return Err(non_literal(call, position, node));
            }
        }
    }
    Ok(())
}

fn non_literal(call: &RexCall, position: usize, node: &RexNode) -> ConversionError {
    tracing::warn!(
        operator = %call.operator,
        position,
        operand = %node,
        "Non-literal operand in literal position"
    );
    ConversionError::NonLiteralOperand {
        operator: call.operator.clone(),
        position,
        actual: node.to_string(),
    }
}

/// Lower every operand and call the native function `function_name` on them
pub fn convert_direct_call(
    ctx: &PlannerContext<'_>,
    signature: &RowSignature,
    call: &RexCall,
    function_name: &str,
) -> Conversion<NativeExpression> {
    let Some(args) = expressions::to_native_expressions(ctx, signature, &call.operands)? else {
        return Ok(None);
    };
    Ok(Some(NativeExpression::of_function_call(function_name, args)))
}
