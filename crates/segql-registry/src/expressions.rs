//! Lowering of relational trees into native expressions and filters
//!
//! Both entry points walk the tree post-order and dispatch calls through the
//! operator registry by exact operator identity. Anything without a
//! conversion makes the enclosing construct unconvertible.

use segql_ir::{
    NativeExpression, NativeFilter, NativeLiteral, RowSignature, SqlTypeName, VirtualColumnRegistry,
};
use segql_rex::{LiteralValue, RexCall, RexLiteral, RexNode};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{Conversion, OperatorConversion};

pub fn to_native_expression(
    ctx: &PlannerContext<'_>,
    signature: &RowSignature,
    node: &RexNode,
) -> Conversion<NativeExpression> {
    match node {
        RexNode::InputRef(input) => match signature.column_name(input.index) {
            Some(name) => Ok(Some(NativeExpression::of_column(name))),
            None => {
                debug!(index = input.index, "Input reference outside the row signature");
                Ok(None)
            }
        },
        RexNode::Literal(literal) => Ok(Some(NativeExpression::of_literal(to_native_literal(literal)))),
        RexNode::Call(call) => {
            let Some(conversion) = lookup(ctx, call) else {
                return Ok(None);
            };
            let expression = conversion.to_native_expression(ctx, signature, call)?;
            if expression.is_none() {
                debug!(call = %node, "Unconvertible expression");
            }
            Ok(expression)
        }
    }
}

/// Lower all operands; unconvertible as soon as one of them is
pub fn to_native_expressions(
    ctx: &PlannerContext<'_>,
    signature: &RowSignature,
    nodes: &[RexNode],
) -> Conversion<Vec<NativeExpression>> {
    let mut lowered = Vec::with_capacity(nodes.len());
    for node in nodes {
        match to_native_expression(ctx, signature, node)? {
            Some(expression) => lowered.push(expression),
            None => return Ok(None),
        }
    }
    Ok(Some(lowered))
}

/// Translate a boolean tree into a native filter.
///
/// Calls whose conversion builds a structured filter use it; otherwise the
/// whole node is evaluated as an expression filter when it lowers at all.
pub fn to_filter(
    ctx: &PlannerContext<'_>,
    signature: &RowSignature,
    mut virtual_columns: Option<&mut VirtualColumnRegistry>,
    node: &RexNode,
) -> Conversion<NativeFilter> {
    if let RexNode::Call(call) = node {
        if let Some(conversion) = lookup(ctx, call) {
            let filter =
                conversion.to_native_filter(ctx, signature, virtual_columns.as_deref_mut(), call)?;
            if filter.is_some() {
                return Ok(filter);
            }
        }
    }
    to_expression_filter(ctx, signature, node)
}

fn to_expression_filter(
    ctx: &PlannerContext<'_>,
    signature: &RowSignature,
    node: &RexNode,
) -> Conversion<NativeFilter> {
    let data_type = node.data_type();
    if !matches!(data_type.type_name, SqlTypeName::Boolean | SqlTypeName::Null) {
        debug!(node = %node, %data_type, "Non-boolean filter");
        return Ok(None);
    }
    let expression = to_native_expression(ctx, signature, node)?;
    Ok(expression.map(|e| NativeFilter::Expression {
        expression: e.into_expr(),
    }))
}

pub fn to_native_literal(literal: &RexLiteral) -> NativeLiteral {
    match &literal.value {
        LiteralValue::Null => NativeLiteral::Null,
        LiteralValue::Boolean(b) => NativeLiteral::from_bool(*b),
        LiteralValue::Integer(v) => NativeLiteral::Long(*v),
        LiteralValue::Double(v) => NativeLiteral::Double(*v),
        LiteralValue::String(s) => NativeLiteral::String(s.clone()),
    }
}

fn lookup<'r>(ctx: &PlannerContext<'r>, call: &RexCall) -> Option<&'r dyn OperatorConversion> {
    let conversion = ctx.operators().lookup(&call.operator);
    if conversion.is_none() {
        debug!(operator = %call.operator, "No conversion registered for operator");
    }
    conversion
}
