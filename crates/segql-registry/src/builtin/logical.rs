use segql_ir::{
    BinaryOp, NativeExpression, NativeFilter, RowSignature, SqlTypeFamily, SqlTypeName, UnaryOp,
    VirtualColumnRegistry,
};
use segql_rex::{OperatorSyntax, RexCall, SqlOperator};

use crate::context::PlannerContext;
use crate::conversion::{Conversion, ConversionError, OperatorConversion};
use crate::expressions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
    Not,
}

/// `AND`, `OR` and `NOT`
///
/// Filters combine the filters of their operands and are unconvertible as
/// soon as one operand is.
pub struct LogicalOperatorConversion {
    operator: SqlOperator,
    connective: Connective,
}

impl LogicalOperatorConversion {
    pub fn and() -> Self {
        Self::binary("AND", Connective::And)
    }

    pub fn or() -> Self {
        Self::binary("OR", Connective::Or)
    }

    pub fn not() -> Self {
        Self {
            operator: SqlOperator::builder("NOT")
                .syntax(OperatorSyntax::Prefix)
                .operand_types(&[SqlTypeFamily::Boolean])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
            connective: Connective::Not,
        }
    }

    fn binary(name: &str, connective: Connective) -> Self {
        Self {
            operator: SqlOperator::builder(name)
                .syntax(OperatorSyntax::Binary)
                .operand_types(&[SqlTypeFamily::Boolean, SqlTypeFamily::Boolean])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
            connective,
        }
    }
}

impl OperatorConversion for LogicalOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        let Some(operands) = expressions::to_native_expressions(ctx, signature, &call.operands)? else {
            return Ok(None);
        };
        let op = match self.connective {
            Connective::And => BinaryOp::And,
            Connective::Or => BinaryOp::Or,
            Connective::Not => {
                let operand = operands.into_iter().next().ok_or_else(|| missing(call, 0))?;
                return Ok(Some(NativeExpression::of_unary(UnaryOp::Not, operand)));
            }
        };
        // Optimizers hand over flattened n-ary AND/OR calls
        let folded = operands
            .into_iter()
            .reduce(|left, right| NativeExpression::of_binary(op, left, right))
            .ok_or_else(|| missing(call, 0))?;
        Ok(Some(folded))
    }

    fn to_native_filter(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        mut virtual_columns: Option<&mut VirtualColumnRegistry>,
        call: &RexCall,
    ) -> Conversion<NativeFilter> {
        let mut filters = Vec::with_capacity(call.operands.len());
        for operand in &call.operands {
            match expressions::to_filter(ctx, signature, virtual_columns.as_deref_mut(), operand)? {
                Some(filter) => filters.push(filter),
                None => return Ok(None),
            }
        }

        let filter = match self.connective {
            Connective::And => NativeFilter::and(filters),
            Connective::Or => NativeFilter::or(filters),
            Connective::Not => {
                let filter = filters.into_iter().next().ok_or_else(|| missing(call, 0))?;
                NativeFilter::not(filter)
            }
        };
        Ok(Some(filter))
    }
}

fn missing(call: &RexCall, position: usize) -> ConversionError {
    ConversionError::MissingOperand {
        operator: call.operator.clone(),
        position,
    }
}
