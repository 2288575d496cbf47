use segql_ir::{
    BinaryOp, NativeExpression, NativeFilter, RowSignature, StringComparator, SqlTypeFamily,
    SqlTypeName, VirtualColumnRegistry,
};
use segql_rex::{OperatorSyntax, RexCall, SqlOperator};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;
use crate::pushdown;

/// `=`, `<>`, `<`, `<=`, `>`, `>=`
///
/// Comparisons of an operand against a literal become selector or bound
/// filters. A literal on the left is moved to the right by flipping the
/// operator.
pub struct ComparisonOperatorConversion {
    operator: SqlOperator,
    op: BinaryOp,
}

impl ComparisonOperatorConversion {
    pub fn new(name: &str, op: BinaryOp) -> Self {
        Self {
            operator: SqlOperator::builder(name)
                .syntax(OperatorSyntax::Binary)
                .operand_types(&[SqlTypeFamily::Any, SqlTypeFamily::Any])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
            op,
        }
    }

    /// One conversion per comparison operator
    pub fn all() -> Vec<Self> {
        [
            ("=", BinaryOp::Eq),
            ("<>", BinaryOp::Ne),
            ("<", BinaryOp::Lt),
            ("<=", BinaryOp::Le),
            (">", BinaryOp::Gt),
            (">=", BinaryOp::Ge),
        ]
        .into_iter()
        .map(|(name, op)| Self::new(name, op))
        .collect()
    }
}

impl OperatorConversion for ComparisonOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        let Some(mut operands) = expressions::to_native_expressions(ctx, signature, &call.operands)? else {
            return Ok(None);
        };
        if operands.len() != 2 {
            return Err(conversion::ConversionError::MissingOperand {
                operator: call.operator.clone(),
                position: operands.len(),
            });
        }
        let right = operands.remove(1);
        let left = operands.remove(0);
        Ok(Some(NativeExpression::of_binary(self.op, left, right)))
    }

    fn to_native_filter(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        virtual_columns: Option<&mut VirtualColumnRegistry>,
        call: &RexCall,
    ) -> Conversion<NativeFilter> {
        let left = conversion::operand(call, 0)?;
        let right = conversion::operand(call, 1)?;

        let (subject, literal, op) = match (left.as_literal(), right.as_literal()) {
            (None, Some(literal)) => (left, literal, self.op),
            (Some(literal), None) => (right, literal, self.op.flipped()),
            _ => return Ok(None),
        };
        // Comparing with NULL is never true; the expression form handles it
        if literal.is_null() {
            debug!(call = %call.operator, "Comparison with NULL literal");
            return Ok(None);
        }

        // Selectors and bounds compare with one ordering; mixed families need the expression form
        let subject_type = subject.data_type();
        let literal_type = literal.data_type.type_name;
        if is_character(subject_type.type_name) != is_character(literal_type) {
            debug!(
                call = %call.operator,
                subject = %subject_type,
                literal = %literal_type,
                "Comparison across type families"
            );
            return Ok(None);
        }

        let Some(lowered) = expressions::to_native_expression(ctx, signature, subject)? else {
            return Ok(None);
        };
        let value = expressions::to_native_literal(literal).as_filter_value();
        let Some(target) = pushdown::resolve_filter_target(ctx, &lowered, subject_type, virtual_columns)
        else {
            return Ok(None);
        };

        let (dimension, extraction_fn) = target.into_parts();
        let ordering = if subject_type.type_name.is_numeric() || subject_type.type_name == SqlTypeName::Boolean {
            StringComparator::Numeric
        } else {
            StringComparator::Lexicographic
        };
        let bound = |lower: Option<String>, upper: Option<String>, strict: bool| NativeFilter::Bound {
            dimension: dimension.clone(),
            lower_strict: strict && lower.is_some(),
            upper_strict: strict && upper.is_some(),
            lower,
            upper,
            ordering,
            extraction_fn: extraction_fn.clone(),
        };

        let filter = match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                let selector = NativeFilter::Selector {
                    dimension: dimension.clone(),
                    value,
                    extraction_fn: extraction_fn.clone(),
                };
                if op == BinaryOp::Ne {
                    NativeFilter::not(selector)
                } else {
                    selector
                }
            }
            BinaryOp::Lt => bound(None, value, true),
            BinaryOp::Le => bound(None, value, false),
            BinaryOp::Gt => bound(value, None, true),
            BinaryOp::Ge => bound(value, None, false),
            BinaryOp::And | BinaryOp::Or => return Ok(None),
        };
        Ok(Some(filter))
    }
}

fn is_character(type_name: SqlTypeName) -> bool {
    type_name.family() == SqlTypeFamily::Character
}
