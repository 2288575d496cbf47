use segql_ir::{
    NativeExpression, NativeFilter, RowSignature, SqlTypeFamily, SqlTypeName, VirtualColumnRegistry,
};
use segql_rex::{OperatorSyntax, RexCall, SqlOperator};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;
use crate::pushdown;

/// `value LIKE pattern [ESCAPE escape]` with SQL `%` and `_` wildcards
pub struct LikeOperatorConversion {
    operator: SqlOperator,
}

impl LikeOperatorConversion {
    pub fn new() -> Self {
        Self {
            operator: SqlOperator::builder("LIKE")
                .syntax(OperatorSyntax::Binary)
                .operand_types(&[SqlTypeFamily::Character; 3])
                .required_operand_count(2)
                .literal_operands(&[1, 2])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
        }
    }
}

impl Default for LikeOperatorConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorConversion for LikeOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        conversion::check_literal_operands(&self.operator, call)?;
        conversion::convert_direct_call(ctx, signature, call, "like")
    }

    fn to_native_filter(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        virtual_columns: Option<&mut VirtualColumnRegistry>,
        call: &RexCall,
    ) -> Conversion<NativeFilter> {
        let pattern = conversion::literal_operand(call, 1)?;
        let escape = conversion::optional_literal_operand(call, 2)?;
        let value = conversion::operand(call, 0)?;

        let Some(lowered) = expressions::to_native_expression(ctx, signature, value)? else {
            return Ok(None);
        };
        let Some(pattern) = pattern.string_value() else {
            debug!(pattern = %pattern, "LIKE pattern is not a string");
            return Ok(None);
        };
        let escape = match escape {
            None => None,
            Some(literal) => match literal.string_value().map(single_char) {
                Some(Some(c)) => Some(c),
                _ => {
                    debug!(escape = %literal, "LIKE escape must be a single character");
                    return Ok(None);
                }
            },
        };
        let Some(target) =
            pushdown::resolve_filter_target(ctx, &lowered, value.data_type(), virtual_columns)
        else {
            return Ok(None);
        };

        let (dimension, extraction_fn) = target.into_parts();
        Ok(Some(NativeFilter::Like {
            dimension,
            pattern: pattern.to_string(),
            escape,
            extraction_fn,
        }))
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
