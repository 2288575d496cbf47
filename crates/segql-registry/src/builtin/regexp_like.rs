use segql_ir::{
    NativeExpression, NativeFilter, RowSignature, SqlTypeFamily, SqlTypeName, VirtualColumnRegistry,
};
use segql_rex::{RexCall, SqlOperator};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;
use crate::pushdown;

/// `REGEXP_LIKE(value, pattern)`: true when `pattern` matches anywhere in `value`
pub struct RegexpLikeOperatorConversion {
    operator: SqlOperator,
}

impl RegexpLikeOperatorConversion {
    pub fn new() -> Self {
        Self {
            operator: SqlOperator::builder("REGEXP_LIKE")
                .operand_types(&[SqlTypeFamily::Character, SqlTypeFamily::Character])
                .required_operand_count(2)
                .literal_operands(&[1])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
        }
    }
}

impl Default for RegexpLikeOperatorConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorConversion for RegexpLikeOperatorConversion {
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
        conversion::convert_direct_call(ctx, signature, call, "regexp_like")
    }

    fn to_native_filter(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        virtual_columns: Option<&mut VirtualColumnRegistry>,
        call: &RexCall,
    ) -> Conversion<NativeFilter> {
        let pattern = conversion::literal_operand(call, 1)?;
        let value = conversion::operand(call, 0)?;

        let Some(lowered) = expressions::to_native_expression(ctx, signature, value)? else {
            return Ok(None);
        };
        let Some(pattern) = pattern.string_value() else {
            debug!(pattern = %pattern, "REGEXP_LIKE pattern is not a string");
            return Ok(None);
        };
        let Some(target) =
            pushdown::resolve_filter_target(ctx, &lowered, value.data_type(), virtual_columns)
        else {
            return Ok(None);
        };

        let (dimension, extraction_fn) = target.into_parts();
        Ok(Some(NativeFilter::Regex {
            dimension,
            pattern: pattern.to_string(),
            extraction_fn,
        }))
    }
}
