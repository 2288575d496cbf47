use segql_ir::{
    NativeExpression, NativeFilter, RowSignature, SqlTypeFamily, SqlTypeName, VirtualColumnRegistry,
};
use segql_rex::{OperatorSyntax, RexCall, SqlOperator};

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;
use crate::pushdown;

/// `IS NULL` and `IS NOT NULL`
pub struct NullCheckOperatorConversion {
    operator: SqlOperator,
    negated: bool,
}

impl NullCheckOperatorConversion {
    pub fn is_null() -> Self {
        Self::new("IS NULL", false)
    }

    pub fn is_not_null() -> Self {
        Self::new("IS NOT NULL", true)
    }

    fn new(name: &str, negated: bool) -> Self {
        Self {
            operator: SqlOperator::builder(name)
                .syntax(OperatorSyntax::Postfix)
                .operand_types(&[SqlTypeFamily::Any])
                .return_type_not_null(SqlTypeName::Boolean)
                .build(),
            negated,
        }
    }

    fn function_name(&self) -> &'static str {
        if self.negated {
            "notnull"
        } else {
            "isnull"
        }
    }
}

impl OperatorConversion for NullCheckOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        conversion::convert_direct_call(ctx, signature, call, self.function_name())
    }

    fn to_native_filter(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        virtual_columns: Option<&mut VirtualColumnRegistry>,
        call: &RexCall,
    ) -> Conversion<NativeFilter> {
        let value = conversion::operand(call, 0)?;
        let Some(lowered) = expressions::to_native_expression(ctx, signature, value)? else {
            return Ok(None);
        };
        let Some(target) =
            pushdown::resolve_filter_target(ctx, &lowered, value.data_type(), virtual_columns)
        else {
            return Ok(None);
        };

        let (dimension, extraction_fn) = target.into_parts();
        let selector = NativeFilter::Selector {
            dimension,
            value: None,
            extraction_fn,
        };
        Ok(Some(if self.negated {
            NativeFilter::not(selector)
        } else {
            selector
        }))
    }
}
