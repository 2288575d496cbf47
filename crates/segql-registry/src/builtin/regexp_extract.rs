use segql_ir::{
    ExtractionFn, NativeExpr, NativeExpression, NativeLiteral, RowSignature, SqlTypeFamily, SqlTypeName,
};
use segql_rex::{RexCall, SqlOperator};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;

/// `REGEXP_EXTRACT(value, pattern [, group])`; null when nothing matches
pub struct RegexpExtractOperatorConversion {
    operator: SqlOperator,
}

impl RegexpExtractOperatorConversion {
    pub fn new() -> Self {
        Self {
            operator: SqlOperator::builder("REGEXP_EXTRACT")
                .operand_types(&[
                    SqlTypeFamily::Character,
                    SqlTypeFamily::Character,
                    SqlTypeFamily::Numeric,
                ])
                .required_operand_count(2)
                .literal_operands(&[1, 2])
                .return_type_nullable(SqlTypeName::Varchar)
                .build(),
        }
    }
}

impl Default for RegexpExtractOperatorConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorConversion for RegexpExtractOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        let pattern = conversion::literal_operand(call, 1)?;
        let group = conversion::optional_literal_operand(call, 2)?;

        let Some(pattern) = pattern.string_value() else {
            debug!(pattern = %pattern, "REGEXP_EXTRACT pattern is not a string");
            return Ok(None);
        };
        let index = match group {
            None => 0,
            Some(literal) => match literal.int_value().and_then(|g| usize::try_from(g).ok()) {
                Some(g) => g,
                None => {
                    debug!(group = %literal, "REGEXP_EXTRACT group must be a non-negative integer");
                    return Ok(None);
                }
            },
        };
        let Some(value) = expressions::to_native_expression(ctx, signature, conversion::operand(call, 0)?)?
        else {
            return Ok(None);
        };

        let expr = NativeExpr::Function {
            name: "regexp_extract".to_string(),
            args: vec![
                value.expr().clone(),
                NativeExpr::Literal(NativeLiteral::String(pattern.to_string())),
                NativeExpr::Literal(NativeLiteral::Long(index as i64)),
            ],
        };

        Ok(Some(match value.simple_extraction() {
            Some(simple) => {
                let extraction = ExtractionFn::Regex {
                    expr: pattern.to_string(),
                    index,
                };
                NativeExpression::of_extraction(simple.cascade(extraction), expr)
            }
            None => NativeExpression::of_expression(expr),
        }))
    }
}
