use segql_ir::{
    ExtractionFn, NativeExpr, NativeExpression, NativeLiteral, RowSignature, SqlTypeFamily, SqlTypeName,
};
use segql_rex::{RexCall, SqlOperator};
use tracing::debug;

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};
use crate::expressions;

/// `SUBSTRING(value, start [, length])` with a one-based `start`
///
/// Stays a simple extraction when `value` is one, so filters on substrings
/// of a column still scan the column.
pub struct SubstringOperatorConversion {
    operator: SqlOperator,
}

impl SubstringOperatorConversion {
    pub fn new() -> Self {
        Self {
            operator: SqlOperator::builder("SUBSTRING")
                .operand_types(&[
                    SqlTypeFamily::Character,
                    SqlTypeFamily::Numeric,
                    SqlTypeFamily::Numeric,
                ])
                .required_operand_count(2)
                .literal_operands(&[1, 2])
                .return_type_nullable(SqlTypeName::Varchar)
                .build(),
        }
    }
}

impl Default for SubstringOperatorConversion {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorConversion for SubstringOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        let start = conversion::literal_operand(call, 1)?;
        let length = conversion::optional_literal_operand(call, 2)?;

        let Some(start) = start.int_value().filter(|&s| s >= 1) else {
            debug!(start = %start, "SUBSTRING start must be a positive integer");
            return Ok(None);
        };
        let length = match length {
            None => None,
            Some(literal) => match literal.int_value().filter(|&l| l >= 0) {
                Some(l) => Some(l),
                None => {
                    debug!(length = %literal, "SUBSTRING length must be a non-negative integer");
                    return Ok(None);
                }
            },
        };
        let Some(value) = expressions::to_native_expression(ctx, signature, conversion::operand(call, 0)?)?
        else {
            return Ok(None);
        };

        let index = start - 1;
        let expr = NativeExpr::Function {
            name: "substring".to_string(),
            args: vec![
                value.expr().clone(),
                NativeExpr::Literal(NativeLiteral::Long(index)),
                NativeExpr::Literal(NativeLiteral::Long(length.unwrap_or(-1))),
            ],
        };

        Ok(Some(match value.simple_extraction() {
            Some(simple) => {
                let extraction = ExtractionFn::Substring {
                    index: index as usize,
                    length: length.map(|l| l as usize),
                };
                NativeExpression::of_extraction(simple.cascade(extraction), expr)
            }
            None => NativeExpression::of_expression(expr),
        }))
    }
}
