use segql_ir::{NativeExpression, RowSignature, SqlTypeFamily, SqlTypeName};
use segql_rex::{OperatorSyntax, RexCall, SqlOperator};

use crate::context::PlannerContext;
use crate::conversion::{self, Conversion, OperatorConversion};

/// Operator that maps one-to-one onto a native function of the same arity
pub struct DirectOperatorConversion {
    operator: SqlOperator,
    function_name: &'static str,
}

impl DirectOperatorConversion {
    pub fn new(operator: SqlOperator, function_name: &'static str) -> Self {
        Self {
            operator,
            function_name,
        }
    }

    pub fn lower() -> Self {
        Self::new(string_function("LOWER", 1), "lower")
    }

    pub fn upper() -> Self {
        Self::new(string_function("UPPER", 1), "upper")
    }

    pub fn concat() -> Self {
        Self::new(string_function("CONCAT", 2), "concat")
    }

    /// The `||` operator
    pub fn concat_operator() -> Self {
        let operator = SqlOperator::builder("||")
            .syntax(OperatorSyntax::Binary)
            .operand_types(&[SqlTypeFamily::Character; 2])
            .return_type_cascade_nullable(SqlTypeName::Varchar)
            .build();
        Self::new(operator, "concat")
    }

    pub fn char_length() -> Self {
        let operator = SqlOperator::builder("CHAR_LENGTH")
            .operand_types(&[SqlTypeFamily::Character])
            .return_type_cascade_nullable(SqlTypeName::Integer)
            .build();
        Self::new(operator, "strlen")
    }
}

fn string_function(name: &str, arity: usize) -> SqlOperator {
    SqlOperator::builder(name)
        .operand_types(&vec![SqlTypeFamily::Character; arity])
        .return_type_cascade_nullable(SqlTypeName::Varchar)
        .build()
}

impl OperatorConversion for DirectOperatorConversion {
    fn sql_operator(&self) -> &SqlOperator {
        &self.operator
    }

    fn to_native_expression(
        &self,
        ctx: &PlannerContext<'_>,
        signature: &RowSignature,
        call: &RexCall,
    ) -> Conversion<NativeExpression> {
        conversion::convert_direct_call(ctx, signature, call, self.function_name)
    }
}
