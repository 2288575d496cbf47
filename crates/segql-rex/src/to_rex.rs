//! Resolve the untyped AST into a typed relational tree
//!
//! Columns become input references into the row signature, calls are bound to
//! operator declarations and checked against them, and every node gets its
//! SQL type.

use thiserror::Error;

use segql_ir::RowSignature;

use crate::ast::*;
use crate::operator::{OperandError, OperatorTable};
use crate::rex::{LiteralValue, RexLiteral, RexNode};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Operator not found: {0}")]
    OperatorNotFound(String),

    #[error(transparent)]
    Operand(#[from] OperandError),
}

impl Expr {
    /// Convert the AST into a typed tree over `signature`
    pub fn to_rex(
        &self,
        signature: &RowSignature,
        operators: &dyn OperatorTable,
    ) -> Result<RexNode, ResolveError> {
        match self {
            Expr::Literal(value) => Ok(RexNode::Literal(RexLiteral::new(value.clone()))),
            Expr::Column(name) => RexNode::column(signature, name)
                .ok_or_else(|| ResolveError::ColumnNotFound(name.clone())),
            Expr::BinaryOp { op, left, right } => {
                resolve_call(op.operator_name(), &[left.as_ref(), right.as_ref()], signature, operators)
            }
            Expr::UnaryOp { op: UnOp::Not, expr } => {
                resolve_call("NOT", &[expr.as_ref()], signature, operators)
            }
            Expr::FuncCall(func) => {
                let args: Vec<&Expr> = func.args.iter().collect();
                resolve_call(&func.name.to_uppercase(), &args, signature, operators)
            }
            Expr::Like { expr, pattern, escape, negated } => {
                let escape = escape.clone().map(|e| Expr::Literal(LiteralValue::String(e)));
                let mut args: Vec<&Expr> = vec![expr.as_ref(), pattern.as_ref()];
                if let Some(escape) = &escape {
                    args.push(escape);
                }
                let like = resolve_call("LIKE", &args, signature, operators)?;
                if *negated {
                    negate(like, operators)
                } else {
                    Ok(like)
                }
            }
            Expr::IsNull { expr, negated } => {
                let operator = if *negated { "IS NOT NULL" } else { "IS NULL" };
                resolve_call(operator, &[expr.as_ref()], signature, operators)
            }
        }
    }
}

impl BinOp {
    /// SQL operator identity of this binary operator
    pub fn operator_name(self) -> &'static str {
        match self {
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Concat => "||",
        }
    }
}

fn resolve_call(
    name: &str,
    args: &[&Expr],
    signature: &RowSignature,
    operators: &dyn OperatorTable,
) -> Result<RexNode, ResolveError> {
    let operands = args
        .iter()
        .map(|arg| arg.to_rex(signature, operators))
        .collect::<Result<Vec<_>, _>>()?;
    build_call(name, operands, operators)
}

fn negate(node: RexNode, operators: &dyn OperatorTable) -> Result<RexNode, ResolveError> {
    build_call("NOT", vec![node], operators)
}

fn build_call(
    name: &str,
    operands: Vec<RexNode>,
    operators: &dyn OperatorTable,
) -> Result<RexNode, ResolveError> {
    let operator = operators
        .lookup_operator(name)
        .ok_or_else(|| ResolveError::OperatorNotFound(name.to_string()))?;
    operator.check_operands(&operands)?;
    let data_type = operator.infer_return_type(&operands);
    Ok(RexNode::call(operator.name(), operator.syntax(), operands, data_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::SqlOperator;
    use crate::parser::parse;
    use crate::rex::OperatorSyntax;
    use segql_ir::{ColumnType, SqlTypeFamily, SqlTypeName};
    use std::collections::HashMap;

    struct TestOperators(HashMap<String, SqlOperator>);

    impl OperatorTable for TestOperators {
        fn lookup_operator(&self, name: &str) -> Option<&SqlOperator> {
            self.0.get(name)
        }
    }

    fn operators() -> TestOperators {
        let declarations = [
            SqlOperator::builder("REGEXP_LIKE")
                .operand_types(&[SqlTypeFamily::Character, SqlTypeFamily::Character])
                .literal_operands(&[1])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
            SqlOperator::builder("LOWER")
                .operand_types(&[SqlTypeFamily::Character])
                .build(),
            SqlOperator::builder("NOT")
                .syntax(OperatorSyntax::Prefix)
                .operand_types(&[SqlTypeFamily::Boolean])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
            SqlOperator::builder("LIKE")
                .syntax(OperatorSyntax::Binary)
                .operand_types(&[SqlTypeFamily::Character; 3])
                .required_operand_count(2)
                .literal_operands(&[1, 2])
                .return_type_cascade_nullable(SqlTypeName::Boolean)
                .build(),
        ];
        TestOperators(
            declarations
                .into_iter()
                .map(|op| (op.name().to_string(), op))
                .collect(),
        )
    }

    fn signature() -> RowSignature {
        RowSignature::builder()
            .add("url", ColumnType::String)
            .add("hits", ColumnType::Long)
            .build()
    }

    #[test]
    fn test_resolve_nested_call() {
        let ast = parse("regexp_like(lower(url), '^https://')").unwrap();
        let rex = ast.to_rex(&signature(), &operators()).unwrap();

        assert_eq!(rex.to_string(), "REGEXP_LIKE(LOWER($0), '^https://')");
        assert_eq!(rex.data_type().type_name, SqlTypeName::Boolean);
        assert!(rex.data_type().nullable);
    }

    #[test]
    fn test_not_like_wraps_in_not() {
        let ast = parse("url NOT LIKE 'http%'").unwrap();
        let rex = ast.to_rex(&signature(), &operators()).unwrap();
        assert_eq!(rex.to_string(), "NOT ($0 LIKE 'http%')");
    }

    #[test]
    fn test_unknown_names() {
        let ops = operators();
        assert!(matches!(
            parse("missing = 1").unwrap().to_rex(&signature(), &ops),
            Err(ResolveError::OperatorNotFound(_)) | Err(ResolveError::ColumnNotFound(_))
        ));
        assert!(matches!(
            parse("lower(missing)").unwrap().to_rex(&signature(), &ops),
            Err(ResolveError::ColumnNotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            parse("upper(url)").unwrap().to_rex(&signature(), &ops),
            Err(ResolveError::OperatorNotFound(name)) if name == "UPPER"
        ));
    }

    #[test]
    fn test_operand_checks_apply() {
        let ops = operators();
        assert!(matches!(
            parse("regexp_like(url, url)").unwrap().to_rex(&signature(), &ops),
            Err(ResolveError::Operand(OperandError::NotLiteral { position: 1, .. }))
        ));
        assert!(matches!(
            parse("lower(hits)").unwrap().to_rex(&signature(), &ops),
            Err(ResolveError::Operand(OperandError::Type { .. }))
        ));
    }
}
