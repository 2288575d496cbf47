//! segql relational expressions - parser, operator declarations and typed tree

pub mod ast;
pub mod operator;
pub mod parser;
pub mod rex;
mod to_rex;

pub use operator::{
    DeclarationError, OperandError, OperatorBuilder, OperatorTable, ReturnTypeInference, SqlOperator,
};
pub use parser::{parse, ParseError};
pub use rex::{LiteralValue, OperatorSyntax, RexCall, RexInputRef, RexLiteral, RexNode};
pub use to_rex::ResolveError;

use segql_ir::RowSignature;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RexError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Parse expression text and resolve it against a row signature
pub fn parse_rex(
    source: &str,
    signature: &RowSignature,
    operators: &dyn OperatorTable,
) -> Result<RexNode, RexError> {
    let ast = parse(source)?;
    Ok(ast.to_rex(signature, operators)?)
}
