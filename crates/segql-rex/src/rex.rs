//! Typed relational expression tree, as handed over by the optimizer.
//!
//! Trees are immutable once built; translation only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;

use segql_ir::{RelDataType, RowSignature, SqlTypeName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

/// Reference to the input column at `index` of the row signature
#[derive(Debug, Clone, PartialEq)]
pub struct RexInputRef {
    pub index: usize,
    pub data_type: RelDataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RexLiteral {
    pub value: LiteralValue,
    pub data_type: RelDataType,
}

impl RexLiteral {
    pub fn new(value: LiteralValue) -> Self {
        let data_type = match &value {
            LiteralValue::Null => RelDataType::nullable(SqlTypeName::Null),
            LiteralValue::Boolean(_) => RelDataType::not_null(SqlTypeName::Boolean),
            LiteralValue::Integer(v) if i32::try_from(*v).is_ok() => {
                RelDataType::not_null(SqlTypeName::Integer)
            }
            LiteralValue::Integer(_) => RelDataType::not_null(SqlTypeName::BigInt),
            LiteralValue::Double(_) => RelDataType::not_null(SqlTypeName::Double),
            LiteralValue::String(_) => RelDataType::not_null(SqlTypeName::Char),
        };
        Self { value, data_type }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, LiteralValue::Null)
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            LiteralValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match &self.value {
            LiteralValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for RexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            LiteralValue::Null => f.write_str("NULL"),
            LiteralValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Integer(v) => write!(f, "{v}"),
            LiteralValue::Double(v) => write!(f, "{v:?}"),
            LiteralValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// How an operator call is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSyntax {
    Function,
    Binary,
    Prefix,
    Postfix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RexCall {
    /// Operator identity; upper-case SQL name such as `REGEXP_LIKE` or `<=`
    pub operator: String,
    pub syntax: OperatorSyntax,
    pub operands: Vec<RexNode>,
    pub data_type: RelDataType,
}

impl RexCall {
    pub fn operand(&self, position: usize) -> Option<&RexNode> {
        self.operands.get(position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RexNode {
    InputRef(RexInputRef),
    Literal(RexLiteral),
    Call(RexCall),
}

impl RexNode {
    pub fn input_ref(index: usize, data_type: RelDataType) -> Self {
        RexNode::InputRef(RexInputRef { index, data_type })
    }

    /// Reference to the named column of `signature`
    pub fn column(signature: &RowSignature, name: &str) -> Option<Self> {
        let index = signature.index_of(name)?;
        let column = &signature.columns()[index];
        Some(Self::input_ref(index, column.column_type.sql_type()))
    }

    pub fn literal(value: LiteralValue) -> Self {
        RexNode::Literal(RexLiteral::new(value))
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        Self::literal(LiteralValue::String(value.into()))
    }

    pub fn int_literal(value: i64) -> Self {
        Self::literal(LiteralValue::Integer(value))
    }

    pub fn call(
        operator: impl Into<String>,
        syntax: OperatorSyntax,
        operands: Vec<RexNode>,
        data_type: RelDataType,
    ) -> Self {
        RexNode::Call(RexCall {
            operator: operator.into(),
            syntax,
            operands,
            data_type,
        })
    }

    pub fn data_type(&self) -> RelDataType {
        match self {
            RexNode::InputRef(r) => r.data_type,
            RexNode::Literal(l) => l.data_type,
            RexNode::Call(c) => c.data_type,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, RexNode::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&RexLiteral> {
        match self {
            RexNode::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&RexCall> {
        match self {
            RexNode::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Operands of a top-level AND, or the node itself
    pub fn conjuncts(&self) -> Vec<&RexNode> {
        let mut out = Vec::new();
        collect_conjuncts(self, &mut out);
        out
    }
}

fn collect_conjuncts<'a>(node: &'a RexNode, out: &mut Vec<&'a RexNode>) {
    match node {
        RexNode::Call(call) if call.operator == "AND" => {
            for operand in &call.operands {
                collect_conjuncts(operand, out);
            }
        }
        other => out.push(other),
    }
}

impl fmt::Display for RexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RexNode::InputRef(r) => write!(f, "${}", r.index),
            RexNode::Literal(l) => write!(f, "{l}"),
            RexNode::Call(call) => match (call.syntax, call.operands.as_slice()) {
                (OperatorSyntax::Binary, [left, right]) => {
                    write!(f, "({left} {} {right})", call.operator)
                }
                (OperatorSyntax::Prefix, [operand]) => write!(f, "{} {operand}", call.operator),
                (OperatorSyntax::Postfix, [operand]) => write!(f, "{operand} {}", call.operator),
                (_, operands) => {
                    write!(f, "{}(", call.operator)?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{operand}")?;
                    }
                    f.write_str(")")
                }
            },
        }
    }
}
