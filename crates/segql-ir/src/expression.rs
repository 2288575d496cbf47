//! Native scalar expressions
//!
//! A [`NativeExpression`] always carries a full expression tree that the engine
//! can evaluate row by row. When the expression is nothing more than a column
//! read through a chain of extraction transforms it additionally exposes that
//! [`SimpleExtraction`], which is what makes cheap filter push-down possible.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{self, Write as _};

/// Unary transform applied to a column value while it is scanned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtractionFn {
    /// Zero-based substring; `length: None` reads to the end of the value.
    Substring {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
    },
    /// Capture group `index` of the first match of `expr`.
    Regex { expr: String, index: usize },
}

impl fmt::Display for ExtractionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFn::Substring { index, length: Some(length) } => {
                write!(f, "substring({index}, {length})")
            }
            ExtractionFn::Substring { index, length: None } => write!(f, "substring({index})"),
            ExtractionFn::Regex { expr, index } => write!(f, "regex({expr:?}, {index})"),
        }
    }
}

/// A column plus the extraction transforms applied to it, left to right
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleExtraction {
    pub column: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_fn: Vec<ExtractionFn>,
}

impl SimpleExtraction {
    pub fn of(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            extraction_fn: Vec::new(),
        }
    }

    /// Append a transform that runs after every transform already in the chain
    pub fn cascade(&self, next: ExtractionFn) -> Self {
        let mut extraction_fn = self.extraction_fn.clone();
        extraction_fn.push(next);
        Self {
            column: self.column.clone(),
            extraction_fn,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.extraction_fn.is_empty()
    }
}

/// Constants of the native expression language. Booleans are longs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeLiteral {
    Null,
    Long(i64),
    Double(f64),
    String(String),
}

impl NativeLiteral {
    pub fn from_bool(value: bool) -> Self {
        NativeLiteral::Long(i64::from(value))
    }

    /// Value as a filter sees it: the string form, or nothing for null
    pub fn as_filter_value(&self) -> Option<String> {
        match self {
            NativeLiteral::Null => None,
            NativeLiteral::Long(v) => Some(v.to_string()),
            NativeLiteral::Double(v) => Some(v.to_string()),
            NativeLiteral::String(s) => Some(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Operator that gives the same answer with its operands swapped
    pub fn flipped(self) -> Self {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Le => BinaryOp::Ge,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Ge => BinaryOp::Le,
            other => other,
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Expression tree in the engine's expression language
#[derive(Debug, Clone, PartialEq)]
pub enum NativeExpr {
    Identifier(String),
    Literal(NativeLiteral),
    Function { name: String, args: Vec<NativeExpr> },
    Binary { op: BinaryOp, left: Box<NativeExpr>, right: Box<NativeExpr> },
    Unary { op: UnaryOp, arg: Box<NativeExpr> },
}

impl NativeExpr {
    /// Columns this expression reads, in first-seen order
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            NativeExpr::Identifier(name) => {
                if !out.iter().any(|c| c == name) {
                    out.push(name.clone());
                }
            }
            NativeExpr::Literal(_) => {}
            NativeExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
            NativeExpr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            NativeExpr::Unary { arg, .. } => arg.collect_columns(out),
        }
    }
}

impl fmt::Display for NativeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeExpr::Identifier(name) => write_quoted(f, name, '"'),
            NativeExpr::Literal(NativeLiteral::Null) => f.write_str("null"),
            NativeExpr::Literal(NativeLiteral::Long(v)) => write!(f, "{v}"),
            NativeExpr::Literal(NativeLiteral::Double(v)) => write!(f, "{v:?}"),
            NativeExpr::Literal(NativeLiteral::String(s)) => write_quoted(f, s, '\''),
            NativeExpr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_char(')')
            }
            NativeExpr::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            NativeExpr::Unary { op: UnaryOp::Not, arg } => write!(f, "!{arg}"),
        }
    }
}

impl Serialize for NativeExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    f.write_char(quote)?;
    for c in text.chars() {
        if c == quote || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char(quote)
}

/// Lowered form of a relational operand
#[derive(Debug, Clone, PartialEq)]
pub struct NativeExpression {
    simple_extraction: Option<SimpleExtraction>,
    expr: NativeExpr,
}

impl NativeExpression {
    /// Direct read of a column with no transforms
    pub fn of_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            expr: NativeExpr::Identifier(column.clone()),
            simple_extraction: Some(SimpleExtraction::of(column)),
        }
    }

    pub fn of_literal(literal: NativeLiteral) -> Self {
        Self::of_expression(NativeExpr::Literal(literal))
    }

    pub fn of_expression(expr: NativeExpr) -> Self {
        Self {
            simple_extraction: None,
            expr,
        }
    }

    /// Expression that is still a simple extraction, e.g. a substring of a column
    pub fn of_extraction(simple_extraction: SimpleExtraction, expr: NativeExpr) -> Self {
        Self {
            simple_extraction: Some(simple_extraction),
            expr,
        }
    }

    pub fn of_function_call(name: impl Into<String>, args: Vec<NativeExpression>) -> Self {
        Self::of_expression(NativeExpr::Function {
            name: name.into(),
            args: args.into_iter().map(NativeExpression::into_expr).collect(),
        })
    }

    pub fn of_binary(op: BinaryOp, left: NativeExpression, right: NativeExpression) -> Self {
        Self::of_expression(NativeExpr::Binary {
            op,
            left: Box::new(left.expr),
            right: Box::new(right.expr),
        })
    }

    pub fn of_unary(op: UnaryOp, arg: NativeExpression) -> Self {
        Self::of_expression(NativeExpr::Unary {
            op,
            arg: Box::new(arg.expr),
        })
    }

    pub fn is_simple_extraction(&self) -> bool {
        self.simple_extraction.is_some()
    }

    pub fn simple_extraction(&self) -> Option<&SimpleExtraction> {
        self.simple_extraction.as_ref()
    }

    /// A column read with an empty transform chain
    pub fn direct_column(&self) -> Option<&str> {
        self.simple_extraction
            .as_ref()
            .filter(|s| s.is_identity())
            .map(|s| s.column.as_str())
    }

    pub fn literal(&self) -> Option<&NativeLiteral> {
        match &self.expr {
            NativeExpr::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn expr(&self) -> &NativeExpr {
        &self.expr
    }

    pub fn into_expr(self) -> NativeExpr {
        self.expr
    }

    /// The expression rendered in the engine's expression syntax
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }
}

impl fmt::Display for NativeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

impl Serialize for NativeExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.expr.serialize(serializer)
    }
}
