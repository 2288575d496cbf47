//! SQL operator declarations
//!
//! A declaration says how an operator may be called: how many operands it
//! takes, the type family each operand must belong to, which operands must be
//! compile-time literals, and how its result type is derived.

use thiserror::Error;

use segql_ir::{RelDataType, SqlTypeFamily, SqlTypeName};

use crate::rex::{OperatorSyntax, RexNode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("Operator declared without a name")]
    EmptyName,

    #[error("Operator {name} requires {required} operands but only declares {declared}")]
    RequiredExceedsDeclared {
        name: String,
        required: usize,
        declared: usize,
    },

    #[error("Operator {name} marks operand {position} as literal but only declares {declared}")]
    LiteralOutOfRange {
        name: String,
        position: usize,
        declared: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperandError {
    #[error("Operator {operator} expects {min}..={max} operands, got {actual}")]
    Count {
        operator: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Operator {operator} operand {position}: expected {expected:?}, got {actual}")]
    Type {
        operator: String,
        position: usize,
        expected: SqlTypeFamily,
        actual: SqlTypeName,
    },

    #[error("Operator {operator} operand {position} must be a literal")]
    NotLiteral { operator: String, position: usize },
}

/// Rule deriving an operator's result type from its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTypeInference {
    /// Nullable when any non-literal operand is nullable.
    CascadeNullable(SqlTypeName),
    /// Always nullable, e.g. extraction functions that can miss.
    Nullable(SqlTypeName),
    NotNull(SqlTypeName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlOperator {
    name: String,
    syntax: OperatorSyntax,
    operand_families: Vec<SqlTypeFamily>,
    required_operands: usize,
    literal_operands: Vec<usize>,
    return_type: ReturnTypeInference,
}

impl SqlOperator {
    pub fn builder(name: impl Into<String>) -> OperatorBuilder {
        OperatorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn syntax(&self) -> OperatorSyntax {
        self.syntax
    }

    pub fn operand_families(&self) -> &[SqlTypeFamily] {
        &self.operand_families
    }

    pub fn required_operand_count(&self) -> usize {
        self.required_operands
    }

    pub fn max_operand_count(&self) -> usize {
        self.operand_families.len()
    }

    pub fn literal_operands(&self) -> &[usize] {
        &self.literal_operands
    }

    pub fn is_literal_operand(&self, position: usize) -> bool {
        self.literal_operands.contains(&position)
    }

    pub fn return_type(&self) -> ReturnTypeInference {
        self.return_type
    }

    /// Reject declarations that could never be called consistently
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.name.is_empty() {
            return Err(DeclarationError::EmptyName);
        }
        let declared = self.operand_families.len();
        if self.required_operands > declared {
            return Err(DeclarationError::RequiredExceedsDeclared {
                name: self.name.clone(),
                required: self.required_operands,
                declared,
            });
        }
        if let Some(&position) = self.literal_operands.iter().find(|&&p| p >= declared) {
            return Err(DeclarationError::LiteralOutOfRange {
                name: self.name.clone(),
                position,
                declared,
            });
        }
        Ok(())
    }

    /// Check arity, operand families and literal positions of a call
    pub fn check_operands(&self, operands: &[RexNode]) -> Result<(), OperandError> {
        let (min, max) = (self.required_operands, self.max_operand_count());
        if operands.len() < min || operands.len() > max {
            return Err(OperandError::Count {
                operator: self.name.clone(),
                min,
                max,
                actual: operands.len(),
            });
        }

        for (position, (operand, family)) in operands.iter().zip(&self.operand_families).enumerate() {
            let actual = operand.data_type().type_name;
            if !family.accepts(actual) {
                return Err(OperandError::Type {
                    operator: self.name.clone(),
                    position,
                    expected: *family,
                    actual,
                });
            }
            if self.is_literal_operand(position) && !operand.is_literal() {
                return Err(OperandError::NotLiteral {
                    operator: self.name.clone(),
                    position,
                });
            }
        }
        Ok(())
    }

    pub fn infer_return_type(&self, operands: &[RexNode]) -> RelDataType {
        match self.return_type {
            ReturnTypeInference::CascadeNullable(type_name) => {
                let nullable = operands
                    .iter()
                    .filter(|operand| !operand.is_literal())
                    .any(|operand| operand.data_type().nullable);
                RelDataType::new(type_name, nullable)
            }
            ReturnTypeInference::Nullable(type_name) => RelDataType::nullable(type_name),
            ReturnTypeInference::NotNull(type_name) => RelDataType::not_null(type_name),
        }
    }
}

/// Fluent construction of [`SqlOperator`] declarations
#[derive(Debug, Clone)]
pub struct OperatorBuilder {
    name: String,
    syntax: OperatorSyntax,
    operand_families: Vec<SqlTypeFamily>,
    required_operands: Option<usize>,
    literal_operands: Vec<usize>,
    return_type: ReturnTypeInference,
}

impl OperatorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            syntax: OperatorSyntax::Function,
            operand_families: Vec::new(),
            required_operands: None,
            literal_operands: Vec::new(),
            return_type: ReturnTypeInference::CascadeNullable(SqlTypeName::Varchar),
        }
    }

    pub fn syntax(mut self, syntax: OperatorSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn operand_types(mut self, families: &[SqlTypeFamily]) -> Self {
        self.operand_families = families.to_vec();
        self
    }

    /// Operands past this count are optional; defaults to all declared operands
    pub fn required_operand_count(mut self, count: usize) -> Self {
        self.required_operands = Some(count);
        self
    }

    pub fn literal_operands(mut self, positions: &[usize]) -> Self {
        self.literal_operands = positions.to_vec();
        self
    }

    pub fn return_type_cascade_nullable(mut self, type_name: SqlTypeName) -> Self {
        self.return_type = ReturnTypeInference::CascadeNullable(type_name);
        self
    }

    pub fn return_type_nullable(mut self, type_name: SqlTypeName) -> Self {
        self.return_type = ReturnTypeInference::Nullable(type_name);
        self
    }

    pub fn return_type_not_null(mut self, type_name: SqlTypeName) -> Self {
        self.return_type = ReturnTypeInference::NotNull(type_name);
        self
    }

    pub fn build(self) -> SqlOperator {
        SqlOperator {
            required_operands: self.required_operands.unwrap_or(self.operand_families.len()),
            name: self.name,
            syntax: self.syntax,
            operand_families: self.operand_families,
            literal_operands: self.literal_operands,
            return_type: self.return_type,
        }
    }
}

/// Lookup of operator declarations by identity, used while resolving names
pub trait OperatorTable {
    fn lookup_operator(&self, name: &str) -> Option<&SqlOperator>;
}
