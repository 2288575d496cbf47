//! Type system: SQL-side types seen by the optimizer and native column types
//! understood by the execution engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL type names carried by relational expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlTypeName {
    // Primitives
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Decimal,

    // Text
    Char,
    Varchar,

    // Temporal
    Date,
    Timestamp,

    // Special
    Null,
}

impl SqlTypeName {
    pub fn family(self) -> SqlTypeFamily {
        match self {
            SqlTypeName::Boolean => SqlTypeFamily::Boolean,
            SqlTypeName::TinyInt
            | SqlTypeName::SmallInt
            | SqlTypeName::Integer
            | SqlTypeName::BigInt
            | SqlTypeName::Float
            | SqlTypeName::Real
            | SqlTypeName::Double
            | SqlTypeName::Decimal => SqlTypeFamily::Numeric,
            SqlTypeName::Char | SqlTypeName::Varchar => SqlTypeFamily::Character,
            SqlTypeName::Date | SqlTypeName::Timestamp => SqlTypeFamily::Datetime,
            SqlTypeName::Null => SqlTypeFamily::Any,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.family() == SqlTypeFamily::Numeric
    }
}

impl fmt::Display for SqlTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlTypeName::Boolean => "BOOLEAN",
            SqlTypeName::TinyInt => "TINYINT",
            SqlTypeName::SmallInt => "SMALLINT",
            SqlTypeName::Integer => "INTEGER",
            SqlTypeName::BigInt => "BIGINT",
            SqlTypeName::Float => "FLOAT",
            SqlTypeName::Real => "REAL",
            SqlTypeName::Double => "DOUBLE",
            SqlTypeName::Decimal => "DECIMAL",
            SqlTypeName::Char => "CHAR",
            SqlTypeName::Varchar => "VARCHAR",
            SqlTypeName::Date => "DATE",
            SqlTypeName::Timestamp => "TIMESTAMP",
            SqlTypeName::Null => "NULL",
        };
        f.write_str(name)
    }
}

/// Families used by operator declarations to describe accepted operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlTypeFamily {
    Character,
    Numeric,
    Boolean,
    Datetime,
    Any,
}

impl SqlTypeFamily {
    /// Whether a type name is accepted by this family. NULL fits everywhere.
    pub fn accepts(self, type_name: SqlTypeName) -> bool {
        if self == SqlTypeFamily::Any || type_name == SqlTypeName::Null {
            return true;
        }
        type_name.family() == self
    }
}

/// A SQL type plus its nullability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelDataType {
    pub type_name: SqlTypeName,
    pub nullable: bool,
}

impl RelDataType {
    pub fn new(type_name: SqlTypeName, nullable: bool) -> Self {
        Self { type_name, nullable }
    }

    pub fn not_null(type_name: SqlTypeName) -> Self {
        Self::new(type_name, false)
    }

    pub fn nullable(type_name: SqlTypeName) -> Self {
        Self::new(type_name, true)
    }

    pub fn with_nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }

    /// Native column type used when this value is materialized by the engine
    pub fn column_type(&self) -> ColumnType {
        match self.type_name {
            SqlTypeName::Char | SqlTypeName::Varchar | SqlTypeName::Null => ColumnType::String,
            SqlTypeName::Boolean
            | SqlTypeName::TinyInt
            | SqlTypeName::SmallInt
            | SqlTypeName::Integer
            | SqlTypeName::BigInt
            | SqlTypeName::Date
            | SqlTypeName::Timestamp => ColumnType::Long,
            SqlTypeName::Float | SqlTypeName::Real => ColumnType::Float,
            SqlTypeName::Double | SqlTypeName::Decimal => ColumnType::Double,
        }
    }
}

impl fmt::Display for RelDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}", self.type_name)
        } else {
            write!(f, "{} NOT NULL", self.type_name)
        }
    }
}

/// Column types of the execution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    String,
    Long,
    Float,
    Double,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        !matches!(self, ColumnType::String)
    }

    /// SQL type the optimizer sees for a column of this type
    pub fn sql_type(self) -> RelDataType {
        let type_name = match self {
            ColumnType::String => SqlTypeName::Varchar,
            ColumnType::Long => SqlTypeName::BigInt,
            ColumnType::Float => SqlTypeName::Float,
            ColumnType::Double => SqlTypeName::Double,
        };
        RelDataType::nullable(type_name)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "STRING",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered column names and types of the rows an expression is evaluated against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSignature {
    columns: Vec<ColumnSpec>,
}

impl RowSignature {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn builder() -> RowSignatureBuilder {
        RowSignatureBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.find_column(name).map(|c| c.column_type)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Default)]
pub struct RowSignatureBuilder {
    columns: Vec<ColumnSpec>,
}

impl RowSignatureBuilder {
    pub fn add(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            column_type,
        });
        self
    }

    pub fn build(self) -> RowSignature {
        RowSignature::new(self.columns)
    }
}
