//! Reference row-wise executor for native plans
//!
//! Runs a [`NativePlan`] over in-memory JSON rows. It is the slow path the
//! engine falls back to and is what push-down results are checked against.

mod evaluator;
mod like;
mod value;

use serde_json::Value;
use thiserror::Error;

use segql_ir::{NativePlan, RowSignature};

pub use evaluator::RowEvaluator;
pub use like::like_to_regex;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown function {name} with {arity} arguments")]
    UnknownFunction { name: String, arity: usize },

    #[error("Invalid regular expression {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid LIKE pattern: {0}")]
    InvalidLikePattern(String),

    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionBudget {
    pub max_rows: Option<usize>,
}

#[derive(Debug)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// Execute `plan` over `rows`, each laid out by `signature`.
///
/// Without projections every signature column is returned.
pub fn execute_plan(
    signature: &RowSignature,
    plan: &NativePlan,
    rows: &[Vec<Value>],
    budget: Option<&ExecutionBudget>,
) -> Result<QueryResult, EvalError> {
    let evaluator = RowEvaluator::new(signature, &plan.virtual_columns);

    let (columns, sources): (Vec<String>, Vec<String>) = if plan.projections.is_empty() {
        signature
            .column_names()
            .map(|name| (name.to_string(), name.to_string()))
            .unzip()
    } else {
        plan.projections
            .iter()
            .map(|p| (p.output_name.clone(), p.column.clone()))
            .unzip()
    };

    let mut result_rows = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if row.len() != signature.len() {
            return Err(EvalError::RowWidth {
                row: index,
                expected: signature.len(),
                actual: row.len(),
            });
        }
        if let Some(filter) = &plan.filter {
            if !evaluator.matches(filter, row)? {
                continue;
            }
        }

        let projected = sources
            .iter()
            .map(|source| evaluator.column_value(source, row))
            .collect::<Result<Vec<_>, _>>()?;
        result_rows.push(projected);

        if let Some(max_rows) = budget.and_then(|b| b.max_rows) {
            if result_rows.len() > max_rows {
                return Err(EvalError::BudgetExceeded(format!("Max rows ({max_rows}) exceeded")));
            }
        }
    }

    tracing::debug!(
        scanned = rows.len(),
        matched = result_rows.len(),
        "Executed native plan"
    );

    Ok(QueryResult {
        columns,
        row_count: result_rows.len(),
        rows: result_rows,
    })
}

/// Lay out JSON objects as rows of `signature`; missing keys are null
pub fn rows_from_json(signature: &RowSignature, objects: &[Value]) -> Result<Vec<Vec<Value>>, EvalError> {
    objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let object = object
                .as_object()
                .ok_or_else(|| EvalError::InvalidRow(format!("row {index} is not a JSON object")))?;
            Ok(signature
                .column_names()
                .map(|name| object.get(name).cloned().unwrap_or(Value::Null))
                .collect())
        })
        .collect()
}
