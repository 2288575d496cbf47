//! Translating command line expressions into a native plan report

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;

use segql_eval::{execute_plan, rows_from_json, ExecutionBudget};
use segql_ir::{NativePlan, RowSignature};
use segql_registry::{builtin_registry, QueryTranslator};
use segql_rex::{parse_rex, RexNode};

use crate::config::Config;

/// What the command prints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub fingerprint: String,
    pub plan: NativePlan,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub residual_filter: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unconverted_projections: Vec<String>,
    /// Rows selected by the plan; absent when part of the filter stayed residual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSet>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// `name=expression`, or a bare expression named after its position
pub fn parse_projection(position: usize, text: &str) -> (String, String) {
    if let Some((name, expression)) = text.split_once('=') {
        let is_name = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_name && !expression.trim().is_empty() && !expression.starts_with('=') {
            return (name.to_string(), expression.trim().to_string());
        }
    }
    (format!("EXPR${position}"), text.trim().to_string())
}

pub fn build_report(
    config: &Config,
    filter: Option<&str>,
    projections: &[String],
    rows: Option<&[Value]>,
    budget: &ExecutionBudget,
) -> anyhow::Result<PlanReport> {
    let signature = &config.signature;
    let operators = builtin_registry();

    let filter = filter
        .map(|source| {
            parse_rex(source, signature, operators).with_context(|| format!("Invalid filter: {source}"))
        })
        .transpose()?;

    let mut named: Vec<(String, RexNode)> = Vec::with_capacity(projections.len());
    for (position, text) in projections.iter().enumerate() {
        let (name, source) = parse_projection(position, text);
        let node = parse_rex(&source, signature, operators)
            .with_context(|| format!("Invalid projection {name}: {source}"))?;
        named.push((name, node));
    }

    let translation = QueryTranslator::new(operators, config.planner.clone())
        .translate(signature, filter.as_ref(), &named)
        .context("Translation failed")?;

    crate::log_event!(
        level: tracing::Level::INFO,
        event: "plan_built",
        virtual_columns: translation.plan.virtual_columns.len(),
        residual: translation.residual_filter.len(),
        unconverted: translation.unconverted_projections.len()
    );

    let result = match rows {
        Some(_) if !translation.residual_filter.is_empty() => {
            tracing::warn!(
                residual = translation.residual_filter.len(),
                "Filter was not fully pushed down, rows are not evaluated"
            );
            None
        }
        Some(rows) => Some(run(signature, &translation.plan, rows, budget)?),
        None => None,
    };

    Ok(PlanReport {
        fingerprint: translation.plan.fingerprint(),
        residual_filter: translation.residual_filter.iter().map(RexNode::to_string).collect(),
        unconverted_projections: translation
            .unconverted_projections
            .iter()
            .map(|&position| named[position].0.clone())
            .collect(),
        plan: translation.plan,
        result,
    })
}

fn run(
    signature: &RowSignature,
    plan: &NativePlan,
    objects: &[Value],
    budget: &ExecutionBudget,
) -> anyhow::Result<ResultSet> {
    let rows = rows_from_json(signature, objects)?;
    let result = execute_plan(signature, plan, &rows, Some(budget))?;
    Ok(ResultSet {
        columns: result.columns,
        rows: result.rows,
        row_count: result.row_count,
    })
}
