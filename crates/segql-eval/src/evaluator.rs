//! Row-wise evaluation of native filters, expressions and virtual columns

use regex::Regex;
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use segql_ir::{
    BinaryOp, ExtractionFn, NativeExpr, NativeFilter, RowSignature, StringComparator, UnaryOp,
    VirtualColumn,
};

use crate::like::like_to_regex;
use crate::value;
use crate::EvalError;

/// Evaluates native constructs against rows laid out by a row signature.
///
/// Virtual columns are computed on demand from their expressions. Filters use
/// three-valued logic: a row matches only when the filter is true.
pub struct RowEvaluator<'a> {
    signature: &'a RowSignature,
    virtual_columns: &'a [VirtualColumn],
    regexes: RefCell<HashMap<String, Regex>>,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(signature: &'a RowSignature, virtual_columns: &'a [VirtualColumn]) -> Self {
        Self {
            signature,
            virtual_columns,
            regexes: RefCell::new(HashMap::new()),
        }
    }

    pub fn matches(&self, filter: &NativeFilter, row: &[Value]) -> Result<bool, EvalError> {
        Ok(self.filter_truth(filter, row)? == Some(true))
    }

    /// Indexes of the rows matching `filter`
    pub fn filter_rows(&self, filter: &NativeFilter, rows: &[Vec<Value>]) -> Result<Vec<usize>, EvalError> {
        let mut matched = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if self.matches(filter, row)? {
                matched.push(index);
            }
        }
        Ok(matched)
    }

    /// Three-valued result of `filter`; `None` is unknown
    pub fn filter_truth(&self, filter: &NativeFilter, row: &[Value]) -> Result<Option<bool>, EvalError> {
        match filter {
            NativeFilter::Selector { dimension, value, extraction_fn } => {
                let actual = self.dimension_value(dimension, extraction_fn, row)?;
                Ok(match value {
                    None => Some(actual.is_null()),
                    Some(_) if actual.is_null() => None,
                    Some(expected) => Some(selector_equals(&actual, expected)),
                })
            }
            NativeFilter::Bound {
                dimension,
                lower,
                upper,
                lower_strict,
                upper_strict,
                ordering,
                extraction_fn,
            } => {
                let actual = self.dimension_value(dimension, extraction_fn, row)?;
                if actual.is_null() {
                    return Ok(None);
                }
                let mut in_range = true;
                if let Some(lower) = lower {
                    let Some(order) = bound_compare(&actual, lower, *ordering) else {
                        return Ok(None);
                    };
                    in_range &= if *lower_strict { order.is_gt() } else { order.is_ge() };
                }
                if let Some(upper) = upper {
                    let Some(order) = bound_compare(&actual, upper, *ordering) else {
                        return Ok(None);
                    };
                    in_range &= if *upper_strict { order.is_lt() } else { order.is_le() };
                }
                Ok(Some(in_range))
            }
            NativeFilter::Regex { dimension, pattern, extraction_fn } => {
                let actual = self.dimension_value(dimension, extraction_fn, row)?;
                match value::as_string(&actual) {
                    None => Ok(None),
                    Some(text) => Ok(Some(self.regex(pattern)?.is_match(&text))),
                }
            }
            NativeFilter::Like { dimension, pattern, escape, extraction_fn } => {
                let actual = self.dimension_value(dimension, extraction_fn, row)?;
                match value::as_string(&actual) {
                    None => Ok(None),
                    Some(text) => Ok(Some(self.like(pattern, *escape)?.is_match(&text))),
                }
            }
            NativeFilter::Expression { expression } => Ok(value::truth(&self.evaluate(expression, row)?)),
            NativeFilter::And { fields } => {
                let mut result = Some(true);
                for field in fields {
                    match self.filter_truth(field, row)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            NativeFilter::Or { fields } => {
                let mut result = Some(false);
                for field in fields {
                    match self.filter_truth(field, row)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            NativeFilter::Not { field } => Ok(self.filter_truth(field, row)?.map(|t| !t)),
        }
    }

    /// Value of a real or virtual column
    pub fn column_value(&self, name: &str, row: &[Value]) -> Result<Value, EvalError> {
        if let Some(index) = self.signature.index_of(name) {
            return Ok(row.get(index).cloned().unwrap_or(Value::Null));
        }
        match self.virtual_columns.iter().find(|v| v.name == name) {
            Some(column) => self.evaluate(&column.expression, row),
            None => Err(EvalError::UnknownColumn(name.to_string())),
        }
    }

    fn dimension_value(
        &self,
        dimension: &str,
        extraction_fn: &[ExtractionFn],
        row: &[Value],
    ) -> Result<Value, EvalError> {
        let mut current = self.column_value(dimension, row)?;
        for extraction in extraction_fn {
            current = self.extract(extraction, &current)?;
        }
        Ok(current)
    }

    fn extract(&self, extraction: &ExtractionFn, input: &Value) -> Result<Value, EvalError> {
        let Some(text) = value::as_string(input) else {
            return Ok(Value::Null);
        };
        Ok(match extraction {
            ExtractionFn::Substring { index, length } => substring(&text, *index, *length),
            ExtractionFn::Regex { expr, index } => self.regexp_extract(&text, expr, *index)?,
        })
    }

    pub fn evaluate(&self, expr: &NativeExpr, row: &[Value]) -> Result<Value, EvalError> {
        match expr {
            NativeExpr::Identifier(name) => self.column_value(name, row),
            NativeExpr::Literal(literal) => Ok(value::from_literal(literal)),
            NativeExpr::Unary { op: UnaryOp::Not, arg } => {
                let truth = value::truth(&self.evaluate(arg, row)?);
                Ok(value::from_truth(truth.map(|t| !t)))
            }
            NativeExpr::Binary { op, left, right } => self.evaluate_binary(*op, left, right, row),
            NativeExpr::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, row))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_function(name, &args)
            }
        }
    }

    fn evaluate_binary(
        &self,
        op: BinaryOp,
        left: &NativeExpr,
        right: &NativeExpr,
        row: &[Value],
    ) -> Result<Value, EvalError> {
        let left = self.evaluate(left, row)?;

        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            // The operand value that decides the result on its own
            let decisive = op == BinaryOp::Or;
            let left = value::truth(&left);
            if left == Some(decisive) {
                return Ok(value::from_bool(decisive));
            }
            let right = value::truth(&self.evaluate(right, row)?);
            return Ok(value::from_truth(match (left, right) {
                (_, Some(r)) if r == decisive => Some(decisive),
                (Some(_), Some(_)) => Some(!decisive),
                _ => None,
            }));
        }

        let right = self.evaluate(right, row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        let result = compare_values(&left, &right).is_some_and(|order| match op {
            BinaryOp::Eq => order.is_eq(),
            BinaryOp::Ne => order.is_ne(),
            BinaryOp::Lt => order.is_lt(),
            BinaryOp::Le => order.is_le(),
            BinaryOp::Gt => order.is_gt(),
            BinaryOp::Ge => order.is_ge(),
            BinaryOp::And | BinaryOp::Or => false,
        });
        Ok(value::from_bool(result))
    }

    fn call_function(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match (name, args) {
            ("isnull", [arg]) => Ok(value::from_bool(arg.is_null())),
            ("notnull", [arg]) => Ok(value::from_bool(!arg.is_null())),
            ("lower", [arg]) => Ok(map_string(arg, |s| s.to_lowercase())),
            ("upper", [arg]) => Ok(map_string(arg, |s| s.to_uppercase())),
            ("strlen", [arg]) => Ok(match value::as_string(arg) {
                Some(s) => Value::from(s.chars().count() as i64),
                None => Value::Null,
            }),
            ("concat", args) if !args.is_empty() => {
                let mut out = String::new();
                for arg in args {
                    match value::as_string(arg) {
                        Some(s) => out.push_str(&s),
                        None => return Ok(Value::Null),
                    }
                }
                Ok(Value::String(out))
            }
            ("substring", [arg, index, length]) => {
                let (Some(text), Some(index)) = (value::as_string(arg), index.as_i64()) else {
                    return Ok(Value::Null);
                };
                let length = length.as_i64().filter(|&l| l >= 0).map(|l| l as usize);
                Ok(substring(&text, index.max(0) as usize, length))
            }
            ("regexp_extract", [arg, pattern, index]) => {
                let (Some(text), Some(pattern)) = (value::as_string(arg), pattern.as_str()) else {
                    return Ok(Value::Null);
                };
                let index = index.as_u64().unwrap_or(0) as usize;
                self.regexp_extract(&text, pattern, index)
            }
            ("regexp_like", [arg, pattern]) => {
                let (Some(text), Some(pattern)) = (value::as_string(arg), pattern.as_str()) else {
                    return Ok(Value::Null);
                };
                Ok(value::from_bool(self.regex(pattern)?.is_match(&text)))
            }
            ("like", [arg, pattern, rest @ ..]) if rest.len() <= 1 => {
                let (Some(text), Some(pattern)) = (value::as_string(arg), pattern.as_str()) else {
                    return Ok(Value::Null);
                };
                let escape = rest.first().and_then(Value::as_str).and_then(|e| e.chars().next());
                Ok(value::from_bool(self.like(pattern, escape)?.is_match(&text)))
            }
            (name, args) => Err(EvalError::UnknownFunction {
                name: name.to_string(),
                arity: args.len(),
            }),
        }
    }

    fn regexp_extract(&self, text: &str, pattern: &str, index: usize) -> Result<Value, EvalError> {
        let regex = self.regex(pattern)?;
        Ok(regex
            .captures(text)
            .and_then(|captures| captures.get(index))
            .map(|m| Value::String(m.as_str().to_string()))
            .unwrap_or(Value::Null))
    }

    fn like(&self, pattern: &str, escape: Option<char>) -> Result<Regex, EvalError> {
        let source = like_to_regex(pattern, escape).map_err(EvalError::InvalidLikePattern)?;
        self.regex(&source)
    }

    fn regex(&self, pattern: &str) -> Result<Regex, EvalError> {
        if let Some(regex) = self.regexes.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|source| EvalError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        self.regexes
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

/// Zero-based character substring; null when `index` is past the end
fn substring(text: &str, index: usize, length: Option<usize>) -> Value {
    let total = text.chars().count();
    if index >= total {
        return Value::Null;
    }
    let take = length.unwrap_or(total - index);
    Value::String(text.chars().skip(index).take(take).collect())
}

fn map_string(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value::as_string(value) {
        Some(s) => Value::String(f(&s)),
        None => Value::Null,
    }
}

fn selector_equals(actual: &Value, expected: &str) -> bool {
    if value::is_number(actual) {
        if let (Some(a), Ok(e)) = (value::as_number(actual), expected.trim().parse::<f64>()) {
            return a == e;
        }
    }
    value::as_string(actual).is_some_and(|s| s == expected)
}

fn bound_compare(actual: &Value, bound: &str, ordering: StringComparator) -> Option<Ordering> {
    match ordering {
        StringComparator::Numeric => {
            let bound: f64 = bound.trim().parse().ok()?;
            value::as_number(actual)?.partial_cmp(&bound)
        }
        StringComparator::Lexicographic => Some(value::as_string(actual)?.as_str().cmp(bound)),
    }
}

/// Numbers compare numerically, everything else by string form
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if value::is_number(left) || value::is_number(right) {
        if let (Some(l), Some(r)) = (value::as_number(left), value::as_number(right)) {
            return l.partial_cmp(&r);
        }
    }
    Some(value::as_string(left)?.cmp(&value::as_string(right)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use segql_ir::{ColumnType, NativeLiteral};
    use serde_json::json;

    fn signature() -> RowSignature {
        RowSignature::builder()
            .add("url", ColumnType::String)
            .add("hits", ColumnType::Long)
            .build()
    }

    fn row(url: Value, hits: Value) -> Vec<Value> {
        vec![url, hits]
    }

    fn selector(value: Option<&str>) -> NativeFilter {
        NativeFilter::Selector {
            dimension: "url".to_string(),
            value: value.map(str::to_string),
            extraction_fn: vec![],
        }
    }

    #[test]
    fn test_selector_three_valued() {
        let signature = signature();
        let evaluator = RowEvaluator::new(&signature, &[]);
        let null_row = row(Value::Null, json!(1));

        assert_eq!(evaluator.filter_truth(&selector(Some("a")), &null_row).unwrap(), None);
        assert_eq!(evaluator.filter_truth(&selector(None), &null_row).unwrap(), Some(true));
        // NOT of unknown stays unknown
        assert!(!evaluator.matches(&NativeFilter::not(selector(Some("a"))), &null_row).unwrap());
    }

    #[test]
    fn test_extraction_chain() {
        let signature = signature();
        let evaluator = RowEvaluator::new(&signature, &[]);
        let filter = NativeFilter::Selector {
            dimension: "url".to_string(),
            value: Some("example".to_string()),
            extraction_fn: vec![
                ExtractionFn::Regex {
                    expr: "//([^./]+)".to_string(),
                    index: 1,
                },
                ExtractionFn::Substring {
                    index: 0,
                    length: Some(7),
                },
            ],
        };

        assert!(evaluator.matches(&filter, &row(json!("https://example.com/a"), json!(1))).unwrap());
        assert!(!evaluator.matches(&filter, &row(json!("no-scheme"), json!(1))).unwrap());
    }

    #[test]
    fn test_numeric_and_lexicographic_bounds() {
        let signature = signature();
        let evaluator = RowEvaluator::new(&signature, &[]);
        let bound = |dimension: &str, ordering| NativeFilter::Bound {
            dimension: dimension.to_string(),
            lower: Some("9".to_string()),
            upper: None,
            lower_strict: true,
            upper_strict: false,
            ordering,
            extraction_fn: vec![],
        };
        let data = row(json!("10"), json!(10));

        assert!(evaluator.matches(&bound("hits", StringComparator::Numeric), &data).unwrap());
        assert!(!evaluator.matches(&bound("url", StringComparator::Lexicographic), &data).unwrap());
    }

    #[test]
    fn test_virtual_column_evaluation() {
        let signature = signature();
        let virtual_columns = vec![VirtualColumn {
            name: "v0".to_string(),
            expression: NativeExpr::Function {
                name: "lower".to_string(),
                args: vec![NativeExpr::Identifier("url".to_string())],
            },
            output_type: ColumnType::String,
        }];
        let evaluator = RowEvaluator::new(&signature, &virtual_columns);
        let filter = NativeFilter::Regex {
            dimension: "v0".to_string(),
            pattern: "^https://".to_string(),
            extraction_fn: vec![],
        };

        assert!(evaluator.matches(&filter, &row(json!("HTTPS://A"), json!(1))).unwrap());
        assert!(matches!(
            evaluator.column_value("v9", &row(json!("x"), json!(1))),
            Err(EvalError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_expression_functions() {
        let signature = signature();
        let evaluator = RowEvaluator::new(&signature, &[]);
        let data = row(json!("Hello"), Value::Null);
        let call = |name: &str, args: Vec<NativeExpr>| NativeExpr::Function {
            name: name.to_string(),
            args,
        };
        let url = || NativeExpr::Identifier("url".to_string());
        let long = |v: i64| NativeExpr::Literal(NativeLiteral::Long(v));

        assert_eq!(evaluator.evaluate(&call("upper", vec![url()]), &data).unwrap(), json!("HELLO"));
        assert_eq!(evaluator.evaluate(&call("strlen", vec![url()]), &data).unwrap(), json!(5));
        assert_eq!(
            evaluator.evaluate(&call("substring", vec![url(), long(1), long(-1)]), &data).unwrap(),
            json!("ello")
        );
        assert_eq!(
            evaluator.evaluate(&call("substring", vec![url(), long(9), long(2)]), &data).unwrap(),
            Value::Null
        );
        assert_eq!(
            evaluator
                .evaluate(&call("isnull", vec![NativeExpr::Identifier("hits".to_string())]), &data)
                .unwrap(),
            json!(1)
        );
        assert!(matches!(
            evaluator.evaluate(&call("nope", vec![]), &data),
            Err(EvalError::UnknownFunction { .. })
        ));
    }
}
