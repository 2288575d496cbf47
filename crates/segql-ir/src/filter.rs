//! Native filters: structured predicates the engine evaluates during column scans

use serde::Serialize;

use crate::expression::{ExtractionFn, NativeExpr};

/// How bound filters compare values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StringComparator {
    Lexicographic,
    Numeric,
}

/// Predicate over a column (optionally through an extraction chain), a virtual
/// column, or an arbitrary boolean expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NativeFilter {
    /// Equality with a value; `value: None` matches nulls.
    Selector {
        dimension: String,
        value: Option<String>,
        #[serde(rename = "extractionFn", skip_serializing_if = "Vec::is_empty")]
        extraction_fn: Vec<ExtractionFn>,
    },
    #[serde(rename_all = "camelCase")]
    Bound {
        dimension: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lower: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upper: Option<String>,
        lower_strict: bool,
        upper_strict: bool,
        ordering: StringComparator,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        extraction_fn: Vec<ExtractionFn>,
    },
    /// Matches when the pattern is found anywhere in the value.
    Regex {
        dimension: String,
        pattern: String,
        #[serde(rename = "extractionFn", skip_serializing_if = "Vec::is_empty")]
        extraction_fn: Vec<ExtractionFn>,
    },
    Like {
        dimension: String,
        pattern: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        escape: Option<char>,
        #[serde(rename = "extractionFn", skip_serializing_if = "Vec::is_empty")]
        extraction_fn: Vec<ExtractionFn>,
    },
    /// Row-wise evaluation of a boolean expression; the slow path.
    Expression { expression: NativeExpr },
    And { fields: Vec<NativeFilter> },
    Or { fields: Vec<NativeFilter> },
    Not { field: Box<NativeFilter> },
}

impl NativeFilter {
    /// AND of filters, flattening nested ANDs; a single filter is returned as is
    pub fn and(filters: Vec<NativeFilter>) -> NativeFilter {
        let mut fields = Vec::with_capacity(filters.len());
        for filter in filters {
            match filter {
                NativeFilter::And { fields: nested } => fields.extend(nested),
                other => fields.push(other),
            }
        }
        if fields.len() == 1 {
            return fields.remove(0);
        }
        NativeFilter::And { fields }
    }

    /// OR of filters, flattening nested ORs; a single filter is returned as is
    pub fn or(filters: Vec<NativeFilter>) -> NativeFilter {
        let mut fields = Vec::with_capacity(filters.len());
        for filter in filters {
            match filter {
                NativeFilter::Or { fields: nested } => fields.extend(nested),
                other => fields.push(other),
            }
        }
        if fields.len() == 1 {
            return fields.remove(0);
        }
        NativeFilter::Or { fields }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: NativeFilter) -> NativeFilter {
        match filter {
            NativeFilter::Not { field } => *field,
            other => NativeFilter::Not { field: Box::new(other) },
        }
    }

    /// Dimensions (real or virtual) this filter reads
    pub fn required_columns(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            NativeFilter::Selector { dimension, .. }
            | NativeFilter::Bound { dimension, .. }
            | NativeFilter::Regex { dimension, .. }
            | NativeFilter::Like { dimension, .. } => push_unique(out, dimension),
            NativeFilter::Expression { expression } => {
                for column in expression.required_columns() {
                    push_unique(out, &column);
                }
            }
            NativeFilter::And { fields } | NativeFilter::Or { fields } => {
                for field in fields {
                    field.collect_columns(out);
                }
            }
            NativeFilter::Not { field } => field.collect_columns(out),
        }
    }
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|c| c == name) {
        out.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(dimension: &str, value: &str) -> NativeFilter {
        NativeFilter::Selector {
            dimension: dimension.to_string(),
            value: Some(value.to_string()),
            extraction_fn: vec![],
        }
    }

    #[test]
    fn test_and_flattens() {
        let nested = NativeFilter::and(vec![selector("a", "1"), selector("b", "2")]);
        let outer = NativeFilter::and(vec![nested, selector("c", "3")]);
        match outer {
            NativeFilter::And { fields } => assert_eq!(fields.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_single_or_unwraps() {
        let filter = NativeFilter::or(vec![selector("a", "1")]);
        assert_eq!(filter, selector("a", "1"));
    }

    #[test]
    fn test_double_not_cancels() {
        let filter = NativeFilter::not(NativeFilter::not(selector("a", "1")));
        assert_eq!(filter, selector("a", "1"));
    }

    #[test]
    fn test_regex_json_shape() {
        let filter = NativeFilter::Regex {
            dimension: "url".to_string(),
            pattern: "^https://".to_string(),
            extraction_fn: vec![],
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["type"], "regex");
        assert_eq!(json["dimension"], "url");
        assert_eq!(json["pattern"], "^https://");
        assert!(json.get("extractionFn").is_none());
    }
}
