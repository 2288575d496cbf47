//! Filters built on the direct column path, the virtual column path and the
//! plain expression path must select the same rows.

use serde_json::{json, Value};

use segql_eval::{execute_plan, rows_from_json, RowEvaluator};
use segql_ir::{ColumnType, NativeFilter, NativePlan, RowSignature};
use segql_registry::{builtin_registry, expressions, PlannerConfig, PlannerContext, QueryTranslator};
use segql_rex::{parse_rex, RexNode};

const PREDICATES: &[&str] = &[
    "REGEXP_LIKE(url, '^https://')",
    "REGEXP_LIKE(LOWER(url), '^https://')",
    "url LIKE '%example%'",
    "page LIKE 'a!_%' ESCAPE '!'",
    "NOT (url LIKE 'http:%')",
    "SUBSTRING(url, 1, 5) = 'https'",
    "SUBSTRING(url, 9) LIKE 'ex%'",
    "REGEXP_EXTRACT(url, '//([^/]+)', 1) = 'example.com'",
    "hits >= 10",
    "10 > hits",
    "hits <> 5",
    "score < 2.5",
    "page < 'm'",
    "page IS NULL",
    "page IS NOT NULL",
    "page = 'home' OR hits > 100",
    "CHAR_LENGTH(page) <= 4",
    "UPPER(page) = 'HOME' AND REGEXP_LIKE(url, 'example')",
];

/// Comparisons whose literal belongs to another type family than the column
const MIXED_FAMILY_PREDICATES: &[(&str, &[usize])] = &[
    ("page > 5", &[0, 1, 2, 4, 6]),
    ("hits < 'abc'", &[0, 1, 2, 3, 5, 6]),
    ("'abc' > hits", &[0, 1, 2, 3, 5, 6]),
    ("page = 10", &[6]),
];

fn signature() -> RowSignature {
    RowSignature::builder()
        .add("url", ColumnType::String)
        .add("page", ColumnType::String)
        .add("hits", ColumnType::Long)
        .add("score", ColumnType::Double)
        .build()
}

fn rows() -> Vec<Vec<Value>> {
    rows_from_json(
        &signature(),
        &[
            json!({"url": "https://example.com/a", "page": "home", "hits": 12, "score": 1.5}),
            json!({"url": "HTTPS://EXAMPLE.COM/b", "page": "a_b", "hits": 5, "score": 2.5}),
            json!({"url": "http://other.org", "page": "abc", "hits": 150, "score": 0.1}),
            json!({"url": "ftp://example.com", "page": null, "hits": 9, "score": null}),
            json!({"url": null, "page": "zebra", "hits": null, "score": 3.0}),
            json!({"url": "", "page": "", "hits": 10, "score": 2.4}),
            json!({"url": "http://other.net/10", "page": "10", "hits": 12, "score": 0.5}),
        ],
    )
    .unwrap()
}

fn rex(source: &str) -> RexNode {
    parse_rex(source, &signature(), builtin_registry()).unwrap()
}

fn translate(predicate: &RexNode, force_virtual_columns: bool) -> NativePlan {
    let config = PlannerConfig {
        force_virtual_columns,
        ..PlannerConfig::default()
    };
    let translation = QueryTranslator::new(builtin_registry(), config)
        .translate(&signature(), Some(predicate), &[])
        .unwrap();
    assert!(translation.is_complete(), "{predicate} left a residual");
    translation.plan
}

fn matching_rows(plan: &NativePlan) -> Vec<usize> {
    let signature = signature();
    let evaluator = RowEvaluator::new(&signature, &plan.virtual_columns);
    let filter = plan.filter.as_ref().unwrap();
    evaluator.filter_rows(filter, &rows()).unwrap()
}

fn expression_only(predicate: &RexNode) -> NativePlan {
    let config = PlannerConfig::default();
    let ctx = PlannerContext::new(builtin_registry(), &config);
    let expression = expressions::to_native_expression(&ctx, &signature(), predicate)
        .unwrap()
        .unwrap();
    NativePlan {
        filter: Some(NativeFilter::Expression {
            expression: expression.into_expr(),
        }),
        ..NativePlan::default()
    }
}

#[test]
fn test_direct_and_virtual_column_paths_agree() {
    for source in PREDICATES {
        let predicate = rex(source);

        let direct = translate(&predicate, false);
        let forced = translate(&predicate, true);
        assert!(!forced.virtual_columns.is_empty(), "{source} was not materialized");

        let expected = matching_rows(&expression_only(&predicate));
        assert_eq!(matching_rows(&direct), expected, "direct path of {source}");
        assert_eq!(matching_rows(&forced), expected, "virtual column path of {source}");
    }
}

#[test]
fn test_known_match_sets() {
    let cases: &[(&str, &[usize])] = &[
        ("REGEXP_LIKE(url, '^https://')", &[0]),
        ("REGEXP_LIKE(LOWER(url), '^https://')", &[0, 1]),
        ("hits <> 5", &[0, 2, 3, 5, 6]),
        ("page IS NULL", &[3]),
        ("page LIKE 'a!_%' ESCAPE '!'", &[1]),
        ("SUBSTRING(url, 1, 5) = 'https'", &[0]),
    ];
    for (source, expected) in cases {
        let plan = translate(&rex(source), false);
        assert_eq!(matching_rows(&plan), expected.to_vec(), "{source}");
    }
}

#[test]
fn test_mixed_family_comparisons_keep_expression_semantics() {
    for (source, expected) in MIXED_FAMILY_PREDICATES {
        let predicate = rex(source);
        let expected_rows = matching_rows(&expression_only(&predicate));
        assert_eq!(&expected_rows, expected, "expression semantics of {source}");

        for force_virtual_columns in [false, true] {
            let plan = translate(&predicate, force_virtual_columns);
            assert!(
                matches!(plan.filter, Some(NativeFilter::Expression { .. })),
                "{source} should not become a selector or bound: {:?}",
                plan.filter
            );
            assert!(plan.virtual_columns.is_empty(), "{source}");
            assert_eq!(matching_rows(&plan), expected_rows, "{source}");
        }
    }
}

#[test]
fn test_translated_query_end_to_end() {
    let signature = signature();
    let filter = rex("REGEXP_LIKE(LOWER(url), 'example') AND hits >= 10");
    let projections = vec![
        ("host".to_string(), rex("REGEXP_EXTRACT(url, '//([^/]+)', 1)")),
        ("page".to_string(), rex("page")),
    ];

    let translation = QueryTranslator::new(builtin_registry(), PlannerConfig::default())
        .translate(&signature, Some(&filter), &projections)
        .unwrap();
    let result = execute_plan(&signature, &translation.plan, &rows(), None).unwrap();

    assert_eq!(result.columns, vec!["host", "page"]);
    assert_eq!(result.rows, vec![vec![json!("example.com"), json!("home")]]);
}
