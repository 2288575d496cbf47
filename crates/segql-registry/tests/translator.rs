use segql_ir::{ColumnType, NativeFilter, Projection, RelDataType, RowSignature, SqlTypeName};
use segql_registry::{builtin_registry, PlannerConfig, QueryTranslator};
use segql_rex::{parse_rex, OperatorSyntax, RexNode};

fn signature() -> RowSignature {
    RowSignature::builder()
        .add("url", ColumnType::String)
        .add("hits", ColumnType::Long)
        .add("v0", ColumnType::String)
        .build()
}

fn rex(source: &str) -> RexNode {
    parse_rex(source, &signature(), builtin_registry()).unwrap()
}

fn translator() -> QueryTranslator<'static> {
    QueryTranslator::new(builtin_registry(), PlannerConfig::default())
}

#[test]
fn test_filter_and_projection_share_virtual_column() {
    let filter = rex("REGEXP_LIKE(LOWER(url), '^https://') AND hits > 3");
    let projections = vec![
        ("lower_url".to_string(), rex("LOWER(url)")),
        ("hits".to_string(), rex("hits")),
    ];

    let translation = translator()
        .translate(&signature(), Some(&filter), &projections)
        .unwrap();
    assert!(translation.is_complete());

    let plan = &translation.plan;
    // `v0` is a real column, so synthetic names move to `_v`
    assert_eq!(plan.virtual_columns.len(), 1);
    assert_eq!(plan.virtual_columns[0].name, "_v0");
    assert_eq!(
        plan.projections,
        vec![
            Projection {
                output_name: "lower_url".to_string(),
                column: "_v0".to_string(),
            },
            Projection {
                output_name: "hits".to_string(),
                column: "hits".to_string(),
            },
        ]
    );
    match &plan.filter {
        Some(NativeFilter::And { fields }) => {
            assert_eq!(fields.len(), 2);
            assert!(matches!(&fields[0], NativeFilter::Regex { dimension, .. } if dimension == "_v0"));
            assert!(matches!(&fields[1], NativeFilter::Bound { dimension, .. } if dimension == "hits"));
        }
        other => panic!("expected AND filter, got {other:?}"),
    }
    assert_eq!(plan.required_columns(), vec!["hits", "url"]);
}

#[test]
fn test_unconvertible_conjunct_is_residual() {
    let boolean = RelDataType::nullable(SqlTypeName::Boolean);
    let mystery = RexNode::call(
        "MYSTERY_MATCH",
        OperatorSyntax::Function,
        vec![RexNode::column(&signature(), "url").unwrap()],
        boolean,
    );
    let filter = RexNode::call(
        "AND",
        OperatorSyntax::Binary,
        vec![rex("url LIKE 'https%'"), mystery.clone()],
        boolean,
    );
    let projections = vec![("m".to_string(), mystery.clone())];

    let translation = translator()
        .translate(&signature(), Some(&filter), &projections)
        .unwrap();

    assert!(!translation.is_complete());
    assert_eq!(translation.residual_filter, vec![mystery]);
    assert_eq!(translation.unconverted_projections, vec![0]);
    assert!(matches!(translation.plan.filter, Some(NativeFilter::Like { .. })));
    assert!(translation.plan.projections.is_empty());
}

#[test]
fn test_residual_conjunct_leaves_no_virtual_columns_behind() {
    let filter = rex("REGEXP_LIKE(LOWER(url), 'a') OR SUBSTRING(url, 0) = 'x'");
    let translation = translator().translate(&signature(), Some(&filter), &[]).unwrap();

    assert_eq!(translation.residual_filter, vec![filter]);
    assert_eq!(translation.plan.filter, None);
    assert!(translation.plan.virtual_columns.is_empty());

    let filter = rex("(REGEXP_LIKE(UPPER(url), 'A') OR SUBSTRING(url, 0) = 'x') AND REGEXP_LIKE(LOWER(url), 'b')");
    let translation = translator().translate(&signature(), Some(&filter), &[]).unwrap();

    assert_eq!(translation.residual_filter.len(), 1);
    let plan = &translation.plan;
    assert_eq!(plan.virtual_columns.len(), 1);
    assert_eq!(plan.virtual_columns[0].name, "_v1");
    assert_eq!(plan.virtual_columns[0].expression.to_string(), r#"lower("url")"#);
    assert!(matches!(&plan.filter, Some(NativeFilter::Regex { dimension, .. }) if dimension == "_v1"));
}

#[test]
fn test_contract_violation_fails_translation() {
    let call = RexNode::call(
        "LIKE",
        OperatorSyntax::Binary,
        vec![
            RexNode::column(&signature(), "url").unwrap(),
            RexNode::column(&signature(), "v0").unwrap(),
        ],
        RelDataType::nullable(SqlTypeName::Boolean),
    );

    assert!(translator().translate(&signature(), Some(&call), &[]).is_err());
}

#[test]
fn test_plan_serialization_and_fingerprint() {
    let filter = rex("SUBSTRING(url, 1, 5) = 'https'");
    let first = translator().translate(&signature(), Some(&filter), &[]).unwrap();
    let second = translator().translate(&signature(), Some(&filter), &[]).unwrap();

    let json = serde_json::to_value(&first.plan).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "filter": {
                "type": "selector",
                "dimension": "url",
                "value": "https",
                "extractionFn": [{"type": "substring", "index": 0, "length": 5}],
            }
        })
    );
    // Compilation ids differ, plans do not
    assert_eq!(first.plan.fingerprint(), second.plan.fingerprint());
}

#[test]
fn test_forced_virtual_columns() {
    let config = PlannerConfig {
        force_virtual_columns: true,
        virtual_column_prefix: "vc".to_string(),
    };
    let translation = QueryTranslator::new(builtin_registry(), config)
        .translate(&signature(), Some(&rex("REGEXP_LIKE(url, 'a')")), &[])
        .unwrap();

    let plan = translation.plan;
    assert_eq!(plan.virtual_columns[0].name, "vc0");
    assert_eq!(plan.virtual_columns[0].expression.to_string(), r#""url""#);
    assert!(matches!(plan.filter, Some(NativeFilter::Regex { ref dimension, .. }) if dimension == "vc0"));
}
