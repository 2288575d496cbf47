//! Choosing what a structured filter scans
//!
//! A filter over a lowered operand can run directly on a column (through its
//! extraction chain) when the operand is a simple extraction. Any other
//! operand has to be materialized as a virtual column first, which needs a
//! registry to put it in.

use segql_ir::{ExtractionFn, NativeExpression, RelDataType, SimpleExtraction, VirtualColumnRegistry};
use tracing::trace;

use crate::context::PlannerContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterTarget {
    /// Scan the column through its extraction chain
    Column(SimpleExtraction),
    /// Scan a virtual column computing the operand
    VirtualColumn(String),
}

impl FilterTarget {
    pub fn dimension(&self) -> &str {
        match self {
            FilterTarget::Column(simple) => &simple.column,
            FilterTarget::VirtualColumn(name) => name,
        }
    }

    /// Split into the filter's `dimension` and `extraction_fn`
    pub fn into_parts(self) -> (String, Vec<ExtractionFn>) {
        match self {
            FilterTarget::Column(simple) => (simple.column, simple.extraction_fn),
            FilterTarget::VirtualColumn(name) => (name, Vec::new()),
        }
    }
}

/// Pick the scan target for a filter over `operand`, or `None` when the
/// operand is neither a simple extraction nor materializable.
///
/// `force_virtual_columns` prefers a virtual column even for simple
/// extractions, as long as a registry is available.
pub fn resolve_filter_target(
    ctx: &PlannerContext<'_>,
    operand: &NativeExpression,
    operand_type: RelDataType,
    virtual_columns: Option<&mut VirtualColumnRegistry>,
) -> Option<FilterTarget> {
    let forced = ctx.config().force_virtual_columns && virtual_columns.is_some();

    if let Some(simple) = operand.simple_extraction().filter(|_| !forced) {
        trace!(
            compilation_id = %ctx.compilation_id(),
            column = %simple.column,
            extractions = simple.extraction_fn.len(),
            "Filter pushed down to column"
        );
        return Some(FilterTarget::Column(simple.clone()));
    }

    match virtual_columns {
        Some(registry) => {
            let name = registry
                .get_or_create_virtual_column_for_expression(operand, operand_type.column_type());
            trace!(
                compilation_id = %ctx.compilation_id(),
                virtual_column = %name,
                expression = %operand,
                "Filter pushed down to virtual column"
            );
            Some(FilterTarget::VirtualColumn(name))
        }
        None => {
            trace!(
                compilation_id = %ctx.compilation_id(),
                expression = %operand,
                "No virtual column registry, filter not pushed down"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PlannerConfig;
    use crate::OperatorRegistry;
    use segql_ir::{ColumnType, NativeExpr, RowSignature, SqlTypeName};

    fn signature() -> RowSignature {
        RowSignature::builder().add("url", ColumnType::String).build()
    }

    fn lower_url() -> NativeExpression {
        NativeExpression::of_function_call("lower", vec![NativeExpression::of_column("url")])
    }

    fn varchar() -> RelDataType {
        RelDataType::nullable(SqlTypeName::Varchar)
    }

    #[test]
    fn test_simple_extraction_targets_column() {
        let operators = OperatorRegistry::new();
        let config = PlannerConfig::default();
        let ctx = PlannerContext::new(&operators, &config);
        let mut registry = VirtualColumnRegistry::new(signature());

        let target =
            resolve_filter_target(&ctx, &NativeExpression::of_column("url"), varchar(), Some(&mut registry));

        assert_eq!(target, Some(FilterTarget::Column(SimpleExtraction::of("url"))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_complex_operand_needs_registry() {
        let operators = OperatorRegistry::new();
        let config = PlannerConfig::default();
        let ctx = PlannerContext::new(&operators, &config);

        assert_eq!(resolve_filter_target(&ctx, &lower_url(), varchar(), None), None);

        let mut registry = VirtualColumnRegistry::new(signature());
        let target = resolve_filter_target(&ctx, &lower_url(), varchar(), Some(&mut registry));
        assert_eq!(target, Some(FilterTarget::VirtualColumn("v0".to_string())));

        let column = registry.get_virtual_column("v0").unwrap();
        assert_eq!(column.output_type, ColumnType::String);
        assert!(matches!(column.expression, NativeExpr::Function { .. }));
    }

    #[test]
    fn test_forced_virtual_columns() {
        let operators = OperatorRegistry::new();
        let config = PlannerConfig {
            force_virtual_columns: true,
            ..PlannerConfig::default()
        };
        let ctx = PlannerContext::new(&operators, &config);
        let url = NativeExpression::of_column("url");

        let mut registry = VirtualColumnRegistry::new(signature());
        let target = resolve_filter_target(&ctx, &url, varchar(), Some(&mut registry));
        assert_eq!(target.map(|t| t.into_parts().0), Some("v0".to_string()));

        // Without a registry the direct path is still taken
        let target = resolve_filter_target(&ctx, &url, varchar(), None);
        assert_eq!(target.as_ref().map(FilterTarget::dimension), Some("url"));
    }
}
