//! Query-level translation: filter conjuncts and projections into a native plan

use std::collections::HashSet;

use segql_ir::{NativeFilter, NativePlan, Projection, RowSignature, VirtualColumnRegistry};
use segql_rex::RexNode;
use tracing::{debug, info, info_span};

use crate::context::{PlannerConfig, PlannerContext};
use crate::conversion::ConversionError;
use crate::expressions;
use crate::OperatorRegistry;

/// Result of translating one query
#[derive(Debug, Clone)]
pub struct Translation {
    pub plan: NativePlan,
    /// Conjuncts left for the caller to evaluate on returned rows
    pub residual_filter: Vec<RexNode>,
    /// Positions of projections with no native form
    pub unconverted_projections: Vec<usize>,
}

impl Translation {
    /// Everything was pushed into the native plan
    pub fn is_complete(&self) -> bool {
        self.residual_filter.is_empty() && self.unconverted_projections.is_empty()
    }
}

/// Translator for relational filters and projections → native plans
pub struct QueryTranslator<'a> {
    operators: &'a OperatorRegistry,
    config: PlannerConfig,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(operators: &'a OperatorRegistry, config: PlannerConfig) -> Self {
        Self { operators, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Translate a filter and named projections over `signature`.
    ///
    /// Each top-level conjunct of the filter is pushed down on its own; the
    /// ones that cannot be are returned as the residual filter.
    pub fn translate(
        &self,
        signature: &RowSignature,
        filter: Option<&RexNode>,
        projections: &[(String, RexNode)],
    ) -> Result<Translation, ConversionError> {
        let ctx = PlannerContext::new(self.operators, &self.config);
        let span = info_span!("translate", compilation_id = %ctx.compilation_id());
        let _guard = span.enter();

        let mut virtual_columns =
            VirtualColumnRegistry::with_prefix(signature.clone(), &self.config.virtual_column_prefix);

        let mut pushed = Vec::new();
        let mut residual_filter = Vec::new();
        for conjunct in filter.map(RexNode::conjuncts).unwrap_or_default() {
            match expressions::to_filter(&ctx, signature, Some(&mut virtual_columns), conjunct)? {
                Some(native) => pushed.push(native),
                None => {
                    debug!(conjunct = %conjunct, "Conjunct left as residual filter");
                    residual_filter.push(conjunct.clone());
                }
            }
        }

        let mut native_projections = Vec::with_capacity(projections.len());
        let mut unconverted_projections = Vec::new();
        for (position, (output_name, node)) in projections.iter().enumerate() {
            let Some(expression) = expressions::to_native_expression(&ctx, signature, node)? else {
                debug!(position, output_name = %output_name, "Projection not translated");
                unconverted_projections.push(position);
                continue;
            };
            let column = match expression.direct_column() {
                Some(column) => column.to_string(),
                None => virtual_columns.get_or_create_virtual_column_for_expression(
                    &expression,
                    node.data_type().column_type(),
                ),
            };
            native_projections.push(Projection {
                output_name: output_name.clone(),
                column,
            });
        }

        let pushed_conjuncts = pushed.len();
        let filter = (!pushed.is_empty()).then(|| NativeFilter::and(pushed));

        // Conjuncts that ended up residual may have registered columns on the way
        let referenced: HashSet<String> = filter
            .iter()
            .flat_map(NativeFilter::required_columns)
            .chain(native_projections.iter().map(|p| p.column.clone()))
            .collect();
        let (kept, dropped): (Vec<_>, Vec<_>) = virtual_columns
            .into_virtual_columns()
            .into_iter()
            .partition(|column| referenced.contains(&column.name));
        for column in &dropped {
            debug!(virtual_column = %column.name, "Dropped unreferenced virtual column");
        }

        info!(
            pushed = pushed_conjuncts,
            residual = residual_filter.len(),
            virtual_columns = kept.len(),
            projections = native_projections.len(),
            "Translated query"
        );

        let plan = NativePlan {
            virtual_columns: kept,
            filter,
            projections: native_projections,
        };
        Ok(Translation {
            plan,
            residual_filter,
            unconverted_projections,
        })
    }
}
