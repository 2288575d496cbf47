//! Virtual columns: computed expressions materialized once per compilation and
//! referenced afterwards by a synthetic column name.

use serde::Serialize;
use std::collections::HashMap;

use crate::expression::{NativeExpr, NativeExpression};
use crate::types::{ColumnSpec, ColumnType, RowSignature};

pub const DEFAULT_VIRTUAL_COLUMN_PREFIX: &str = "v";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualColumn {
    pub name: String,
    pub expression: NativeExpr,
    pub output_type: ColumnType,
}

/// Registry of the virtual columns created while compiling one query.
///
/// Registering the same expression with the same output type twice hands back
/// the name given the first time, so each distinct expression is computed at
/// most once. A registry belongs to exactly one compilation and is never shared.
#[derive(Debug)]
pub struct VirtualColumnRegistry {
    base_signature: RowSignature,
    prefix: String,
    columns: Vec<VirtualColumn>,
    by_expression: HashMap<(String, ColumnType), usize>,
}

impl VirtualColumnRegistry {
    pub fn new(base_signature: RowSignature) -> Self {
        Self::with_prefix(base_signature, DEFAULT_VIRTUAL_COLUMN_PREFIX)
    }

    /// Use `prefix` for synthetic names, adjusted until it cannot collide with
    /// a column of the base signature
    pub fn with_prefix(base_signature: RowSignature, prefix: &str) -> Self {
        let prefix = unused_prefix_for_digits(prefix, &base_signature);
        Self {
            base_signature,
            prefix,
            columns: Vec::new(),
            by_expression: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name of the virtual column computing `expression` as `output_type`,
    /// creating it if this compilation has not seen the pair yet
    pub fn get_or_create_virtual_column_for_expression(
        &mut self,
        expression: &NativeExpression,
        output_type: ColumnType,
    ) -> String {
        let key = (expression.expression(), output_type);
        if let Some(&position) = self.by_expression.get(&key) {
            return self.columns[position].name.clone();
        }

        let name = format!("{}{}", self.prefix, self.columns.len());
        tracing::debug!(
            virtual_column = %name,
            expression = %key.0,
            output_type = %output_type,
            "Registered virtual column"
        );
        self.columns.push(VirtualColumn {
            name: name.clone(),
            expression: expression.expr().clone(),
            output_type,
        });
        self.by_expression.insert(key, self.columns.len() - 1);
        name
    }

    pub fn get_virtual_column(&self, name: &str) -> Option<&VirtualColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_virtual_column_by_expression(
        &self,
        expression: &NativeExpression,
        output_type: ColumnType,
    ) -> Option<&VirtualColumn> {
        self.by_expression
            .get(&(expression.expression(), output_type))
            .map(|&position| &self.columns[position])
    }

    pub fn is_virtual_column(&self, name: &str) -> bool {
        self.get_virtual_column(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn virtual_columns(&self) -> &[VirtualColumn] {
        &self.columns
    }

    pub fn base_signature(&self) -> &RowSignature {
        &self.base_signature
    }

    /// Base signature followed by every registered virtual column
    pub fn full_row_signature(&self) -> RowSignature {
        let columns = self
            .base_signature
            .columns()
            .iter()
            .cloned()
            .chain(self.columns.iter().map(|c| ColumnSpec {
                name: c.name.clone(),
                column_type: c.output_type,
            }))
            .collect();
        RowSignature::new(columns)
    }

    pub fn into_virtual_columns(self) -> Vec<VirtualColumn> {
        self.columns
    }
}

/// Prepend underscores to `base` until no column is named `<prefix><digits>`
fn unused_prefix_for_digits(base: &str, signature: &RowSignature) -> String {
    let mut prefix = base.to_string();
    while signature.column_names().any(|name| collides(name, &prefix)) {
        prefix.insert(0, '_');
    }
    prefix
}

fn collides(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::NativeExpression;

    fn lower_url() -> NativeExpression {
        NativeExpression::of_function_call("lower", vec![NativeExpression::of_column("url")])
    }

    fn signature() -> RowSignature {
        RowSignature::builder().add("url", ColumnType::String).build()
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = VirtualColumnRegistry::new(signature());

        let first = registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::String);
        let second = registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::String);

        assert_eq!(first, "v0");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_output_type_is_part_of_identity() {
        let mut registry = VirtualColumnRegistry::new(signature());

        let as_string = registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::String);
        let as_long = registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::Long);

        assert_ne!(as_string, as_long);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry
                .get_virtual_column_by_expression(&lower_url(), ColumnType::Long)
                .map(|c| c.name.as_str()),
            Some("v1")
        );
    }

    #[test]
    fn test_prefix_avoids_signature_columns() {
        let signature = RowSignature::builder()
            .add("v0", ColumnType::String)
            .add("_v12", ColumnType::Long)
            .add("version", ColumnType::String)
            .build();
        let mut registry = VirtualColumnRegistry::new(signature);

        assert_eq!(registry.prefix(), "__v");
        let name = registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::String);
        assert_eq!(name, "__v0");
    }

    #[test]
    fn test_full_row_signature_appends_virtual_columns() {
        let mut registry = VirtualColumnRegistry::new(signature());
        registry.get_or_create_virtual_column_for_expression(&lower_url(), ColumnType::String);

        let full = registry.full_row_signature();
        assert_eq!(full.column_names().collect::<Vec<_>>(), vec!["url", "v0"]);
        assert_eq!(full.column_type("v0"), Some(ColumnType::String));
        assert!(registry.is_virtual_column("v0"));
        assert!(!registry.is_virtual_column("url"));
    }
}
