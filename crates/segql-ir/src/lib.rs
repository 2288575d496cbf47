//! segql native query model
//!
//! The target representation of SQL translation: scalar expressions, filters
//! and virtual columns the execution engine evaluates directly against
//! columnar segments. All output types serialize deterministically so plans
//! can be fingerprinted and cached.

use serde::Serialize;
use sha2::{Digest, Sha256};

mod expression;
mod filter;
mod types;
mod virtual_column;

pub use expression::*;
pub use filter::*;
pub use types::*;
pub use virtual_column::*;

/// Output column of a translated projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub output_name: String,
    /// Real or virtual column holding the value
    pub column: String,
}

/// Everything one compilation hands to the execution engine
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativePlan {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub virtual_columns: Vec<VirtualColumn>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<NativeFilter>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projections: Vec<Projection>,
}

impl NativePlan {
    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("native plan should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Physical columns the engine must scan to run this plan
    pub fn required_columns(&self) -> Vec<String> {
        let is_virtual = |name: &str| self.virtual_columns.iter().any(|v| v.name == name);

        let mut referenced: Vec<String> = Vec::new();
        if let Some(filter) = &self.filter {
            referenced.extend(filter.required_columns());
        }
        referenced.extend(self.projections.iter().map(|p| p.column.clone()));
        for column in &self.virtual_columns {
            referenced.extend(column.expression.required_columns());
        }

        let mut out: Vec<String> = Vec::new();
        for name in referenced {
            if !is_virtual(&name) && !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}
