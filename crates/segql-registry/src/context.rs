//! Per-compilation planner state shared with every operator conversion

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use segql_ir::DEFAULT_VIRTUAL_COLUMN_PREFIX;

use crate::OperatorRegistry;

/// Planner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Materialize filtered expressions as virtual columns even when they are
    /// simple extractions. Only useful to compare both push-down paths.
    pub force_virtual_columns: bool,

    /// Prefix for synthetic virtual column names
    pub virtual_column_prefix: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            force_virtual_columns: false,
            virtual_column_prefix: DEFAULT_VIRTUAL_COLUMN_PREFIX.to_string(),
        }
    }
}

pub struct PlannerContext<'a> {
    operators: &'a OperatorRegistry,
    config: &'a PlannerConfig,
    compilation_id: Uuid,
}

impl<'a> PlannerContext<'a> {
    pub fn new(operators: &'a OperatorRegistry, config: &'a PlannerConfig) -> Self {
        Self {
            operators,
            config,
            compilation_id: Uuid::new_v4(),
        }
    }

    pub fn operators(&self) -> &'a OperatorRegistry {
        self.operators
    }

    pub fn config(&self) -> &'a PlannerConfig {
        self.config
    }

    pub fn compilation_id(&self) -> Uuid {
        self.compilation_id
    }
}
