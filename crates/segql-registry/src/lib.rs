//! Operator conversion registry
//!
//! Maps SQL operators to conversions that lower calls into native expressions
//! and, for boolean operators, native filters. The registry is built once and
//! only read afterwards; per-compilation state lives in [`PlannerContext`]
//! and the [`VirtualColumnRegistry`](segql_ir::VirtualColumnRegistry).

pub mod builtin;
mod context;
mod conversion;
pub mod expressions;
pub mod pushdown;
mod translator;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use segql_rex::{DeclarationError, OperatorTable, SqlOperator};
use thiserror::Error;

pub use context::{PlannerConfig, PlannerContext};
pub use conversion::{
    check_literal_operands, convert_direct_call, literal_operand, operand, optional_literal_operand,
    Conversion, ConversionError, OperatorConversion,
};
pub use translator::{QueryTranslator, Translation};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Malformed operator declaration: {0}")]
    MalformedDeclaration(#[from] DeclarationError),

    #[error("Operator already registered: {0}")]
    DuplicateOperator(String),
}

static BUILTIN_REGISTRY: LazyLock<OperatorRegistry> = LazyLock::new(|| {
    OperatorRegistry::with_builtins().expect("Builtin operator declarations must be valid")
});

/// Process-wide registry holding the builtin conversions
pub fn builtin_registry() -> &'static OperatorRegistry {
    &BUILTIN_REGISTRY
}

#[derive(Default)]
pub struct OperatorRegistry {
    conversions: HashMap<String, Arc<dyn OperatorConversion>>,
}

impl OperatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for conversion in builtin::builtin_conversions() {
            registry.register(conversion)?;
        }
        Ok(registry)
    }

    /// Add a conversion under its operator's name.
    ///
    /// Declarations are validated here so a malformed one never reaches a
    /// compilation.
    pub fn register(&mut self, conversion: Arc<dyn OperatorConversion>) -> Result<(), RegistryError> {
        let operator = conversion.sql_operator();
        operator.validate()?;

        let name = operator.name().to_string();
        if self.conversions.contains_key(&name) {
            return Err(RegistryError::DuplicateOperator(name));
        }
        tracing::debug!(operator = %name, "Registered operator conversion");
        self.conversions.insert(name, conversion);
        Ok(())
    }

    /// Conversion for an exact operator identity
    pub fn lookup(&self, operator: &str) -> Option<&dyn OperatorConversion> {
        self.conversions.get(operator).map(|c| c.as_ref())
    }

    pub fn contains(&self, operator: &str) -> bool {
        self.conversions.contains_key(operator)
    }

    /// Registered operator names, sorted
    pub fn operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.conversions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}

impl OperatorTable for OperatorRegistry {
    fn lookup_operator(&self, name: &str) -> Option<&SqlOperator> {
        self.lookup(name).map(|c| c.sql_operator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use builtin::RegexpLikeOperatorConversion;
    use segql_ir::{NativeExpression, RowSignature, SqlTypeFamily};
    use segql_rex::RexCall;

    struct BrokenConversion(SqlOperator);

    impl OperatorConversion for BrokenConversion {
        fn sql_operator(&self) -> &SqlOperator {
            &self.0
        }

        fn to_native_expression(
            &self,
            _ctx: &PlannerContext<'_>,
            _signature: &RowSignature,
            _call: &RexCall,
        ) -> Conversion<NativeExpression> {
            Ok(None)
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        for name in ["REGEXP_LIKE", "LIKE", "=", "<>", "AND", "NOT", "IS NULL", "SUBSTRING", "||"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.lookup("REGEXP_LIKE").unwrap().sql_operator().name(), "REGEXP_LIKE");
        assert!(registry.lookup("regexp_like").is_none());
        assert!(registry.lookup_operator("LOWER").is_some());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = OperatorRegistry::new();
        registry.register(Arc::new(RegexpLikeOperatorConversion::new())).unwrap();
        let err = registry
            .register(Arc::new(RegexpLikeOperatorConversion::new()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOperator(name) if name == "REGEXP_LIKE"));
    }

    #[test]
    fn test_malformed_declaration_rejected() {
        let mut registry = OperatorRegistry::new();
        let declaration = SqlOperator::builder("BROKEN")
            .operand_types(&[SqlTypeFamily::Character])
            .literal_operands(&[1])
            .build();
        let err = registry.register(Arc::new(BrokenConversion(declaration))).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MalformedDeclaration(DeclarationError::LiteralOutOfRange { position: 1, .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_operator_names_sorted() {
        let names = builtin_registry().operator_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), builtin_registry().len());
    }
}
