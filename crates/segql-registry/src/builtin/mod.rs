//! Conversions for the operators every registry starts with

mod comparison;
mod direct;
mod like;
mod logical;
mod null_check;
mod regexp_extract;
mod regexp_like;
mod substring;

use std::sync::Arc;

pub use comparison::ComparisonOperatorConversion;
pub use direct::DirectOperatorConversion;
pub use like::LikeOperatorConversion;
pub use logical::LogicalOperatorConversion;
pub use null_check::NullCheckOperatorConversion;
pub use regexp_extract::RegexpExtractOperatorConversion;
pub use regexp_like::RegexpLikeOperatorConversion;
pub use substring::SubstringOperatorConversion;

use crate::conversion::OperatorConversion;

pub fn builtin_conversions() -> Vec<Arc<dyn OperatorConversion>> {
    let mut conversions: Vec<Arc<dyn OperatorConversion>> = vec![
        Arc::new(RegexpLikeOperatorConversion::new()),
        Arc::new(LikeOperatorConversion::new()),
        Arc::new(NullCheckOperatorConversion::is_null()),
        Arc::new(NullCheckOperatorConversion::is_not_null()),
        Arc::new(LogicalOperatorConversion::and()),
        Arc::new(LogicalOperatorConversion::or()),
        Arc::new(LogicalOperatorConversion::not()),
        Arc::new(DirectOperatorConversion::lower()),
        Arc::new(DirectOperatorConversion::upper()),
        Arc::new(DirectOperatorConversion::char_length()),
        Arc::new(DirectOperatorConversion::concat()),
        Arc::new(DirectOperatorConversion::concat_operator()),
        Arc::new(SubstringOperatorConversion::new()),
        Arc::new(RegexpExtractOperatorConversion::new()),
    ];
    for comparison in ComparisonOperatorConversion::all() {
        conversions.push(Arc::new(comparison));
    }
    conversions
}
