//! Parameterized SQL construction.

pub mod comparison;
pub mod select;

pub use comparison::{
    ComparisonOperator, Logic, ParameterizedComparison, SqlComparisonBuilder,
};
pub use select::{Aggregate, Order, SelectQuery};
