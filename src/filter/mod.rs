//! Schema-checked query building for the scheme engine: conditions, ordering
//! and paging rendered to parameterized SQL with typed casts.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;
