//! Stage builders.
//!
//! Each builder reads a [`ParameterBag`](crate::ParameterBag) and produces one
//! stage of an [`ExecutionPlan`](crate::ExecutionPlan). Builders are
//! independent of each other, so the order in which they run has no effect
//! on the plan:
//!
//! - [`SearchStage`] - `searchTerm` over a whitelist of fields
//! - [`FilterStage`] - every non-reserved parameter
//! - [`SortStage`] - `sort`
//! - [`PaginationStage`] - `page` and `limit`
//! - [`ProjectionStage`] - `fields`

mod filter;
mod pagination;
mod projection;
mod search;
mod sort;

pub use filter::{FilterCondition, FilterStage};
pub use pagination::PaginationStage;
pub use projection::ProjectionStage;
pub use search::SearchStage;
pub use sort::{SortDirection, SortKey, SortStage};
