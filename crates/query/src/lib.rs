//! Helios Query Engine
//!
//! This crate translates loosely typed request parameters into an ordered,
//! store-agnostic execution plan: free-text search, exact-match filters,
//! multi-key sorting, page-based pagination, field projection and nested
//! relation expansion. Plans are handed to a [`StorageAdapter`], which is the
//! only component that talks to a store.
//!
//! # Reserved Parameters
//!
//! Five keys carry engine semantics. Every other key is an exact-match filter.
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `searchTerm` | Case-insensitive substring match over searchable fields | none |
//! | `sort` | Comma-separated fields, `-` prefix for descending | `-createdAt` |
//! | `page` | One-based page number | 1 |
//! | `limit` | Page size | 10 |
//! | `fields` | Comma-separated projection, `-` prefix to exclude | `-__version` |
//!
//! # Architecture
//!
//! - [`params`] - The raw parameter bag
//! - [`stages`] - Independent stage builders (search, filter, sort, pagination, projection)
//! - [`expansion`] - Whitelisted relation expansion trees
//! - [`plan`] - The canonically ordered [`ExecutionPlan`]
//! - [`engine`] - [`QueryEngine`], which builds and optionally executes plans
//! - [`adapter`] - The [`StorageAdapter`] seam and the in-memory [`MemoryStore`]
//! - [`render`] - MongoDB-style rendering of plans
//! - [`config`] - [`EngineConfig`]
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```
//! use helios_query::{ParameterBag, PlanRequest, QueryEngine};
//! use helios_query::stages::{ProjectionStage, SortDirection, SortKey};
//!
//! let params = ParameterBag::from_query_string(
//!     "searchTerm=john&age=23&sort=name.firstName,-age&page=2&limit=5&fields=name,email",
//! );
//! let request = PlanRequest::new(params).searchable(["email", "name.firstName"]);
//!
//! let plan = QueryEngine::default().build_plan(&request).unwrap();
//!
//! assert_eq!(
//!     plan.filter().to_string(),
//!     r#"(email ~ "john" OR name.firstName ~ "john") AND age = "23""#
//! );
//! assert_eq!(plan.sort().keys()[1], SortKey::new("age", SortDirection::Desc));
//! assert_eq!(plan.pagination().skip(), 5);
//! assert!(plan.projection().is_include());
//! ```
//!
//! # Expansion
//!
//! Relations are only expanded when the caller whitelists the path and every
//! prefix of it:
//!
//! ```
//! use helios_query::{ConfigurationError, PlanRequest, QueryEngine};
//!
//! let engine = QueryEngine::default();
//! let request = PlanRequest::default()
//!     .allow_expansions(["academicDepartment", "academicDepartment.academicFaculty"])
//!     .expand("academicDepartment.academicFaculty");
//! let plan = engine.build_plan(&request).unwrap();
//! assert_eq!(plan.expansions()[0].children[0].path, "academicFaculty");
//!
//! let denied = PlanRequest::default()
//!     .allow_expansions(["academicDepartment"])
//!     .expand("password");
//! assert!(matches!(
//!     engine.build_plan(&denied),
//!     Err(ConfigurationError::DisallowedExpansion { .. })
//! ));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod params;
pub mod plan;
pub mod render;
pub mod stages;

// Re-export commonly used types at crate root
pub use adapter::{MemoryStore, StorageAdapter};
pub use config::EngineConfig;
pub use engine::{PageMeta, PlanRequest, QueryEngine, QueryOutcome, build_plan};
pub use error::{
    AdapterError, AdapterResult, ConfigurationError, PlanWarning, QueryError, QueryResult,
};
pub use expansion::{ExpansionNode, ExpansionRequest, ExpansionResolver};
pub use params::ParameterBag;
pub use plan::{CombinedFilter, Condition, ExecutionPlan, Stage, StageKind};
pub use render::DocumentQuery;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
