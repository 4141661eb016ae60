//! Error types for the query engine.
//!
//! Errors fall into two families:
//!
//! - [`ConfigurationError`] - caller misuse detected while building a plan.
//!   These are permanent and are always raised before any store access.
//! - [`AdapterError`] - failures reported by a [`StorageAdapter`](crate::adapter::StorageAdapter)
//!   while executing a plan. The engine propagates them unchanged.
//!
//! Malformed pagination input is not an error at all; it falls back to the
//! configured defaults.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

/// The primary error type returned by the engine.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Caller misuse detected at plan-construction time.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failure raised by the storage adapter while executing a plan.
    #[error(transparent)]
    Execution(#[from] AdapterError),
}

impl QueryError {
    /// Returns true if the operation may succeed when attempted again.
    ///
    /// Configuration errors never are. Execution errors defer to the
    /// adapter's own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Configuration(_) => false,
            QueryError::Execution(err) => err.is_transient(),
        }
    }
}

/// Errors caused by how the engine was called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A requested expansion path, or one of its prefixes, is not whitelisted.
    #[error("expansion '{path}' is not allowed: segment '{segment}' is not in the whitelist")]
    DisallowedExpansion { path: String, segment: String },

    /// A requested expansion path is deeper than the configured maximum.
    #[error("expansion '{path}' has depth {depth}, maximum is {max_depth}")]
    ExpansionTooDeep {
        path: String,
        depth: usize,
        max_depth: usize,
    },

    /// A requested expansion path contains an empty segment.
    #[error("malformed expansion path '{path}'")]
    MalformedExpansion { path: String },

    /// The `fields` parameter mixes inclusion and exclusion syntax.
    #[error("projection '{fields}' mixes included and excluded fields")]
    MixedProjection { fields: String },

    /// A search term was supplied but no fields are searchable (strict mode).
    #[error("search term '{term}' supplied but no searchable fields are declared")]
    EmptySearchWhitelist { term: String },
}

/// Errors raised by a storage adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The store could not be reached.
    #[error("store unavailable: {store}: {message}")]
    Unavailable { store: String, message: String },

    /// A field referenced by the plan does not exist in the store.
    #[error("unknown field '{field}' in {stage} stage")]
    UnknownField { field: String, stage: String },

    /// The plan references a collection the store does not know.
    #[error("unknown collection: {collection}")]
    UnknownCollection { collection: String },

    /// A relation named in the expansion tree cannot be resolved.
    #[error("relation '{relation}' cannot be resolved")]
    UnresolvableRelation { relation: String },

    /// Any other store-specific failure.
    #[error("query execution failed in {store}: {message}")]
    Internal {
        store: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AdapterError {
    /// Returns true if the failure is likely transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::Unavailable { .. })
    }
}

/// A non-fatal diagnostic recorded while building a plan.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlanWarning {
    /// A search term was supplied but no fields are searchable, so the
    /// search stage matches everything.
    EmptySearchWhitelist { term: String },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::EmptySearchWhitelist { term } => write!(
                f,
                "search term '{}' ignored: no searchable fields declared",
                term
            ),
        }
    }
}

/// Result type alias for engine operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Internal {
            store: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
