//! Engine configuration.
//!
//! Configuration covers the defaults the stage builders fall back to and the
//! bounds the expansion resolver enforces. It can be built programmatically,
//! from command line arguments, or from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QUERY_DEFAULT_PAGE` | 1 | Page used when `page` is absent or invalid |
//! | `QUERY_DEFAULT_LIMIT` | 10 | Page size used when `limit` is absent or invalid |
//! | `QUERY_MAX_LIMIT` | unset | Optional ceiling applied to `limit` |
//! | `QUERY_DEFAULT_SORT_FIELD` | createdAt | Field sorted descending by default |
//! | `QUERY_VERSION_FIELD` | __version | Field excluded by the default projection |
//! | `QUERY_ID_FIELD` | _id | Identifier implicitly kept by inclusion projections |
//! | `QUERY_MAX_EXPANSION_DEPTH` | 2 | Deepest allowed relation expansion |
//! | `QUERY_STRICT_SEARCH` | false | Reject a search term when no fields are searchable |
//! | `QUERY_IGNORED_FILTER_KEYS` | | Extra keys never treated as filters (comma-separated) |
//! | `QUERY_EXPANSION_PARAM` | unset | Parameter carrying requested expansions |
//! | `QUERY_LOG_LEVEL` | info | Log level for binaries |
//!
//! # Example
//!
//! ```rust
//! use helios_query::EngineConfig;
//!
//! let config = EngineConfig {
//!     default_limit: 25,
//!     max_limit: Some(100),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;

/// Configuration for a [`QueryEngine`](crate::QueryEngine).
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "query-engine")]
#[command(about = "Query translation engine configuration")]
pub struct EngineConfig {
    /// Page used when `page` is absent, non-numeric, or not positive.
    #[arg(long, env = "QUERY_DEFAULT_PAGE", default_value = "1")]
    pub default_page: u64,

    /// Page size used when `limit` is absent, non-numeric, or not positive.
    #[arg(long, env = "QUERY_DEFAULT_LIMIT", default_value = "10")]
    pub default_limit: u64,

    /// Optional ceiling on `limit`. The engine enforces none unless set.
    #[arg(long, env = "QUERY_MAX_LIMIT")]
    pub max_limit: Option<u64>,

    /// Creation-timestamp field used for the default sort.
    #[arg(long, env = "QUERY_DEFAULT_SORT_FIELD", default_value = "createdAt")]
    pub default_sort_field: String,

    /// Internal version field excluded by the default projection.
    #[arg(long, env = "QUERY_VERSION_FIELD", default_value = "__version")]
    pub version_field: String,

    /// Identifier field kept implicitly by inclusion projections.
    #[arg(long, env = "QUERY_ID_FIELD", default_value = "_id")]
    pub id_field: String,

    /// Deepest relation expansion accepted, counted in path segments.
    #[arg(long, env = "QUERY_MAX_EXPANSION_DEPTH", default_value = "2")]
    pub max_expansion_depth: usize,

    /// Treat a search term without searchable fields as an error.
    #[arg(long, env = "QUERY_STRICT_SEARCH", default_value = "false")]
    pub strict_search: bool,

    /// Keys that are never turned into filters, in addition to the reserved ones.
    #[arg(long, env = "QUERY_IGNORED_FILTER_KEYS", value_delimiter = ',')]
    pub ignored_filter_keys: Vec<String>,

    /// Parameter whose comma-separated value lists requested expansions.
    ///
    /// Unset by default, in which case expansions are only requested through
    /// [`PlanRequest::expand`](crate::PlanRequest::expand) and every
    /// non-reserved parameter is a filter.
    #[arg(long, env = "QUERY_EXPANSION_PARAM")]
    pub expansion_param: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "QUERY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_limit: 10,
            max_limit: None,
            default_sort_field: "createdAt".to_string(),
            version_field: "__version".to_string(),
            id_field: "_id".to_string(),
            max_expansion_depth: 2,
            strict_search: false,
            ignored_filter_keys: Vec::new(),
            expansion_param: None,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Command line arguments are not consulted; anything that fails to
    /// parse falls back to the defaults.
    pub fn from_env() -> Self {
        Self::try_parse_from(["query-engine"]).unwrap_or_default()
    }

    /// Returns true if `key` must never become a filter condition.
    pub fn is_ignored_filter_key(&self, key: &str) -> bool {
        self.ignored_filter_keys.iter().any(|k| k == key)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_page == 0 {
            errors.push("Default page cannot be 0".to_string());
        }

        if self.default_limit == 0 {
            errors.push("Default limit cannot be 0".to_string());
        }

        if let Some(max) = self.max_limit {
            if max == 0 {
                errors.push("Max limit cannot be 0".to_string());
            } else if self.default_limit > max {
                errors.push("Default limit cannot exceed max limit".to_string());
            }
        }

        if self.default_sort_field.trim().is_empty() {
            errors.push("Default sort field cannot be empty".to_string());
        }

        if self.version_field.trim().is_empty() {
            errors.push("Version field cannot be empty".to_string());
        }

        if self.id_field.trim().is_empty() {
            errors.push("Id field cannot be empty".to_string());
        }

        if let Some(param) = &self.expansion_param
            && crate::params::is_reserved(param)
        {
            errors.push(format!("Expansion parameter cannot be reserved key '{}'", param));
        }

        if self.max_expansion_depth == 0 {
            errors.push("Max expansion depth cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            strict_search: false,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }
}
