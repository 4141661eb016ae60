//! Pagination stage.
//!
//! Pagination never fails a request: anything that is not a positive
//! integer falls back to the configured default.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::params::{LIMIT, PAGE, ParameterBag};

/// Page-based pagination with a derived skip count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationStage {
    page: u64,
    limit: u64,
    skip: u64,
}

impl PaginationStage {
    /// Creates a stage for a one-based `page` of `limit` documents.
    ///
    /// Zero values are raised to one.
    pub fn new(page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        Self {
            page,
            limit,
            skip: (page - 1).saturating_mul(limit),
        }
    }

    /// Builds the stage from `page` and `limit`.
    ///
    /// The engine enforces no ceiling on `limit` unless
    /// [`EngineConfig::max_limit`] is set.
    pub fn build(bag: &ParameterBag, config: &EngineConfig) -> Self {
        let page = positive(bag, PAGE).unwrap_or(config.default_page);
        let mut limit = positive(bag, LIMIT).unwrap_or(config.default_limit);

        if let Some(max) = config.max_limit {
            limit = limit.min(max);
        }

        let stage = Self::new(page, limit);
        debug!(page = stage.page, limit = stage.limit, skip = stage.skip, "built pagination stage");
        stage
    }

    /// Returns the one-based page number.
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Returns the page size.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the number of documents to skip.
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Returns the number of pages needed for `total` documents.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

fn positive(bag: &ParameterBag, key: &str) -> Option<u64> {
    let parsed = bag.as_number(key).filter(|n| *n > 0).map(|n| n as u64);
    if parsed.is_none() && bag.contains(key) {
        debug!(
            parameter = key,
            value = ?bag.as_string(key),
            "falling back to default pagination value"
        );
    }
    parsed
}
