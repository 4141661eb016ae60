//! Sort stage.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::params::{ParameterBag, SORT};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates a sort key.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parses one sort entry (e.g., "-age" for descending).
    ///
    /// Returns `None` when no field name remains.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (field, direction) = match s.strip_prefix('-') {
            Some(stripped) => (stripped.trim(), SortDirection::Desc),
            None => (s, SortDirection::Asc),
        };
        if field.is_empty() {
            None
        } else {
            Some(Self::new(field, direction))
        }
    }
}

/// Ordered sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortStage {
    keys: Vec<SortKey>,
}

impl SortStage {
    /// Builds the stage from the comma-separated `sort` parameter.
    ///
    /// Field names are not checked against any whitelist. When `sort` is
    /// absent or holds no usable entry, the stage sorts descending on the
    /// configured creation-timestamp field.
    pub fn build(bag: &ParameterBag, config: &EngineConfig) -> Self {
        let keys: Vec<SortKey> = bag
            .as_string_list(SORT, ',')
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| SortKey::parse(entry))
            .collect();

        if keys.is_empty() {
            return Self::default_for(config);
        }

        debug!(keys = ?keys, "built sort stage");
        Self { keys }
    }

    /// The default sort: newest first.
    pub fn default_for(config: &EngineConfig) -> Self {
        Self {
            keys: vec![SortKey::new(
                config.default_sort_field.clone(),
                SortDirection::Desc,
            )],
        }
    }

    /// Returns the sort keys in priority order.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}
