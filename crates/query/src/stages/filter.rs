//! Field filter stage.
//!
//! Every parameter that is not reserved becomes a condition on the field of
//! the same name. Only equality is supported; a value syntax for ranges
//! (greater-than, less-than) is not defined, so such values are matched
//! literally. Keys with a `$`-prefixed path segment name store operators
//! rather than fields and are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::params::{ParameterBag, is_reserved};

/// A condition on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum FilterCondition {
    /// The field equals the value.
    Equals(String),
    /// The field equals any of the values (repeated parameter).
    AnyOf(Vec<String>),
}

impl FilterCondition {
    /// Returns the values this condition accepts.
    pub fn values(&self) -> &[String] {
        match self {
            FilterCondition::Equals(value) => std::slice::from_ref(value),
            FilterCondition::AnyOf(values) => values,
        }
    }
}

/// Equality filters keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStage {
    conditions: BTreeMap<String, FilterCondition>,
}

impl FilterStage {
    /// Builds the stage from every non-reserved parameter.
    ///
    /// Reserved keys are always dropped, as are the configured ignored keys
    /// and the expansion parameter when one is configured. Operator keys such
    /// as `$where` or `name.$gt` never become conditions.
    pub fn build(bag: &ParameterBag, config: &EngineConfig) -> Self {
        let mut conditions = BTreeMap::new();

        for (key, values) in bag.iter() {
            if key.is_empty()
                || is_reserved(key)
                || config.is_ignored_filter_key(key)
                || config.expansion_param.as_deref() == Some(key)
            {
                continue;
            }
            if is_operator_key(key) {
                debug!(key = %key, "dropping operator key from filter");
                continue;
            }

            let condition = match values {
                [single] => FilterCondition::Equals(single.clone()),
                many => FilterCondition::AnyOf(many.to_vec()),
            };
            conditions.insert(key.to_string(), condition);
        }

        debug!(fields = ?conditions.keys().collect::<Vec<_>>(), "built filter stage");

        Self { conditions }
    }

    /// Drops conditions on fields not listed in `allowed`.
    ///
    /// Used when a caller declares which fields may be filtered on; without
    /// such a declaration every non-reserved key is kept.
    pub fn restrict<S: AsRef<str>>(mut self, allowed: &[S]) -> Self {
        self.conditions.retain(|field, _| {
            let keep = allowed.iter().any(|a| a.as_ref() == field);
            if !keep {
                debug!(field = %field, "dropping filter on undeclared field");
            }
            keep
        });
        self
    }

    /// Returns the condition on `field`, if any.
    pub fn get(&self, field: &str) -> Option<&FilterCondition> {
        self.conditions.get(field)
    }

    /// Returns an iterator over conditions in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterCondition)> {
        self.conditions
            .iter()
            .map(|(field, condition)| (field.as_str(), condition))
    }

    /// Returns the number of filtered fields.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Returns true if no field is filtered.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Returns true if any dot segment of `key` starts with `$`.
pub(crate) fn is_operator_key(key: &str) -> bool {
    key.split('.').any(|segment| segment.starts_with('$'))
}
