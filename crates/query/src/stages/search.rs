//! Free-text search stage.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlanWarning;
use crate::params::{ParameterBag, SEARCH_TERM};

/// Case-insensitive substring search over a whitelist of fields.
///
/// The stage produces one condition per searchable field, ORed together.
/// It is a no-op when there is no term or no searchable field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStage {
    /// The trimmed search term, if one was supplied.
    term: Option<String>,
    /// Searchable fields in declaration order, without duplicates.
    fields: Vec<String>,
}

impl SearchStage {
    /// Builds the stage from `searchTerm` and the caller's searchable fields.
    ///
    /// Fields outside `searchable_fields` can never be searched.
    pub fn build<S: AsRef<str>>(bag: &ParameterBag, searchable_fields: &[S]) -> Self {
        let term = bag
            .as_string(SEARCH_TERM)
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(String::from);

        let mut fields: Vec<String> = Vec::with_capacity(searchable_fields.len());
        for field in searchable_fields {
            let field = field.as_ref().trim();
            if !field.is_empty() && !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }

        let stage = Self { term, fields };

        if let Some(warning) = stage.warning() {
            warn!(%warning, "search stage disabled");
        } else if let Some(term) = &stage.term {
            debug!(term = %term, fields = ?stage.fields, "built search stage");
        }

        stage
    }

    /// Returns the search term, if any.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// Returns the searchable fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns true if the stage matches everything.
    pub fn is_noop(&self) -> bool {
        self.term.is_none() || self.fields.is_empty()
    }

    /// Returns the diagnostic for a term that cannot be applied because no
    /// field is searchable.
    pub fn warning(&self) -> Option<PlanWarning> {
        match &self.term {
            Some(term) if self.fields.is_empty() => Some(PlanWarning::EmptySearchWhitelist {
                term: term.clone(),
            }),
            _ => None,
        }
    }
}
