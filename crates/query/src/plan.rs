//! Execution plans.
//!
//! An [`ExecutionPlan`] is the only thing a storage adapter receives. Its
//! stages are always in the canonical order
//!
//! ```text
//! Search ∪ Filter  →  Sort  →  Paginate  →  Project
//! ```
//!
//! followed by the expansion tree, whatever order the stage builders ran in.
//! Search and filter are merged into one [`CombinedFilter`] so that an
//! adapter always filters before it sorts, skips, limits, and projects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanWarning;
use crate::expansion::ExpansionNode;
use crate::stages::{
    FilterCondition, FilterStage, PaginationStage, ProjectionStage, SearchStage, SortStage,
};

/// A predicate on one document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Condition {
    /// The field equals `value`.
    #[allow(missing_docs)]
    Equals { field: String, value: String },
    /// The field equals one of `values`.
    #[allow(missing_docs)]
    AnyOf { field: String, values: Vec<String> },
    /// The field contains `term`, ignoring case.
    #[allow(missing_docs)]
    Contains { field: String, term: String },
}

impl Condition {
    /// Returns the field this condition applies to.
    pub fn field(&self) -> &str {
        match self {
            Condition::Equals { field, .. }
            | Condition::AnyOf { field, .. }
            | Condition::Contains { field, .. } => field,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { field, value } => write!(f, "{field} = {value:?}"),
            Condition::AnyOf { field, values } => write!(f, "{field} in {values:?}"),
            Condition::Contains { field, term } => write!(f, "{field} ~ {term:?}"),
        }
    }
}

/// The merged search and filter stages.
///
/// A document matches when it satisfies every condition in `all` and, if
/// `any` is non-empty, at least one condition in `any`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedFilter {
    /// Filter-stage conditions, ANDed.
    pub all: Vec<Condition>,
    /// Search-stage conditions, ORed. Empty means no search.
    pub any: Vec<Condition>,
}

impl CombinedFilter {
    /// Merges a search stage and a filter stage.
    pub fn merge(search: &SearchStage, filter: &FilterStage) -> Self {
        let any = match search.term() {
            Some(term) if !search.is_noop() => search
                .fields()
                .iter()
                .map(|field| Condition::Contains {
                    field: field.clone(),
                    term: term.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        let all = filter
            .iter()
            .map(|(field, condition)| match condition {
                FilterCondition::Equals(value) => Condition::Equals {
                    field: field.to_string(),
                    value: value.clone(),
                },
                FilterCondition::AnyOf(values) => Condition::AnyOf {
                    field: field.to_string(),
                    values: values.clone(),
                },
            })
            .collect();

        Self { all, any }
    }

    /// Returns true if every document matches.
    pub fn matches_all(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }
}

impl fmt::Display for CombinedFilter {
    /// Formats the filter as a boolean expression, e.g.
    /// `(email ~ "john" OR name ~ "john") AND age = "23"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches_all() {
            return write!(f, "*");
        }

        let mut parts: Vec<String> = Vec::with_capacity(self.all.len() + 1);
        match self.any.as_slice() {
            [] => {}
            [single] => parts.push(single.to_string()),
            many => {
                let group: Vec<String> = many.iter().map(ToString::to_string).collect();
                parts.push(format!("({})", group.join(" OR ")));
            }
        }
        parts.extend(self.all.iter().map(ToString::to_string));

        write!(f, "{}", parts.join(" AND "))
    }
}

/// Identifies a stage of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Combined search and filter.
    Filter,
    /// Sort.
    Sort,
    /// Skip and limit.
    Paginate,
    /// Field selection.
    Project,
}

/// A borrowed view of one plan stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage<'a> {
    /// Combined search and filter.
    Filter(&'a CombinedFilter),
    /// Sort.
    Sort(&'a SortStage),
    /// Skip and limit.
    Paginate(&'a PaginationStage),
    /// Field selection.
    Project(&'a ProjectionStage),
}

impl Stage<'_> {
    /// Returns the kind of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Filter(_) => StageKind::Filter,
            Stage::Sort(_) => StageKind::Sort,
            Stage::Paginate(_) => StageKind::Paginate,
            Stage::Project(_) => StageKind::Project,
        }
    }
}

/// An immutable, canonically ordered query plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    filter: CombinedFilter,
    sort: SortStage,
    pagination: PaginationStage,
    projection: ProjectionStage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    expansions: Vec<ExpansionNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<PlanWarning>,
}

impl ExecutionPlan {
    /// Assembles a plan from independently built stages.
    ///
    /// The result does not depend on the order in which the stages were
    /// built. Warnings reported by the search stage are carried on the plan.
    pub fn assemble(
        search: &SearchStage,
        filter: &FilterStage,
        sort: SortStage,
        pagination: PaginationStage,
        projection: ProjectionStage,
        expansions: Vec<ExpansionNode>,
    ) -> Self {
        Self {
            filter: CombinedFilter::merge(search, filter),
            sort,
            pagination,
            projection,
            expansions,
            warnings: search.warning().into_iter().collect(),
        }
    }

    /// Returns the stages in execution order.
    pub fn stages(&self) -> [Stage<'_>; 4] {
        [
            Stage::Filter(&self.filter),
            Stage::Sort(&self.sort),
            Stage::Paginate(&self.pagination),
            Stage::Project(&self.projection),
        ]
    }

    /// Returns the combined filter.
    pub fn filter(&self) -> &CombinedFilter {
        &self.filter
    }

    /// Returns the sort stage.
    pub fn sort(&self) -> &SortStage {
        &self.sort
    }

    /// Returns the pagination stage.
    pub fn pagination(&self) -> &PaginationStage {
        &self.pagination
    }

    /// Returns the projection stage.
    pub fn projection(&self) -> &ProjectionStage {
        &self.projection
    }

    /// Returns the top-level expansions.
    pub fn expansions(&self) -> &[ExpansionNode] {
        &self.expansions
    }

    /// Returns diagnostics recorded while building the plan.
    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }
}
