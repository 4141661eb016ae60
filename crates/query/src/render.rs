//! MongoDB-style query rendering.
//!
//! Translates an [`ExecutionPlan`] into the filter, sort, projection and
//! populate documents a MongoDB-like driver expects. Filter values are kept
//! as the strings they arrived as; search terms are escaped before being
//! used as case-insensitive regular expressions.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::expansion::ExpansionNode;
use crate::plan::{CombinedFilter, Condition, ExecutionPlan};
use crate::stages::{ProjectionStage, SortDirection, SortStage};

/// A plan rendered into driver documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentQuery {
    /// The `find` filter.
    pub filter: Value,
    /// Ordered sort keys.
    pub sort: Value,
    /// Documents to skip.
    pub skip: u64,
    /// Documents to return.
    pub limit: u64,
    /// Field selection.
    pub projection: Value,
    /// Nested populate instructions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub populate: Vec<Value>,
}

impl DocumentQuery {
    /// Renders `plan`.
    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        Self {
            filter: render_filter(plan.filter()),
            sort: render_sort(plan.sort()),
            skip: plan.pagination().skip(),
            limit: plan.pagination().limit(),
            projection: render_projection(plan.projection()),
            populate: plan.expansions().iter().map(render_populate).collect(),
        }
    }

    /// Returns the whole query as one JSON document.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "filter": self.filter,
            "sort": self.sort,
            "skip": self.skip,
            "limit": self.limit,
            "projection": self.projection,
        });
        if !self.populate.is_empty() {
            body["populate"] = json!(self.populate);
        }
        body
    }
}

fn render_condition(condition: &Condition) -> (String, Value) {
    match condition {
        Condition::Equals { field, value } => (field.clone(), json!(value)),
        Condition::AnyOf { field, values } => (field.clone(), json!({ "$in": values })),
        Condition::Contains { field, term } => (
            field.clone(),
            json!({ "$regex": regex::escape(term), "$options": "i" }),
        ),
    }
}

/// Field conditions are ANDed. When a search group is present the whole
/// filter becomes an `$and` list so no field key can share a level with `$or`.
fn render_filter(filter: &CombinedFilter) -> Value {
    let fields: Vec<(String, Value)> = filter.all.iter().map(render_condition).collect();

    if filter.any.is_empty() {
        return Value::Object(fields.into_iter().collect());
    }

    let clauses: Vec<Value> = filter
        .any
        .iter()
        .map(|condition| {
            let (field, value) = render_condition(condition);
            json!({ field: value })
        })
        .collect();
    let search = json!({ "$or": clauses });

    if fields.is_empty() {
        return search;
    }

    let mut conjuncts = vec![search];
    conjuncts.extend(fields.into_iter().map(|(field, value)| json!({ field: value })));
    json!({ "$and": conjuncts })
}

fn render_sort(sort: &SortStage) -> Value {
    let mut order_by = Map::new();
    for key in sort.keys() {
        let order = match key.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        order_by.insert(key.field.clone(), json!(order));
    }
    Value::Object(order_by)
}

fn render_projection(projection: &ProjectionStage) -> Value {
    let flag = if projection.is_include() { 1 } else { 0 };
    Value::Object(
        projection
            .fields()
            .iter()
            .map(|field| (field.clone(), json!(flag)))
            .collect(),
    )
}

fn render_populate(node: &ExpansionNode) -> Value {
    let mut entry = json!({ "path": node.path });
    if let Some(projection) = &node.projection {
        entry["select"] = json!(projection.to_string());
    }
    if !node.children.is_empty() {
        let children: Vec<Value> = node.children.iter().map(render_populate).collect();
        entry["populate"] = json!(children);
    }
    entry
}
