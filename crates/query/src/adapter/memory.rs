//! In-memory storage adapter.
//!
//! Holds JSON documents in named collections and interprets execution plans
//! directly. Field paths may be dotted and descend through nested objects
//! and arrays of objects. Relations are resolved by looking up the
//! referenced identifier in the collection registered for the relation
//! field.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AdapterError, AdapterResult};
use crate::expansion::ExpansionNode;
use crate::plan::{CombinedFilter, Condition, ExecutionPlan};
use crate::stages::{ProjectionStage, SortDirection, SortKey};

use super::StorageAdapter;

const ADAPTER_NAME: &str = "memory";

/// An in-memory document store.
///
/// # Example
///
/// ```
/// use helios_query::{MemoryStore, ParameterBag, PlanRequest, QueryEngine};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store.insert("students", json!({"_id": "s1", "name": "Ada", "createdAt": 1}));
/// store.insert("students", json!({"_id": "s2", "name": "Alan", "createdAt": 2}));
///
/// let request = PlanRequest::new(ParameterBag::from_pairs([("searchTerm", "ala")]))
///     .searchable(["name"]);
/// let outcome = QueryEngine::default()
///     .execute(&store, "students", &request, true)
///     .await
///     .unwrap();
///
/// assert_eq!(outcome.documents.len(), 1);
/// assert_eq!(outcome.meta.total, Some(1));
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    id_field: String,
    collections: RwLock<HashMap<String, Vec<Value>>>,
    schemas: RwLock<HashMap<String, Vec<String>>>,
    relations: RwLock<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store whose documents are identified by `_id`.
    pub fn new() -> Self {
        Self::with_id_field("_id")
    }

    /// Creates an empty store using `id_field` as the document identifier.
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            collections: RwLock::new(HashMap::new()),
            schemas: RwLock::new(HashMap::new()),
            relations: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates `collection` if it does not exist yet.
    pub fn create_collection(&self, collection: &str) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default();
    }

    /// Appends a document to `collection`, creating it if needed.
    pub fn insert(&self, collection: &str, document: Value) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Appends several documents to `collection`.
    pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Value>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Declares the fields of `collection`.
    ///
    /// Once declared, sorting on or including an undeclared field fails with
    /// [`AdapterError::UnknownField`]. Collections without a declaration
    /// accept any field.
    pub fn declare_fields<I, S>(&self, collection: &str, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas.write().insert(
            collection.to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
    }

    /// Registers `field` as a reference into `target_collection`.
    pub fn relate(&self, field: impl Into<String>, target_collection: impl Into<String>) {
        self.relations
            .write()
            .insert(field.into(), target_collection.into());
    }

    /// Marks the store as reachable or not. An unreachable store fails every
    /// call with [`AdapterError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    fn ensure_available(&self) -> AdapterResult<()> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::Unavailable {
                store: ADAPTER_NAME.to_string(),
                message: "store is offline".to_string(),
            })
        }
    }

    fn check_fields(&self, collection: &str, plan: &ExecutionPlan) -> AdapterResult<()> {
        let schemas = self.schemas.read();
        let Some(declared) = schemas.get(collection) else {
            return Ok(());
        };

        let is_known = |path: &str| {
            path == self.id_field
                || declared.iter().any(|field| {
                    field == path
                        || path.starts_with(&format!("{field}."))
                        || field.starts_with(&format!("{path}."))
                })
        };

        for key in plan.sort().keys() {
            if !is_known(&key.field) {
                return Err(AdapterError::UnknownField {
                    field: key.field.clone(),
                    stage: "sort".to_string(),
                });
            }
        }

        if let ProjectionStage::Include(fields) = plan.projection() {
            for field in fields {
                if !is_known(field) {
                    return Err(AdapterError::UnknownField {
                        field: field.clone(),
                        stage: "projection".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn run(&self, collection: &str, plan: &ExecutionPlan) -> AdapterResult<Vec<Value>> {
        self.ensure_available()?;
        self.check_fields(collection, plan)?;

        let collections = self.collections.read();
        let documents = collections
            .get(collection)
            .ok_or_else(|| AdapterError::UnknownCollection {
                collection: collection.to_string(),
            })?;

        let mut matched: Vec<&Value> = documents
            .iter()
            .filter(|doc| matches_filter(doc, plan.filter()))
            .collect();
        let total = matched.len();

        matched.sort_by(|a, b| compare_documents(a, b, plan.sort().keys()));

        let pagination = plan.pagination();
        let skip = usize::try_from(pagination.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);

        let relations = self.relations.read();
        let mut page = Vec::with_capacity(limit.min(total));
        for document in matched.into_iter().skip(skip).take(limit) {
            let mut projected = project(document, plan.projection(), &self.id_field);
            for node in plan.expansions() {
                self.expand(&mut projected, node, &collections, &relations)?;
            }
            page.push(projected);
        }

        debug!(
            collection,
            matched = total,
            returned = page.len(),
            "memory store executed plan"
        );
        Ok(page)
    }

    fn expand(
        &self,
        document: &mut Value,
        node: &ExpansionNode,
        collections: &HashMap<String, Vec<Value>>,
        relations: &HashMap<String, String>,
    ) -> AdapterResult<()> {
        let Value::Object(map) = document else {
            return Ok(());
        };
        // Absent or projected away: nothing to resolve.
        let Some(slot) = map.get_mut(&node.path) else {
            return Ok(());
        };

        let target = relations
            .get(&node.path)
            .ok_or_else(|| AdapterError::UnresolvableRelation {
                relation: node.path.clone(),
            })?;
        let targets = collections
            .get(target)
            .ok_or_else(|| AdapterError::UnknownCollection {
                collection: target.clone(),
            })?;

        match slot {
            Value::Null => {}
            Value::Array(references) => {
                for reference in references.iter_mut() {
                    *reference = self.resolve(reference, node, targets, collections, relations)?;
                }
            }
            reference => {
                *reference = self.resolve(reference, node, targets, collections, relations)?;
            }
        }

        Ok(())
    }

    fn resolve(
        &self,
        reference: &Value,
        node: &ExpansionNode,
        targets: &[Value],
        collections: &HashMap<String, Vec<Value>>,
        relations: &HashMap<String, String>,
    ) -> AdapterResult<Value> {
        let found = targets
            .iter()
            .find(|candidate| candidate.get(&self.id_field) == Some(reference));

        // Dangling references resolve to null.
        let Some(found) = found else {
            return Ok(Value::Null);
        };

        let mut resolved = match &node.projection {
            Some(projection) => project(found, projection, &self.id_field),
            None => found.clone(),
        };
        for child in &node.children {
            self.expand(&mut resolved, child, collections, relations)?;
        }
        Ok(resolved)
    }

    fn count_matches(&self, collection: &str, filter: &CombinedFilter) -> AdapterResult<u64> {
        self.ensure_available()?;

        let collections = self.collections.read();
        let documents = collections
            .get(collection)
            .ok_or_else(|| AdapterError::UnknownCollection {
                collection: collection.to_string(),
            })?;

        Ok(documents
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .count() as u64)
    }
}

#[async_trait]
impl StorageAdapter for MemoryStore {
    fn adapter_name(&self) -> &'static str {
        ADAPTER_NAME
    }

    async fn execute(&self, collection: &str, plan: &ExecutionPlan) -> AdapterResult<Vec<Value>> {
        self.run(collection, plan)
    }

    async fn count(&self, collection: &str, filter: &CombinedFilter) -> AdapterResult<u64> {
        self.count_matches(collection, filter)
    }
}

/// Returns every value at `path`, descending through arrays of objects and
/// flattening a terminal array.
fn lookup<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];

    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => {
                    next.extend(items.iter().filter_map(|item| item.get(segment)));
                }
                _ => {}
            }
        }
        current = next;
    }

    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}

/// Compares a stored value with a raw parameter string.
fn scalar_equals(value: &Value, raw: &str) -> bool {
    match value {
        Value::String(s) => s == raw,
        Value::Number(n) => {
            n.to_string() == raw
                || matches!(
                    (n.as_f64(), raw.trim().parse::<f64>()),
                    (Some(a), Ok(b)) if a == b
                )
        }
        Value::Bool(b) => raw.parse::<bool>() == Ok(*b),
        Value::Null => raw == "null",
        _ => false,
    }
}

fn condition_matches(document: &Value, condition: &Condition) -> bool {
    let candidates = lookup(document, condition.field());
    match condition {
        Condition::Equals { value, .. } => candidates.iter().any(|v| scalar_equals(v, value)),
        Condition::AnyOf { values, .. } => candidates
            .iter()
            .any(|v| values.iter().any(|raw| scalar_equals(v, raw))),
        Condition::Contains { term, .. } => {
            let needle = term.to_lowercase();
            candidates.iter().any(|v| {
                v.as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
        }
    }
}

fn matches_filter(document: &Value, filter: &CombinedFilter) -> bool {
    filter.all.iter().all(|c| condition_matches(document, c))
        && (filter.any.is_empty() || filter.any.iter().any(|c| condition_matches(document, c)))
}

/// Type order used when values of different kinds are compared.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = lookup(a, &key.field).into_iter().next();
        let right = lookup(b, &key.field).into_iter().next();
        let ordering = match key.direction {
            SortDirection::Asc => compare_values(left, right),
            SortDirection::Desc => compare_values(left, right).reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(document: &Value, projection: &ProjectionStage, id_field: &str) -> Value {
    let Value::Object(map) = document else {
        return document.clone();
    };

    match projection {
        ProjectionStage::Include(fields) => {
            let mut out = Map::new();
            if let Some(id) = map.get(id_field) {
                out.insert(id_field.to_string(), id.clone());
            }
            for field in fields {
                copy_path(map, &mut out, field);
            }
            Value::Object(out)
        }
        ProjectionStage::Exclude(fields) => {
            let mut out = map.clone();
            for field in fields {
                remove_path(&mut out, field);
            }
            Value::Object(out)
        }
    }
}

fn copy_path(source: &Map<String, Value>, target: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = source.get(head) {
                let entry = target
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(target_child) = entry {
                    copy_path(child, target_child, rest);
                }
            }
        }
    }
}

fn remove_path(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            map.shift_remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}
