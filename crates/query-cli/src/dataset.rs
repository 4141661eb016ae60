//! JSON data sets loaded into a [`MemoryStore`].
//!
//! ```json
//! {
//!   "collections": { "students": [ { "_id": "s1", "academicDepartment": "d1" } ],
//!                    "departments": [ { "_id": "d1", "name": "Physics" } ] },
//!   "relations": { "academicDepartment": "departments" },
//!   "schemas": { "students": ["name", "email"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use helios_query::MemoryStore;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Documents, relations and optional field declarations.
#[derive(Debug, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
    #[serde(default)]
    pub schemas: BTreeMap<String, Vec<String>>,
}

impl Dataset {
    /// Reads a data set from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read data set {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid data set {}", path.display()))
    }

    /// Parses a data set from JSON text.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Builds a store holding this data set.
    pub fn into_store(self, id_field: &str) -> MemoryStore {
        let store = MemoryStore::with_id_field(id_field);

        for (name, documents) in self.collections {
            info!(collection = %name, documents = documents.len(), "loading collection");
            store.create_collection(&name);
            store.insert_many(&name, documents);
        }
        for (field, target) in self.relations {
            store.relate(field, target);
        }
        for (name, fields) in self.schemas {
            store.declare_fields(&name, fields);
        }

        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_query::{PlanRequest, QueryEngine, StorageAdapter, build_plan};

    const SAMPLE: &str = r#"{
        "collections": {
            "students": [
                {"_id": "s1", "name": "Ada", "academicDepartment": "d1", "createdAt": 1},
                {"_id": "s2", "name": "Alan", "createdAt": 2}
            ],
            "departments": [{"_id": "d1", "name": "Mathematics"}],
            "empty": []
        },
        "relations": {"academicDepartment": "departments"}
    }"#;

    #[test]
    fn test_parse() {
        let dataset = Dataset::parse(SAMPLE).unwrap();
        assert_eq!(dataset.collections["students"].len(), 2);
        assert_eq!(dataset.relations["academicDepartment"], "departments");
        assert!(dataset.schemas.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(Dataset::parse("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_into_store() {
        let store = Dataset::parse(SAMPLE).unwrap().into_store("_id");

        let plan = build_plan(&PlanRequest::default()).unwrap();
        assert_eq!(store.count("empty", plan.filter()).await.unwrap(), 0);

        let request = PlanRequest::default()
            .allow_expansions(["academicDepartment"])
            .expand("academicDepartment");
        let outcome = QueryEngine::default()
            .execute(&store, "students", &request, true)
            .await
            .unwrap();

        assert_eq!(outcome.meta.total, Some(2));
        assert_eq!(outcome.documents[1]["academicDepartment"]["name"], "Mathematics");
    }
}
