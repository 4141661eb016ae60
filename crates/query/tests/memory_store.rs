//! End-to-end tests running plans through the in-memory adapter.

mod common;

use std::sync::Arc;

use serde_json::{Value, json};

use common::fixtures::{DEPARTMENTS, STUDENTS, seeded_store};
use helios_query::{
    AdapterError, EngineConfig, ExpansionRequest, MemoryStore, ParameterBag, PlanRequest,
    QueryEngine, QueryError, StorageAdapter, build_plan,
};

fn ids(documents: &[Value]) -> Vec<&str> {
    documents
        .iter()
        .map(|doc| doc["_id"].as_str().unwrap_or_default())
        .collect()
}

fn request(pairs: &[(&str, &str)]) -> PlanRequest {
    PlanRequest::new(ParameterBag::from_pairs(pairs.iter().copied()))
        .searchable(["email", "name.firstName", "presentAddress"])
}

// ============================================================================
// Search and Filter
// ============================================================================

#[tokio::test]
async fn test_search_is_case_insensitive_substring() {
    let store = seeded_store();
    let engine = QueryEngine::default();

    let outcome = engine
        .execute(&store, STUDENTS, &request(&[("searchTerm", "JOHN")]), true)
        .await
        .unwrap();

    assert_eq!(ids(&outcome.documents), vec!["s2", "s1"]);
    assert_eq!(outcome.meta.total, Some(2));
    assert!(outcome.documents.iter().all(|doc| doc.get("__version").is_none()));
}

#[tokio::test]
async fn test_search_and_filter_combined() {
    let store = seeded_store();
    let request = request(&[
        ("searchTerm", "john"),
        ("age", "23"),
        ("sort", "name.firstName,-age"),
        ("fields", "name,email"),
    ]);

    let outcome = QueryEngine::default()
        .execute(&store, STUDENTS, &request, false)
        .await
        .unwrap();

    assert_eq!(
        outcome.documents,
        vec![json!({
            "_id": "s1",
            "name": {"firstName": "John", "lastName": "Doe"},
            "email": "john@university.edu"
        })]
    );
    assert_eq!(outcome.meta.total, None);
    assert_eq!(outcome.meta.total_pages, None);
}

#[tokio::test]
async fn test_repeated_filter_key_matches_any() {
    let store = seeded_store();
    let request = request(&[
        ("gender", "female"),
        ("age", "23"),
        ("age", "24"),
        ("sort", "age"),
    ]);

    let outcome = QueryEngine::default()
        .execute(&store, STUDENTS, &request, true)
        .await
        .unwrap();

    assert_eq!(ids(&outcome.documents), vec!["s3", "s5"]);
}

#[tokio::test]
async fn test_unmatched_filter_returns_nothing() {
    let store = seeded_store();
    let outcome = QueryEngine::default()
        .execute(&store, STUDENTS, &request(&[("gender", "other")]), true)
        .await
        .unwrap();

    assert!(outcome.documents.is_empty());
    assert_eq!(outcome.meta.total, Some(0));
    assert_eq!(outcome.meta.total_pages, Some(0));
}

// ============================================================================
// Sort and Pagination
// ============================================================================

#[tokio::test]
async fn test_multi_key_sort() {
    let store = seeded_store();
    let outcome = QueryEngine::default()
        .execute(
            &store,
            STUDENTS,
            &request(&[("sort", "-age,name.firstName")]),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        ids(&outcome.documents),
        vec!["s5", "s3", "s6", "s1", "s4", "s2", "s7"]
    );
}

#[tokio::test]
async fn test_pagination_with_totals() {
    let store = seeded_store();
    let engine = QueryEngine::default();

    let outcome = engine
        .execute(&store, STUDENTS, &request(&[("page", "2"), ("limit", "3")]), true)
        .await
        .unwrap();
    assert_eq!(ids(&outcome.documents), vec!["s4", "s3", "s2"]);
    assert_eq!(outcome.meta.page, 2);
    assert_eq!(outcome.meta.limit, 3);
    assert_eq!(outcome.meta.total, Some(7));
    assert_eq!(outcome.meta.total_pages, Some(3));

    let beyond = engine
        .execute(&store, STUDENTS, &request(&[("page", "9"), ("limit", "3")]), true)
        .await
        .unwrap();
    assert!(beyond.documents.is_empty());
    assert_eq!(beyond.meta.total, Some(7));
}

#[tokio::test]
async fn test_max_limit_is_applied() {
    let store = seeded_store();
    let engine = QueryEngine::new(EngineConfig {
        max_limit: Some(2),
        ..Default::default()
    });

    let outcome = engine
        .execute(&store, STUDENTS, &request(&[("limit", "100")]), false)
        .await
        .unwrap();
    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.meta.limit, 2);
}

// ============================================================================
// Projection
// ============================================================================

#[tokio::test]
async fn test_explicit_exclusion_replaces_default() {
    let store = seeded_store();
    let outcome = QueryEngine::default()
        .execute(
            &store,
            STUDENTS,
            &request(&[("_id", "s1"), ("fields", "-email,-presentAddress")]),
            false,
        )
        .await
        .unwrap();

    let doc = &outcome.documents[0];
    assert!(doc.get("email").is_none());
    assert!(doc.get("presentAddress").is_none());
    assert_eq!(doc["__version"], json!(0));
}

// ============================================================================
// Expansion
// ============================================================================

#[tokio::test]
async fn test_nested_expansion_with_selection() {
    let store = seeded_store();
    let request = request(&[("_id", "s1")])
        .allow_expansions(["academicDepartment", "academicDepartment.academicFaculty"])
        .expand(ExpansionRequest::with_select(
            "academicDepartment.academicFaculty",
            "name",
        ));

    let outcome = QueryEngine::default()
        .execute(&store, STUDENTS, &request, false)
        .await
        .unwrap();

    assert_eq!(
        outcome.documents[0]["academicDepartment"],
        json!({
            "_id": "d1",
            "name": "Computer Science",
            "code": "CSE",
            "academicFaculty": {"_id": "f1", "name": "Engineering"}
        })
    );
}

#[tokio::test]
async fn test_expansion_of_dangling_and_absent_references() {
    let store = seeded_store();
    let request = request(&[("sort", "createdAt")])
        .allow_expansions(["academicDepartment"])
        .expand("academicDepartment");

    let outcome = QueryEngine::default()
        .execute(&store, STUDENTS, &request, false)
        .await
        .unwrap();

    let bob = &outcome.documents[3];
    assert_eq!(bob["_id"], json!("s4"));
    assert!(bob.get("academicDepartment").is_none());

    let eve = &outcome.documents[6];
    assert_eq!(eve["_id"], json!("s7"));
    assert_eq!(eve["academicDepartment"], Value::Null);
}

#[tokio::test]
async fn test_expansion_without_relation_fails() {
    let store = MemoryStore::new();
    store.insert("students", json!({"_id": "s1", "mentor": "s2", "createdAt": 1}));

    let request = PlanRequest::default()
        .allow_expansions(["mentor"])
        .expand("mentor");
    let err = QueryEngine::default()
        .execute(&store, "students", &request, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::Execution(AdapterError::UnresolvableRelation { ref relation }) if relation == "mentor"
    ));
}

// ============================================================================
// Adapter Errors
// ============================================================================

#[tokio::test]
async fn test_unknown_field_in_declared_schema() {
    let store = seeded_store();
    store.declare_fields(
        STUDENTS,
        ["name", "email", "age", "gender", "presentAddress", "createdAt"],
    );
    let engine = QueryEngine::default();

    let ok = engine
        .execute(&store, STUDENTS, &request(&[("sort", "name.firstName")]), false)
        .await;
    assert!(ok.is_ok());

    let err = engine
        .execute(&store, STUDENTS, &request(&[("sort", "nickname")]), false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution(AdapterError::UnknownField { ref stage, .. }) if stage == "sort"
    ));
    assert!(!err.is_retryable());

    let err = engine
        .execute(&store, STUDENTS, &request(&[("fields", "name,nickname")]), false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution(AdapterError::UnknownField { ref stage, .. }) if stage == "projection"
    ));
}

#[tokio::test]
async fn test_unknown_collection() {
    let store = seeded_store();
    let err = QueryEngine::default()
        .execute(&store, "courses", &PlanRequest::default(), true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Execution(AdapterError::UnknownCollection { .. })
    ));
}

#[tokio::test]
async fn test_unavailable_store_is_retryable() {
    let store = seeded_store();
    store.set_available(false);

    let err = QueryEngine::default()
        .execute(&store, STUDENTS, &PlanRequest::default(), false)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    store.set_available(true);
    assert!(
        QueryEngine::default()
            .execute(&store, STUDENTS, &PlanRequest::default(), false)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_configuration_error_precedes_store_access() {
    let store = seeded_store();
    store.set_available(false);

    let request = PlanRequest::new(ParameterBag::from_pairs([("fields", "name,-email")]));
    let err = QueryEngine::default()
        .execute(&store, STUDENTS, &request, false)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Configuration(_)));
}

// ============================================================================
// Adapter Seam
// ============================================================================

#[tokio::test]
async fn test_trait_object_adapter() {
    let store: Arc<dyn StorageAdapter> = Arc::new(seeded_store());
    let plan = build_plan(&PlanRequest::default()).unwrap();

    assert_eq!(store.adapter_name(), "memory");
    let documents = store.execute(DEPARTMENTS, &plan).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(store.count(DEPARTMENTS, plan.filter()).await.unwrap(), 2);

    let outcome = QueryEngine::default()
        .execute_plan(store.as_ref(), DEPARTMENTS, &plan, true)
        .await
        .unwrap();
    assert_eq!(outcome.meta.total_pages, Some(1));
}

#[tokio::test]
async fn test_concurrent_requests() {
    let store = Arc::new(seeded_store());
    let engine = Arc::new(QueryEngine::default());

    let mut handles = Vec::new();
    for page in 1..=4u64 {
        let store = Arc::clone(&store);
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let request = PlanRequest::new(ParameterBag::from_pairs([
                ("page", page.to_string()),
                ("limit", "2".to_string()),
            ]));
            engine
                .execute(store.as_ref(), STUDENTS, &request, true)
                .await
                .map(|outcome| outcome.documents.len())
        }));
    }

    let mut sizes = Vec::new();
    for handle in handles {
        sizes.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(sizes, vec![2, 2, 2, 1]);
}
