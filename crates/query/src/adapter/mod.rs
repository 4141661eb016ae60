//! Storage adapter seam.
//!
//! The engine never talks to a store. A [`StorageAdapter`] receives an
//! [`ExecutionPlan`] and must apply it in order:
//!
//! 1. the combined filter,
//! 2. the sort keys,
//! 3. skip and limit,
//! 4. the projection,
//! 5. the expansion tree.
//!
//! Sibling expansions are independent and may be resolved in any order.
//! Errors the adapter raises reach the caller unchanged.
//!
//! [`MemoryStore`] is an in-memory adapter over JSON documents. For stores
//! with a MongoDB-style query language, [`DocumentQuery`](crate::render::DocumentQuery)
//! renders a plan into that language.

mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AdapterResult;
use crate::plan::{CombinedFilter, ExecutionPlan};

pub use memory::MemoryStore;

/// Executes plans against one concrete store.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use helios_query::adapter::StorageAdapter;
///
/// struct MyStore;
///
/// #[async_trait]
/// impl StorageAdapter for MyStore {
///     fn adapter_name(&self) -> &'static str {
///         "my-store"
///     }
///
///     async fn execute(&self, collection: &str, plan: &ExecutionPlan) -> AdapterResult<Vec<Value>> {
///         // Translate and run the plan...
///         todo!()
///     }
///
///     async fn count(&self, collection: &str, filter: &CombinedFilter) -> AdapterResult<u64> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Returns a short name for this adapter, used in logs and errors.
    fn adapter_name(&self) -> &'static str;

    /// Runs `plan` against `collection` and returns the page of documents.
    ///
    /// # Errors
    ///
    /// Any [`AdapterError`](crate::AdapterError), e.g. an unknown field in the
    /// sort or projection, or an unreachable store.
    async fn execute(&self, collection: &str, plan: &ExecutionPlan) -> AdapterResult<Vec<Value>>;

    /// Counts the documents of `collection` matching `filter`, ignoring
    /// pagination.
    async fn count(&self, collection: &str, filter: &CombinedFilter) -> AdapterResult<u64>;
}
