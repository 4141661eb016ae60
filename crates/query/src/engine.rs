//! The query engine.
//!
//! [`QueryEngine`] turns a [`PlanRequest`] into an [`ExecutionPlan`] and can
//! optionally hand that plan to a [`StorageAdapter`]. Plan construction is
//! synchronous and side-effect free; the engine holds nothing but its
//! configuration, so one engine may serve any number of concurrent requests.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::adapter::StorageAdapter;
use crate::config::EngineConfig;
use crate::error::{ConfigurationError, PlanWarning, QueryResult};
use crate::expansion::{ExpansionNode, ExpansionRequest, ExpansionResolver};
use crate::params::{ParameterBag, is_reserved};
use crate::plan::ExecutionPlan;
use crate::stages::{FilterStage, PaginationStage, ProjectionStage, SearchStage, SortStage};

/// Everything the engine needs to build one plan.
///
/// # Example
///
/// ```
/// use helios_query::{ParameterBag, PlanRequest};
///
/// let request = PlanRequest::new(ParameterBag::from_query_string("searchTerm=john&page=2"))
///     .searchable(["email", "name.firstName"])
///     .allow_expansions(["academicDepartment", "academicDepartment.academicFaculty"])
///     .expand("academicDepartment.academicFaculty");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    /// The raw request parameters.
    pub params: ParameterBag,
    /// Fields `searchTerm` may match.
    pub searchable_fields: Vec<String>,
    /// Fields that may be filtered on. `None` accepts every non-reserved key.
    pub filterable_fields: Option<Vec<String>>,
    /// Expansion paths the caller permits.
    pub allowed_expansions: Vec<String>,
    /// Expansion paths requested for this call.
    pub expansions: Vec<ExpansionRequest>,
}

impl PlanRequest {
    /// Creates a request with no searchable fields and no expansions.
    pub fn new(params: ParameterBag) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Sets the searchable-field whitelist.
    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts filters to the given fields. Other keys are dropped.
    pub fn filterable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the expansion whitelist.
    pub fn allow_expansions<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_expansions = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Requests an expansion.
    pub fn expand(mut self, expansion: impl Into<ExpansionRequest>) -> Self {
        self.expansions.push(expansion.into());
        self
    }
}

/// Pagination metadata for a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// One-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Total matches regardless of pagination, if counted.
    pub total: Option<u64>,
    /// Number of pages needed for `total`, if counted.
    pub total_pages: Option<u64>,
}

/// The documents of one page plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    /// Matching documents in plan order.
    pub documents: Vec<Value>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Builds execution plans from request parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    config: EngineConfig,
}

impl QueryEngine {
    /// Creates an engine with the given configuration.
    ///
    /// The configuration is not validated; see [`QueryEngine::try_new`].
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns every validation message when the configuration is invalid,
    /// e.g. when the expansion parameter shadows a reserved key.
    pub fn try_new(config: EngineConfig) -> Result<Self, Vec<String>> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds a plan for `request`.
    ///
    /// Stages are emitted in canonical order. Building the same request twice
    /// yields equal plans.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for a disallowed, malformed, or
    /// too-deep expansion, a mixed projection, or (in strict mode) a search
    /// term with no searchable fields. No partial plan is produced.
    #[instrument(level = "debug", skip_all, fields(params = request.params.len()))]
    pub fn build_plan(&self, request: &PlanRequest) -> Result<ExecutionPlan, ConfigurationError> {
        let bag = &request.params;

        let search = SearchStage::build(bag, &request.searchable_fields);
        if self.config.strict_search
            && let Some(PlanWarning::EmptySearchWhitelist { term }) = search.warning()
        {
            return Err(ConfigurationError::EmptySearchWhitelist { term });
        }

        let projection = ProjectionStage::build(bag, &self.config)?;
        let expansions = self.resolve_expansions(request)?;
        let mut filter = FilterStage::build(bag, &self.config);
        if let Some(allowed) = &request.filterable_fields {
            filter = filter.restrict(allowed);
        }
        let sort = SortStage::build(bag, &self.config);
        let pagination = PaginationStage::build(bag, &self.config);

        let plan =
            ExecutionPlan::assemble(&search, &filter, sort, pagination, projection, expansions);
        debug!(filter = %plan.filter(), projection = %plan.projection(), "built execution plan");
        Ok(plan)
    }

    fn resolve_expansions(
        &self,
        request: &PlanRequest,
    ) -> Result<Vec<ExpansionNode>, ConfigurationError> {
        let mut requested = request.expansions.clone();
        if let Some(param) = &self.config.expansion_param
            && !is_reserved(param)
            && let Some(paths) = request.params.as_string_list(param, ',')
        {
            requested.extend(paths.into_iter().map(ExpansionRequest::new));
        }

        ExpansionResolver::new(&request.allowed_expansions, self.config.max_expansion_depth)
            .resolve(&requested)
    }

    /// Builds a plan and runs it against `adapter`.
    ///
    /// When `with_total` is set the adapter is also asked for the number of
    /// matches ignoring pagination. Adapter errors are returned unchanged.
    pub async fn execute<A>(
        &self,
        adapter: &A,
        collection: &str,
        request: &PlanRequest,
        with_total: bool,
    ) -> QueryResult<QueryOutcome>
    where
        A: StorageAdapter + ?Sized,
    {
        let plan = self.build_plan(request)?;
        for warning in plan.warnings() {
            warn!(%warning, collection, "executing plan with warning");
        }
        self.execute_plan(adapter, collection, &plan, with_total)
            .await
    }

    /// Runs an already built plan against `adapter`.
    pub async fn execute_plan<A>(
        &self,
        adapter: &A,
        collection: &str,
        plan: &ExecutionPlan,
        with_total: bool,
    ) -> QueryResult<QueryOutcome>
    where
        A: StorageAdapter + ?Sized,
    {
        let documents = adapter.execute(collection, plan).await?;

        let total = if with_total {
            Some(adapter.count(collection, plan.filter()).await?)
        } else {
            None
        };

        let pagination = plan.pagination();
        debug!(
            adapter = adapter.adapter_name(),
            collection,
            returned = documents.len(),
            total = ?total,
            "executed plan"
        );

        Ok(QueryOutcome {
            documents,
            meta: PageMeta {
                page: pagination.page(),
                limit: pagination.limit(),
                total,
                total_pages: total.map(|t| pagination.total_pages(t)),
            },
        })
    }
}

/// Builds a plan with the default configuration.
///
/// Equivalent to `QueryEngine::default().build_plan(request)`.
pub fn build_plan(request: &PlanRequest) -> Result<ExecutionPlan, ConfigurationError> {
    QueryEngine::default().build_plan(request)
}
