//! Helios Query CLI
//!
//! Builds an execution plan from `key=value` parameters and prints it as
//! JSON. With `--render` the MongoDB-style query is printed as well; with
//! `--data` and `--collection` the plan is run against an in-memory store.
//!
//! ```text
//! helios-query searchTerm=john age=23 sort=-age --searchable email,name.firstName --render
//! ```

mod dataset;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use helios_query::{
    DocumentQuery, EngineConfig, ExpansionRequest, ParameterBag, PlanRequest, QueryEngine,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use dataset::Dataset;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "helios-query")]
#[command(about = "Translate request parameters into a query execution plan")]
#[command(version)]
struct Cli {
    /// Request parameters as `key=value`. Keys may repeat.
    #[arg(value_name = "KEY=VALUE", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Raw query string, e.g. `searchTerm=john&page=2`. Merged with KEY=VALUE pairs.
    #[arg(long)]
    query: Option<String>,

    /// Fields `searchTerm` may match (comma-separated).
    #[arg(long, value_delimiter = ',')]
    searchable: Vec<String>,

    /// Fields that may be filtered on (comma-separated). All keys when omitted.
    #[arg(long, value_delimiter = ',')]
    filterable: Option<Vec<String>>,

    /// Whitelisted expansion paths (comma-separated).
    #[arg(long = "allow", value_delimiter = ',')]
    allowed_expansions: Vec<String>,

    /// Requested expansion as `path` or `path:select`. Repeatable.
    #[arg(long = "expand", value_parser = parse_expansion)]
    expansions: Vec<ExpansionRequest>,

    /// Also print the MongoDB-style rendering of the plan.
    #[arg(long)]
    render: bool,

    /// JSON data set to execute the plan against.
    #[arg(long, requires = "collection")]
    data: Option<PathBuf>,

    /// Collection to query in the data set.
    #[arg(long, requires = "data")]
    collection: Option<String>,

    /// Count all matches and report page totals.
    #[arg(long)]
    total: bool,

    #[command(flatten)]
    engine: EngineConfig,
}

impl Cli {
    fn plan_request(&self) -> PlanRequest {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(query) = &self.query {
            pairs.extend(ParameterBag::from_query_string(query).iter().flat_map(
                |(key, values)| values.iter().map(move |v| (key.to_string(), v.clone())),
            ));
        }
        pairs.extend(self.params.iter().cloned());

        let mut request = PlanRequest::new(ParameterBag::from_pairs(pairs))
            .searchable(self.searchable.iter().cloned())
            .allow_expansions(self.allowed_expansions.iter().cloned());
        if let Some(filterable) = &self.filterable {
            request = request.filterable(filterable.iter().cloned());
        }
        for expansion in &self.expansions {
            request = request.expand(expansion.clone());
        }
        request
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn parse_expansion(raw: &str) -> Result<ExpansionRequest, String> {
    match raw.split_once(':') {
        Some((path, select)) if !select.trim().is_empty() => {
            Ok(ExpansionRequest::with_select(path.trim(), select.trim()))
        }
        Some((path, _)) => Ok(ExpansionRequest::new(path.trim())),
        None => Ok(ExpansionRequest::new(raw.trim())),
    }
}

/// Initializes logging to stderr so that stdout carries only JSON.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("helios_query={},helios_query_cli={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<Value> {
    let engine = QueryEngine::try_new(cli.engine.clone())
        .map_err(|errors| anyhow::anyhow!("invalid configuration: {}", errors.join("; ")))?;
    let request = cli.plan_request();
    debug!(params = request.params.len(), "parsed request");

    let plan = engine
        .build_plan(&request)
        .context("failed to build execution plan")?;
    let mut output = json!({ "plan": plan });

    if cli.render {
        output["query"] = DocumentQuery::from_plan(&plan).to_json();
    }

    if let (Some(path), Some(collection)) = (&cli.data, &cli.collection) {
        let store = Dataset::load(path)?.into_store(&cli.engine.id_field);
        let outcome = engine
            .execute_plan(&store, collection, &plan, cli.total)
            .await
            .with_context(|| format!("failed to query collection '{}'", collection))?;
        info!(
            collection = %collection,
            returned = outcome.documents.len(),
            "query executed"
        );
        output["result"] = serde_json::to_value(&outcome)?;
    }

    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.engine.log_level);

    if let Err(errors) = cli.engine.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let output = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
