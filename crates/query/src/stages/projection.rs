//! Projection (field selection) stage.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::params::{FIELDS, ParameterBag};

/// Which fields of each document are returned.
///
/// Inclusion and exclusion never mix within one projection. An inclusion
/// projection always keeps the document identifier, which is therefore not
/// listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "fields", rename_all = "camelCase")]
pub enum ProjectionStage {
    /// Return only these fields (plus the identifier).
    Include(Vec<String>),
    /// Return everything except these fields.
    Exclude(Vec<String>),
}

impl ProjectionStage {
    /// Builds the stage from the comma-separated `fields` parameter.
    ///
    /// Without usable entries the stage excludes the configured internal
    /// version field.
    pub fn build(bag: &ParameterBag, config: &EngineConfig) -> Result<Self, ConfigurationError> {
        let entries = bag.as_string_list(FIELDS, ',').unwrap_or_default();
        let raw = bag.values(FIELDS).join(",");

        let stage = match Self::from_entries(&entries, &raw)? {
            Some(stage) => stage,
            None => Self::default_for(config),
        };

        debug!(projection = %stage, "built projection stage");
        Ok(stage)
    }

    /// Parses a standalone selection such as `"name email"` or `"-password"`.
    ///
    /// Entries may be separated by commas or whitespace. Returns `Ok(None)`
    /// when the selection names no field.
    pub fn parse(selection: &str) -> Result<Option<Self>, ConfigurationError> {
        let entries: Vec<String> = selection
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect();
        Self::from_entries(&entries, selection)
    }

    fn from_entries(entries: &[String], raw: &str) -> Result<Option<Self>, ConfigurationError> {
        let mut included: Vec<String> = Vec::new();
        let mut excluded: Vec<String> = Vec::new();

        for entry in entries {
            let (target, field) = match entry.strip_prefix('-') {
                Some(stripped) => (&mut excluded, stripped.trim()),
                None => (&mut included, entry.trim()),
            };
            if !field.is_empty() && !target.iter().any(|f| f == field) {
                target.push(field.to_string());
            }
        }

        match (included.is_empty(), excluded.is_empty()) {
            (true, true) => Ok(None),
            (false, true) => Ok(Some(ProjectionStage::Include(included))),
            (true, false) => Ok(Some(ProjectionStage::Exclude(excluded))),
            (false, false) => Err(ConfigurationError::MixedProjection {
                fields: raw.to_string(),
            }),
        }
    }

    /// The default projection: hide the internal version field.
    pub fn default_for(config: &EngineConfig) -> Self {
        ProjectionStage::Exclude(vec![config.version_field.clone()])
    }

    /// Returns the listed fields.
    pub fn fields(&self) -> &[String] {
        match self {
            ProjectionStage::Include(fields) | ProjectionStage::Exclude(fields) => fields,
        }
    }

    /// Returns true for an inclusion projection.
    pub fn is_include(&self) -> bool {
        matches!(self, ProjectionStage::Include(_))
    }
}

impl fmt::Display for ProjectionStage {
    /// Formats the projection in selection syntax, e.g. `name email` or `-__version`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_include() { "" } else { "-" };
        let parts: Vec<String> = self
            .fields()
            .iter()
            .map(|field| format!("{prefix}{field}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
