//! Relation expansion.
//!
//! Turns requested expansion paths such as
//! `academicDepartment.academicFaculty` into a tree of [`ExpansionNode`]s.
//! Every requested path, and each of its prefixes, must appear in the
//! caller's whitelist. A single disallowed path rejects the whole request.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::stages::ProjectionStage;

/// One requested expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionRequest {
    /// Dotted relation path, e.g. `academicDepartment.academicFaculty`.
    pub path: String,
    /// Optional field selection for the relation at the end of `path`.
    pub select: Option<String>,
}

impl ExpansionRequest {
    /// Requests an expansion without field selection.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: None,
        }
    }

    /// Requests an expansion restricted to `select` (e.g. `"name code"`).
    pub fn with_select(path: impl Into<String>, select: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: Some(select.into()),
        }
    }
}

impl From<&str> for ExpansionRequest {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ExpansionRequest {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// A relation to resolve, with its nested expansions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionNode {
    /// The relation field on the parent document.
    pub path: String,
    /// Expansions applied to the resolved document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExpansionNode>,
    /// Field selection applied to the resolved document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionStage>,
}

impl ExpansionNode {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            children: Vec::new(),
            projection: None,
        }
    }

    /// Returns the nested expansion for `path`, if any.
    pub fn child(&self, path: &str) -> Option<&ExpansionNode> {
        self.children.iter().find(|child| child.path == path)
    }

    /// Returns the number of levels in this subtree, including this node.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ExpansionNode::depth)
            .max()
            .unwrap_or(0)
    }
}

/// Validates requested paths against a whitelist and builds the expansion tree.
#[derive(Debug, Clone)]
pub struct ExpansionResolver<'a, S: AsRef<str>> {
    allowed: &'a [S],
    max_depth: usize,
}

impl<'a, S: AsRef<str>> ExpansionResolver<'a, S> {
    /// Creates a resolver over the `allowed` paths.
    pub fn new(allowed: &'a [S], max_depth: usize) -> Self {
        Self { allowed, max_depth }
    }

    fn is_allowed(&self, path: &str) -> bool {
        self.allowed.iter().any(|a| a.as_ref().trim() == path)
    }

    /// Resolves `requested` into top-level nodes, preserving request order.
    ///
    /// Requests sharing a prefix are merged into one subtree. Nothing is
    /// returned unless every request is valid.
    pub fn resolve(
        &self,
        requested: &[ExpansionRequest],
    ) -> Result<Vec<ExpansionNode>, ConfigurationError> {
        let mut validated = Vec::with_capacity(requested.len());
        for request in requested {
            let segments = self.validate(&request.path)?;
            let projection = match &request.select {
                Some(select) => ProjectionStage::parse(select)?,
                None => None,
            };
            validated.push((segments, projection));
        }

        let mut roots: Vec<ExpansionNode> = Vec::new();
        for (segments, projection) in validated {
            insert(&mut roots, &segments, projection);
        }

        debug!(expansions = roots.len(), "resolved expansion tree");
        Ok(roots)
    }

    fn validate<'p>(&self, path: &'p str) -> Result<Vec<&'p str>, ConfigurationError> {
        let trimmed = path.trim();
        let segments: Vec<&str> = trimmed.split('.').map(str::trim).collect();

        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigurationError::MalformedExpansion {
                path: path.to_string(),
            });
        }

        if segments.len() > self.max_depth {
            return Err(ConfigurationError::ExpansionTooDeep {
                path: trimmed.to_string(),
                depth: segments.len(),
                max_depth: self.max_depth,
            });
        }

        for end in 1..=segments.len() {
            let prefix = segments[..end].join(".");
            if !self.is_allowed(&prefix) {
                return Err(ConfigurationError::DisallowedExpansion {
                    path: trimmed.to_string(),
                    segment: prefix,
                });
            }
        }

        Ok(segments)
    }
}

fn insert(nodes: &mut Vec<ExpansionNode>, segments: &[&str], projection: Option<ProjectionStage>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    let index = match nodes.iter().position(|node| node.path == *head) {
        Some(index) => index,
        None => {
            nodes.push(ExpansionNode::new(head));
            nodes.len() - 1
        }
    };

    let node = &mut nodes[index];
    if rest.is_empty() {
        // Last selection for a path wins.
        if projection.is_some() {
            node.projection = projection;
        }
    } else {
        insert(&mut node.children, rest, projection);
    }
}
