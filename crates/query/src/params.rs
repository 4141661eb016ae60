//! Request parameter bag.
//!
//! [`ParameterBag`] is a read-only view over the flat parameter map of one
//! request. It converts raw strings into typed primitives but never
//! interprets what a parameter means; that is left to the stage builders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-text search term.
pub const SEARCH_TERM: &str = "searchTerm";
/// Comma-separated sort keys.
pub const SORT: &str = "sort";
/// One-based page number.
pub const PAGE: &str = "page";
/// Page size.
pub const LIMIT: &str = "limit";
/// Comma-separated field selection.
pub const FIELDS: &str = "fields";

/// Keys that control query shape and are never treated as filters.
pub const RESERVED_KEYS: [&str; 5] = [SEARCH_TERM, SORT, PAGE, LIMIT, FIELDS];

/// Returns true if `key` is one of the [`RESERVED_KEYS`].
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// The raw parameters of a single request.
///
/// Keys are unique. A key supplied more than once keeps every value in the
/// order given.
///
/// # Example
///
/// ```
/// use helios_query::ParameterBag;
///
/// let bag = ParameterBag::from_pairs([("page", "2"), ("sort", "-age,name")]);
///
/// assert_eq!(bag.as_number("page"), Some(2));
/// assert_eq!(bag.as_number("limit"), None);
/// assert_eq!(
///     bag.as_string_list("sort", ','),
///     Some(vec!["-age".to_string(), "name".to_string()])
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBag {
    params: BTreeMap<String, Vec<String>>,
}

impl ParameterBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag from `(key, value)` pairs. Repeated keys accumulate.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut bag = Self::new();
        for (key, value) in pairs {
            bag.push(key, value);
        }
        bag
    }

    /// Creates a bag from a map of keys to value lists.
    ///
    /// Keys with no values are dropped.
    pub fn from_multi_map<I, K>(map: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let params = map
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| (key.into(), values))
            .collect();
        Self { params }
    }

    /// Parses a URL query string such as `searchTerm=john&page=2`.
    ///
    /// A leading `?` is ignored, values are percent-decoded, and `+` decodes
    /// to a space.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the first value of `key` as a string.
    pub fn as_string(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the first value of `key` parsed as an integer.
    ///
    /// Absent keys and values that are not integers both yield `None`.
    pub fn as_number(&self, key: &str) -> Option<i64> {
        self.as_string(key)
            .and_then(|value| value.trim().parse::<i64>().ok())
    }

    /// Splits every value of `key` on `separator`.
    ///
    /// Entries are trimmed and empty entries are dropped. Returns `None`
    /// when the key is absent; a present key with only blank entries yields
    /// an empty list.
    pub fn as_string_list(&self, key: &str, separator: char) -> Option<Vec<String>> {
        self.params.get(key).map(|values| {
            values
                .iter()
                .flat_map(|value| value.split(separator))
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect()
        })
    }

    /// Returns every value supplied for `key`.
    pub fn values(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks if a parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Returns an iterator over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if the bag holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}
