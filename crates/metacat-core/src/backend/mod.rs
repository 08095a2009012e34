//! Backend index client abstraction.
//!
//! The store talks to the index only through [`IndexClient`]. Calls are
//! blocking; thread-safety of a shared client is the implementation's
//! responsibility.
//!
//! # Public Types
//!
//! - [`IndexClient`]: client trait
//! - [`IndexDocument`]: field name to values, as stored in the index
//! - [`SearchRequest`], [`SearchResponse`]: query round trip
//! - [`SolrHttpClient`]: blocking HTTP client (`http` feature)

#[cfg(feature = "http")]
mod http;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[cfg(feature = "http")]
pub use http::SolrHttpClient;

/// Pseudo-field carrying the relevance score of a hit.
pub const SCORE_FIELD: &str = "score";

/// Pseudo-field carrying the distance (km) of a hit from the sort point.
pub const DISTANCE_FIELD: &str = "_distance_";

/// Failures reported by an index client.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The index could not parse the request.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The index failed while executing the request.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP-like status code.
        status: u16,
        /// Error body.
        message: String,
    },

    /// The request never reached the index or the response was unreadable.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    /// Native spelling of the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// One sort criterion of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    /// Physical field or function to sort on.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// When written documents become visible to searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Visible immediately, no durable flush.
    Soft,
    /// Visible and flushed to stable storage.
    Hard,
}

/// A document as stored in the index: physical field name to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDocument {
    fields: BTreeMap<String, Vec<JsonValue>>,
}

impl IndexDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to a field.
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<JsonValue>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(value.into());
    }

    /// Builder form of [`IndexDocument::add`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.add(field, value);
        self
    }

    /// Returns all values of a field.
    #[must_use]
    pub fn values(&self, field: &str) -> Option<&[JsonValue]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Returns the first value of a field.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)?.first()
    }

    /// Iterates over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[JsonValue])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the document as a JSON object. Single values are written as
    /// scalars, multiple values as arrays.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(k, v)| {
                let value = if v.len() == 1 {
                    v[0].clone()
                } else {
                    JsonValue::Array(v.clone())
                };
                (k.clone(), value)
            })
            .collect();
        JsonValue::Object(map)
    }

    /// Reads a document from a JSON object. Arrays become multi-valued
    /// fields.
    #[must_use]
    pub fn from_json(object: &Map<String, JsonValue>) -> Self {
        let fields = object
            .iter()
            .map(|(k, v)| {
                let values = match v {
                    JsonValue::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                (k.clone(), values)
            })
            .collect();
        Self { fields }
    }
}

/// A compiled search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Native query text.
    pub query: String,
    /// Zero-based offset of the first hit.
    pub start: usize,
    /// Maximum hits to return.
    pub rows: usize,
    /// Sort criteria, most significant first.
    pub sort: Vec<SortClause>,
    /// Fields (and pseudo-fields) to return.
    pub fields: Vec<String>,
    /// Extra request parameters (e.g. `sfield`, `pt`).
    pub params: BTreeMap<String, String>,
}

impl SearchRequest {
    /// Creates a request returning the first ten hits with all fields.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            start: 0,
            rows: 10,
            sort: Vec::new(),
            fields: vec!["*".to_string()],
            params: BTreeMap::new(),
        }
    }
}

/// Hits of a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Total matches, independent of paging.
    pub num_found: u64,
    /// Documents of the requested page.
    pub documents: Vec<IndexDocument>,
}

/// Blocking client for the backend index.
pub trait IndexClient: Send + Sync {
    /// Executes a search.
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;

    /// Writes documents as one batch, replacing documents with the same key.
    fn add(&self, documents: Vec<IndexDocument>) -> Result<(), BackendError>;

    /// Removes documents by unique key.
    fn delete_by_ids(&self, ids: &[String]) -> Result<(), BackendError>;

    /// Commits pending writes.
    fn commit(&self, mode: CommitMode) -> Result<(), BackendError>;

    /// Lightweight liveness check.
    fn ping(&self) -> Result<(), BackendError>;
}
