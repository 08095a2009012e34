//! Storage operations: query, create, update, delete and a liveness probe.
//!
//! [`CatalogStore`] is the only type callers need. It compiles filters with
//! a [`FilterTranslator`](crate::translate::FilterTranslator), talks to the
//! index through an [`IndexClient`] and maps documents to records through a
//! [`SchemaResolver`].
//!
//! All calls block. The store holds no locks: concurrent updates of the same
//! key race and the last write wins.

mod ingest;
mod query;

#[cfg(test)]
mod store_tests;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{
    IndexClient, IndexDocument, SearchRequest, SortOrder, DISTANCE_FIELD, SCORE_FIELD,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::metacard::Record;
use crate::predicate::Predicate;
use crate::schema::SchemaResolver;
use crate::translate::escape_phrase;

/// What a query result is ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Index relevance score.
    Relevance,
    /// Distance from the filter's spatial reference point.
    Distance,
    /// Effective date.
    Temporal,
    /// Any other logical attribute.
    Attribute(String),
}

/// Sort key and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    /// What to sort on.
    pub key: SortKey,
    /// Direction.
    pub order: SortOrder,
}

/// A catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Filter tree.
    pub filter: Predicate,
    /// One-based index of the first result.
    pub start_index: i64,
    /// Maximum results; zero or negative means no limit.
    pub page_size: i64,
    /// Optional ordering.
    pub sort: Option<SortBy>,
    /// Report the total number of matches rather than the page length.
    pub requests_total_count: bool,
}

impl Query {
    /// First page of ten results, unsorted.
    #[must_use]
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            start_index: 1,
            page_size: 10,
            sort: None,
            requests_total_count: false,
        }
    }

    /// Sets the one-based start index.
    #[must_use]
    pub fn with_start_index(mut self, start_index: i64) -> Self {
        self.start_index = start_index;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some(SortBy { key, order });
        self
    }

    /// Asks for the total match count.
    #[must_use]
    pub fn with_total_count(mut self) -> Self {
        self.requests_total_count = true;
        self
    }
}

/// One query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    /// Decoded record.
    pub record: Record,
    /// Relevance score, when sorting by relevance.
    pub relevance: Option<f64>,
    /// Distance from the filter's reference point in meters, when the
    /// filter has one.
    pub distance_meters: Option<f64>,
}

/// Result of [`CatalogStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// Hits of the requested page.
    pub results: Vec<ScoredRecord>,
    /// Total matches if requested, otherwise the page length.
    pub total_hits: u64,
}

/// A stored record and the record that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Record before the update.
    pub old: Record,
    /// Record as written.
    pub new: Record,
}

/// Catalog storage over an index client.
#[derive(Clone)]
pub struct CatalogStore {
    client: Arc<dyn IndexClient>,
    resolver: Arc<dyn SchemaResolver>,
    config: StoreConfig,
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CatalogStore {
    /// Creates a store.
    #[must_use]
    pub fn new(
        client: Arc<dyn IndexClient>,
        resolver: Arc<dyn SchemaResolver>,
        config: StoreConfig,
    ) -> Self {
        Self {
            client,
            resolver,
            config,
        }
    }

    /// Creates a store talking to Solr over HTTP with the default resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::CatalogConfig) -> Result<Self> {
        config.validate()?;
        let client = crate::backend::SolrHttpClient::new(&config.solr)?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(crate::schema::SuffixSchemaResolver::new()),
            config.store.clone(),
        ))
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Lightweight liveness check. Never fails; any error reads as `false`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self.client.ping() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Index ping failed");
                false
            }
        }
    }

    /// Physical field used for key lookups: the first field the attribute
    /// resolves to.
    fn key_field(&self, attribute: &str) -> Result<String> {
        self.resolver
            .resolve_anonymous_fields(attribute)
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnresolvableAttribute(attribute.to_string()))
    }

    /// Fetches the records whose key attribute equals any of `values`.
    /// Returns the total match count and the decoded page.
    fn find_by_key(
        &self,
        attribute: &str,
        values: &[&str],
        rows: usize,
    ) -> Result<(u64, Vec<Record>)> {
        let field = self.key_field(attribute)?;
        let query = values
            .iter()
            .map(|v| format!("{field}:\"{}\"", escape_phrase(v)))
            .collect::<Vec<_>>()
            .join(" OR ");
        debug!(attribute, query = %query, "Looking up records by key");

        let mut request = SearchRequest::new(query);
        request.rows = rows;
        let response = self.client.search(&request).map_err(|e| {
            Error::ingest_backend(
                format!("Lookup of existing records by '{attribute}' failed: {e}"),
                e,
            )
        })?;

        let records = response
            .documents
            .iter()
            .map(|doc| {
                self.decode_record(doc).map_err(|e| {
                    Error::ingest_failed(format!(
                        "Cannot determine record type of stored record: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((response.num_found, records))
    }

    /// Rebuilds a record from a stored document, skipping private and
    /// undecodable fields.
    ///
    /// Fails only when the record type cannot be resolved. The resolver's
    /// error is returned as is for the caller to classify.
    fn decode_record(&self, document: &IndexDocument) -> Result<Record> {
        let record_type = self.resolver.resolve_record_type(document)?;
        let mut record = Record::new(record_type);
        record.source_id = Some(self.config.local_source_id.clone());

        for (field, values) in document.fields() {
            if field == SCORE_FIELD
                || field == DISTANCE_FIELD
                || self.resolver.is_private_field(field)
            {
                continue;
            }
            for raw in values {
                match self.resolver.decode_value(field, raw) {
                    Ok(Some((name, value))) => record.push_value(&name, value),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(field, error = %e, "Skipping undecodable field value");
                    }
                }
            }
        }
        Ok(record)
    }
}
