//! Query execution.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::{CatalogStore, Query, QueryResponse, ScoredRecord, SortBy, SortKey};
use crate::backend::{SearchRequest, SortClause, DISTANCE_FIELD, SCORE_FIELD};
use crate::error::{Error, Result};
use crate::metacard::{AttributeFormat, EFFECTIVE};
use crate::translate::{DistanceOrigin, FilterTranslator, TranslatorOptions};

/// Sort function measuring distance from `pt` along `sfield`.
const GEODIST: &str = "geodist()";

impl CatalogStore {
    /// Runs a query.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` for a start index below 1 or a malformed
    ///   filter, before anything is sent to the index
    /// - `UnresolvableAttribute` when the sort attribute has no field
    /// - `QueryFailed` when the index rejects or fails the query
    pub fn query(&self, query: &Query) -> Result<QueryResponse> {
        if query.start_index < 1 {
            return Err(Error::unsupported(format!(
                "Query start index must be 1 or greater, got {}",
                query.start_index
            )));
        }

        let sort_by_distance = matches!(
            query.sort,
            Some(SortBy {
                key: SortKey::Distance,
                ..
            })
        );
        let translator = FilterTranslator::new(
            Arc::clone(&self.resolver),
            TranslatorOptions {
                xpath_enabled: self.config.xpath_enabled,
                sort_by_distance,
            },
        );
        let fragment = translator.translate(&query.filter)?;

        let mut request = SearchRequest::new(fragment.text);
        request.start = usize::try_from(query.start_index - 1).map_err(|_| {
            Error::unsupported(format!("Start index {} is too large", query.start_index))
        })?;
        request.rows = if query.page_size <= 0 {
            self.config.max_rows
        } else {
            usize::try_from(query.page_size).map_or(self.config.max_rows, |rows| {
                rows.min(self.config.max_rows)
            })
        };

        let wants_distance = match &fragment.distance_origin {
            Some(origin) => self.apply_distance(&mut request, origin, sort_by_distance)?,
            None => false,
        };
        let wants_relevance = self.apply_sort(&mut request, query.sort.as_ref(), wants_distance)?;

        debug!(
            query = %request.query,
            start = request.start,
            rows = request.rows,
            sort = ?request.sort,
            "Executing catalog query"
        );
        let response = self
            .client
            .search(&request)
            .map_err(|e| Error::query_backend(format!("{e} (query: {})", request.query), e))?;

        let results = response
            .documents
            .iter()
            .map(|doc| {
                let record = self.decode_record(doc).map_err(|e| {
                    Error::query_failed(format!("Cannot determine record type of document: {e}"))
                })?;
                let relevance = wants_relevance
                    .then(|| doc.first(SCORE_FIELD).and_then(JsonValue::as_f64))
                    .flatten();
                let distance_meters = wants_distance
                    .then(|| doc.first(DISTANCE_FIELD).and_then(JsonValue::as_f64))
                    .flatten()
                    .map(|km| km * 1000.0);
                Ok(ScoredRecord {
                    record,
                    relevance,
                    distance_meters,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let total_hits = if query.requests_total_count {
            response.num_found
        } else {
            results.len() as u64
        };
        debug!(hits = results.len(), total_hits, "Catalog query complete");

        Ok(QueryResponse {
            results,
            total_hits,
        })
    }

    /// Requests the distance pseudo-field for a filter with a reference
    /// point. Returns false when the geometry attribute has no sort field
    /// and the caller did not ask to sort by distance.
    fn apply_distance(
        &self,
        request: &mut SearchRequest,
        origin: &DistanceOrigin,
        required: bool,
    ) -> Result<bool> {
        let Some(field) = self
            .resolver
            .resolve_anonymous_fields(&origin.attribute)
            .into_iter()
            .next()
        else {
            if required {
                return Err(Error::UnresolvableAttribute(origin.attribute.clone()));
            }
            warn!(attribute = %origin.attribute, "No sort field for geometry attribute; distances omitted");
            return Ok(false);
        };

        request
            .params
            .insert("sfield".to_string(), self.resolver.sort_key(&field));
        request
            .params
            .insert("pt".to_string(), format!("{},{}", origin.lat, origin.lon));
        request.fields.push(format!("{DISTANCE_FIELD}:{GEODIST}"));
        Ok(true)
    }

    /// Adds the sort clause. Returns true when sorting by relevance.
    fn apply_sort(
        &self,
        request: &mut SearchRequest,
        sort: Option<&SortBy>,
        has_distance: bool,
    ) -> Result<bool> {
        let Some(sort) = sort else {
            return Ok(false);
        };

        let field = match &sort.key {
            SortKey::Relevance => {
                request.fields.push(SCORE_FIELD.to_string());
                SCORE_FIELD.to_string()
            }
            SortKey::Distance => {
                if !has_distance {
                    warn!("Distance sort requested without a spatial filter; results unsorted");
                    return Ok(false);
                }
                GEODIST.to_string()
            }
            SortKey::Temporal => {
                let field = self
                    .resolver
                    .resolve_field(EFFECTIVE, AttributeFormat::Date, true)
                    .ok_or_else(|| Error::UnresolvableAttribute(EFFECTIVE.to_string()))?;
                self.resolver.sort_key(&field)
            }
            SortKey::Attribute(name) => {
                let field = self
                    .resolver
                    .resolve_anonymous_fields(name)
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::UnresolvableAttribute(name.clone()))?;
                self.resolver.sort_key(&field)
            }
        };

        request.sort.push(SortClause {
            field,
            order: sort.order,
        });
        Ok(sort.key == SortKey::Relevance)
    }
}
