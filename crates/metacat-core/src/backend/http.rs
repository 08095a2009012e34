//! Blocking Solr client over HTTP.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::{
    BackendError, CommitMode, IndexClient, IndexDocument, SearchRequest, SearchResponse,
};
use crate::config::SolrConfig;

/// [`IndexClient`] talking to one Solr core through its HTTP API.
#[derive(Debug, Clone)]
pub struct SolrHttpClient {
    core_url: String,
    client: Client,
}

impl SolrHttpClient {
    /// Creates a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Transport` if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(config: &SolrConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            core_url: build_core_url(&config.url, &config.core),
            client,
        })
    }

    /// Base URL of the core, without a trailing slash.
    #[must_use]
    pub fn core_url(&self) -> &str {
        &self.core_url
    }

    fn handler_url(&self, handler: &str) -> String {
        format!("{}/{handler}", self.core_url)
    }

    fn post_update(&self, body: &JsonValue, params: &[(&str, &str)]) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.handler_url("update"))
            .query(&[("wt", "json")])
            .query(params)
            .json(body)
            .send()
            .map_err(transport)?;
        check_status(response).map(|_| ())
    }
}

impl IndexClient for SolrHttpClient {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        debug!(query = %request.query, start = request.start, rows = request.rows, "Solr select");
        let response = self
            .client
            .post(self.handler_url("select"))
            .form(&select_params(request))
            .send()
            .map_err(transport)?;
        let body: JsonValue = check_status(response)?.json().map_err(transport)?;
        parse_select(&body)
    }

    fn add(&self, documents: Vec<IndexDocument>) -> Result<(), BackendError> {
        let body = JsonValue::Array(documents.iter().map(IndexDocument::to_json).collect());
        self.post_update(&body, &[])
    }

    fn delete_by_ids(&self, ids: &[String]) -> Result<(), BackendError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post_update(&json!({ "delete": ids }), &[])
    }

    fn commit(&self, mode: CommitMode) -> Result<(), BackendError> {
        let param = match mode {
            CommitMode::Soft => ("softCommit", "true"),
            CommitMode::Hard => ("commit", "true"),
        };
        self.post_update(&json!({}), &[param])
    }

    fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.handler_url("admin/ping"))
            .query(&[("wt", "json")])
            .send()
            .map_err(transport)?;
        let body: JsonValue = check_status(response)?.json().map_err(transport)?;
        match body.get("status").and_then(JsonValue::as_str) {
            Some("OK") => Ok(()),
            other => {
                warn!(status = ?other, "Solr ping did not report OK");
                Err(BackendError::Server {
                    status: 503,
                    message: format!("Ping status {other:?}"),
                })
            }
        }
    }
}

pub(crate) fn build_core_url(base: &str, core: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        core.trim_start_matches('/').trim_end_matches('/')
    )
}

pub(crate) fn select_params(request: &SearchRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("q".to_string(), request.query.clone()),
        ("start".to_string(), request.start.to_string()),
        ("rows".to_string(), request.rows.to_string()),
        ("wt".to_string(), "json".to_string()),
    ];
    if !request.fields.is_empty() {
        params.push(("fl".to_string(), request.fields.join(",")));
    }
    if !request.sort.is_empty() {
        let sort = request
            .sort
            .iter()
            .map(|c| format!("{} {}", c.field, c.order.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("sort".to_string(), sort));
    }
    params.extend(request.params.iter().map(|(k, v)| (k.clone(), v.clone())));
    params
}

pub(crate) fn parse_select(body: &JsonValue) -> Result<SearchResponse, BackendError> {
    let response = body
        .get("response")
        .ok_or_else(|| BackendError::Transport("Select response has no 'response' section".into()))?;
    let num_found = response
        .get("numFound")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| BackendError::Transport("Select response has no 'numFound'".into()))?;
    let documents = response
        .get("docs")
        .and_then(JsonValue::as_array)
        .map(|docs| {
            docs.iter()
                .filter_map(JsonValue::as_object)
                .map(IndexDocument::from_json)
                .collect()
        })
        .unwrap_or_default();

    Ok(SearchResponse {
        num_found,
        documents,
    })
}

pub(crate) fn status_error(status: u16, body: &str) -> BackendError {
    let message = serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/msg")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    match status {
        400 => BackendError::Parse(message),
        _ => BackendError::Server { status, message },
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(status_error(status.as_u16(), &body))
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}
