//! # `metacat` Core
//!
//! Catalog storage adapter for metacards over a Solr-style search index.
//!
//! Two halves:
//!
//! - **Filter translation**: a typed predicate tree (text, numeric,
//!   temporal, spatial, XPath, boolean) compiled into native query text
//!   with every literal escaped.
//! - **Storage operations**: paged and sorted queries, batch create,
//!   keyed update and delete, and a liveness probe.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use metacat_core::{CatalogConfig, CatalogStore, Predicate, Query, Record, SortKey, SortOrder};
//!
//! let config = CatalogConfig::load()?;
//! metacat_core::logging::init(&config.logging);
//! let store = CatalogStore::from_config(&config)?;
//!
//! store.create(vec![Record::basic().with("title", "Harbor survey")])?;
//!
//! let query = Query::new(Predicate::and(vec![
//!     Predicate::fuzzy("title", "harbor"),
//!     Predicate::within_distance("location", "POINT(10 20)", 5_000.0),
//! ]))
//! .sorted_by(SortKey::Distance, SortOrder::Ascending);
//! let hits = store.query(&query)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // u64 hit counts and f32 values into f64
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_pub_crate)]

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
#[cfg(test)]
mod geometry_tests;
pub mod logging;
#[cfg(test)]
mod logging_tests;
pub mod metacard;
pub mod predicate;
#[cfg(test)]
mod predicate_tests;
pub mod schema;
pub mod store;
pub mod translate;

#[cfg(feature = "http")]
pub use backend::SolrHttpClient;
pub use backend::{
    BackendError, CommitMode, IndexClient, IndexDocument, SearchRequest, SearchResponse,
    SortOrder,
};
pub use config::{CatalogConfig, ConfigError, LoggingConfig, SolrConfig, StoreConfig};
pub use error::{Error, Result};
pub use metacard::{
    Attribute, AttributeDescriptor, AttributeFormat, AttributeValue, Record, RecordType,
};
pub use predicate::{Literal, Predicate};
pub use schema::{SchemaResolver, SuffixSchemaResolver};
pub use store::{CatalogStore, Query, QueryResponse, ScoredRecord, SortBy, SortKey, Update};
pub use translate::{FilterTranslator, Fragment, TranslatorOptions};
