//! Mapping between logical attributes and physical index fields.
//!
//! The translator and the store never build field names themselves; they
//! ask a [`SchemaResolver`]. [`SuffixSchemaResolver`] is the default,
//! naming fields after their format the way a dynamic-field index schema
//! expects.

mod suffix;


use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::backend::IndexDocument;
use crate::error::Result;
use crate::metacard::{AttributeFormat, AttributeValue, Record, RecordType};

pub use suffix::SuffixSchemaResolver;

/// Resolves logical attribute names to physical index fields and back.
///
/// Implementations are shared across threads and may cache what they learn
/// from documents passing through them.
pub trait SchemaResolver: Send + Sync {
    /// Physical field to query for an attribute of the given format.
    ///
    /// `exact` selects the untokenized, case-preserving variant. Returns
    /// `None` when the attribute cannot be searched in that format.
    fn resolve_field(&self, logical: &str, format: AttributeFormat, exact: bool) -> Option<String>;

    /// Every known physical field holding the attribute, the preferred one
    /// first.
    fn resolve_anonymous_fields(&self, logical: &str) -> Vec<String>;

    /// Field holding the sort key of a physical field.
    fn sort_key(&self, physical: &str) -> String;

    /// Decodes one stored value back into a logical attribute value.
    ///
    /// Returns `Ok(None)` for fields the resolver does not own.
    ///
    /// # Errors
    ///
    /// Returns an error if the raw value does not match the field's format.
    fn decode_value(
        &self,
        physical: &str,
        raw: &JsonValue,
    ) -> Result<Option<(String, AttributeValue)>>;

    /// True for bookkeeping fields that never surface as attributes.
    fn is_private_field(&self, physical: &str) -> bool;

    /// Record type a stored document was written with.
    ///
    /// # Errors
    ///
    /// Returns an error if the document names a type the resolver cannot
    /// rebuild.
    fn resolve_record_type(&self, document: &IndexDocument) -> Result<Arc<RecordType>>;

    /// Builds the index document for a record.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the record carries an attribute its type
    /// does not declare.
    fn encode_record(&self, record: &Record) -> Result<IndexDocument>;
}
