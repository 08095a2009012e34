//! Dynamic-field schema resolver.
//!
//! Physical field = logical name + format suffix (`title` as a string is
//! `title_txt`). Derived copies add a second suffix: `_tokenized` for the
//! analyzed text variant, `_index` for the spatial index and `_sort` for the
//! sort key. Every document also carries its record type name and JSON
//! definition so the type can be rebuilt by a fresh process.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Number, Value as JsonValue};
use tracing::{debug, warn};

use super::SchemaResolver;
use crate::backend::IndexDocument;
use crate::error::{Error, Result};
use crate::geometry;
use crate::metacard::{AttributeDescriptor, AttributeFormat, AttributeValue, Record, RecordType};
use crate::translate::format_date;

/// Suffix of the analyzed copy of a text field.
pub const TOKENIZED_SUFFIX: &str = "_tokenized";
/// Suffix of the spatial index copy of a geometry field.
pub const INDEX_SUFFIX: &str = "_index";
/// Suffix of a sort key field.
pub const SORT_SUFFIX: &str = "_sort";
/// Field holding the record type name.
pub const RECORD_TYPE_FIELD: &str = "_record_type_";
/// Field holding the serialized record type definition.
pub const RECORD_TYPE_DEF_FIELD: &str = "_record_type_def_";
/// Backend optimistic-concurrency field.
pub const VERSION_FIELD: &str = "_version_";

const FORMAT_SUFFIXES: [(AttributeFormat, &str); 12] = [
    (AttributeFormat::String, "_txt"),
    (AttributeFormat::Short, "_shr"),
    (AttributeFormat::Integer, "_int"),
    (AttributeFormat::Long, "_lng"),
    (AttributeFormat::Float, "_flt"),
    (AttributeFormat::Double, "_dbl"),
    (AttributeFormat::Boolean, "_bln"),
    (AttributeFormat::Date, "_tdt"),
    (AttributeFormat::Geometry, "_geo"),
    (AttributeFormat::Xml, "_xml"),
    (AttributeFormat::Binary, "_bin"),
    (AttributeFormat::Object, "_obj"),
];

/// Returns the field suffix for a format.
#[must_use]
pub fn format_suffix(format: AttributeFormat) -> &'static str {
    FORMAT_SUFFIXES
        .iter()
        .find(|(f, _)| *f == format)
        .map_or("_obj", |(_, s)| s)
}

fn split_field(physical: &str) -> Option<(&str, AttributeFormat)> {
    FORMAT_SUFFIXES.iter().find_map(|(format, suffix)| {
        physical
            .strip_suffix(suffix)
            .filter(|logical| !logical.is_empty())
            .map(|logical| (logical, *format))
    })
}

/// Default [`SchemaResolver`] for a dynamic-field index schema.
///
/// The basic record type is known from the start; other types are learned
/// when records are encoded or documents are decoded.
#[derive(Debug)]
pub struct SuffixSchemaResolver {
    /// Logical attribute name -> physical fields, preferred first.
    fields: RwLock<HashMap<String, Vec<String>>>,
    /// Record type name -> definition.
    record_types: RwLock<HashMap<String, Arc<RecordType>>>,
}

impl Default for SuffixSchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixSchemaResolver {
    /// Creates a resolver knowing only the basic record type.
    #[must_use]
    pub fn new() -> Self {
        let resolver = Self {
            fields: RwLock::new(HashMap::new()),
            record_types: RwLock::new(HashMap::new()),
        };
        resolver.register_record_type(Arc::new(RecordType::basic()));
        resolver
    }

    /// Makes a record type and its fields known ahead of any write.
    pub fn register_record_type(&self, record_type: Arc<RecordType>) {
        for descriptor in record_type.descriptors() {
            self.remember_field(&descriptor.name, &physical_name(descriptor));
        }
        self.record_types
            .write()
            .insert(record_type.name.clone(), record_type);
    }

    /// Returns a cached record type by name.
    #[must_use]
    pub fn record_type(&self, name: &str) -> Option<Arc<RecordType>> {
        self.record_types.read().get(name).cloned()
    }

    fn remember_field(&self, logical: &str, physical: &str) {
        if self
            .fields
            .read()
            .get(logical)
            .is_some_and(|known| known.iter().any(|f| f == physical))
        {
            return;
        }
        self.fields
            .write()
            .entry(logical.to_string())
            .or_default()
            .push(physical.to_string());
    }

    fn known_numeric_field(&self, logical: &str) -> Option<String> {
        self.fields.read().get(logical).and_then(|known| {
            known
                .iter()
                .find(|f| split_field(f).is_some_and(|(_, format)| format.is_numeric()))
                .cloned()
        })
    }
}

fn physical_name(descriptor: &AttributeDescriptor) -> String {
    format!("{}{}", descriptor.name, format_suffix(descriptor.format))
}

impl SchemaResolver for SuffixSchemaResolver {
    fn resolve_field(&self, logical: &str, format: AttributeFormat, exact: bool) -> Option<String> {
        if logical.is_empty() {
            return None;
        }
        let base = match format {
            AttributeFormat::Binary | AttributeFormat::Object => return None,
            f if f.is_numeric() => self
                .known_numeric_field(logical)
                .unwrap_or_else(|| format!("{logical}{}", format_suffix(f))),
            f => format!("{logical}{}", format_suffix(f)),
        };

        Some(match format {
            AttributeFormat::Geometry => format!("{base}{INDEX_SUFFIX}"),
            AttributeFormat::String | AttributeFormat::Xml if !exact => {
                format!("{base}{TOKENIZED_SUFFIX}")
            }
            _ => base,
        })
    }

    fn resolve_anonymous_fields(&self, logical: &str) -> Vec<String> {
        self.fields.read().get(logical).cloned().unwrap_or_default()
    }

    fn sort_key(&self, physical: &str) -> String {
        format!("{physical}{SORT_SUFFIX}")
    }

    fn decode_value(
        &self,
        physical: &str,
        raw: &JsonValue,
    ) -> Result<Option<(String, AttributeValue)>> {
        if self.is_private_field(physical) {
            return Ok(None);
        }
        let Some((logical, format)) = split_field(physical) else {
            return Ok(None);
        };
        let value = decode_raw(format, raw).ok_or_else(|| {
            Error::query_failed(format!(
                "Field '{physical}' holds {raw} which is not a valid {format:?} value"
            ))
        })?;
        self.remember_field(logical, physical);
        Ok(Some((logical.to_string(), value)))
    }

    fn is_private_field(&self, physical: &str) -> bool {
        physical == RECORD_TYPE_FIELD
            || physical == RECORD_TYPE_DEF_FIELD
            || physical == VERSION_FIELD
            || physical.ends_with(TOKENIZED_SUFFIX)
            || physical.ends_with(INDEX_SUFFIX)
            || physical.ends_with(SORT_SUFFIX)
    }

    fn resolve_record_type(&self, document: &IndexDocument) -> Result<Arc<RecordType>> {
        let Some(name) = document.first(RECORD_TYPE_FIELD).and_then(JsonValue::as_str) else {
            return self
                .record_type(crate::metacard::BASIC_TYPE_NAME)
                .ok_or_else(|| Error::Configuration("Basic record type is not registered".into()));
        };
        if let Some(known) = self.record_type(name) {
            return Ok(known);
        }

        let definition = document
            .first(RECORD_TYPE_DEF_FIELD)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "Record type '{name}' is unknown and the document carries no definition"
                ))
            })?;
        let record_type: RecordType = serde_json::from_str(definition).map_err(|e| {
            Error::Configuration(format!("Invalid definition of record type '{name}': {e}"))
        })?;
        debug!(record_type = %name, "Rebuilt record type from stored definition");

        let record_type = Arc::new(record_type);
        self.register_record_type(Arc::clone(&record_type));
        Ok(record_type)
    }

    fn encode_record(&self, record: &Record) -> Result<IndexDocument> {
        let record_type = &record.record_type;
        let mut document = IndexDocument::new();

        for attribute in record.attributes() {
            let descriptor = record_type.descriptor(&attribute.name).ok_or_else(|| {
                Error::Configuration(format!(
                    "Attribute '{}' is not declared by record type '{}'",
                    attribute.name, record_type.name
                ))
            })?;
            let field = physical_name(descriptor);

            for value in &attribute.values {
                let encoded = encode_value(value);
                if descriptor.indexed
                    && descriptor.tokenized
                    && matches!(
                        descriptor.format,
                        AttributeFormat::String | AttributeFormat::Xml
                    )
                {
                    document.add(format!("{field}{TOKENIZED_SUFFIX}"), encoded.clone());
                }
                if descriptor.indexed && descriptor.format == AttributeFormat::Geometry {
                    document.add(format!("{field}{INDEX_SUFFIX}"), encoded.clone());
                }
                document.add(field.clone(), encoded);
            }

            if descriptor.indexed && !descriptor.multi_valued {
                let key = attribute
                    .value()
                    .and_then(|v| sort_value(&field, descriptor.format, v));
                if let Some(key) = key {
                    document.add(self.sort_key(&field), key);
                }
            }
        }

        document.add(RECORD_TYPE_FIELD, record_type.name.clone());
        let definition = serde_json::to_string(record_type.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "Cannot serialize record type '{}': {e}",
                record_type.name
            ))
        })?;
        document.add(RECORD_TYPE_DEF_FIELD, definition);

        if self.record_type(&record_type.name).as_ref() != Some(record_type) {
            self.register_record_type(Arc::clone(record_type));
        }
        Ok(document)
    }
}

fn encode_value(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::String(s) | AttributeValue::Geometry(s) | AttributeValue::Xml(s) => {
            JsonValue::String(s.clone())
        }
        AttributeValue::Short(v) => JsonValue::from(*v),
        AttributeValue::Integer(v) => JsonValue::from(*v),
        AttributeValue::Long(v) => JsonValue::from(*v),
        AttributeValue::Float(v) => JsonValue::from(f64::from(*v)),
        AttributeValue::Double(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
        AttributeValue::Boolean(v) => JsonValue::Bool(*v),
        AttributeValue::Date(d) => JsonValue::String(format_date(d)),
        AttributeValue::Binary(_) | AttributeValue::Object(_) => {
            JsonValue::String(value.to_key_string())
        }
    }
}

/// Sort key for a single-valued attribute. Geometries sort by distance from
/// their representative point, written as `lat,lon`.
fn sort_value(field: &str, format: AttributeFormat, value: &AttributeValue) -> Option<JsonValue> {
    match format {
        AttributeFormat::Geometry => {
            let point = value
                .as_text()
                .ok_or_else(|| Error::unsupported("Geometry value is not text"))
                .and_then(geometry::parse_wkt)
                .and_then(|g| geometry::representative_point(&g));
            match point {
                Ok(point) => Some(JsonValue::String(format!("{},{}", point.y(), point.x()))),
                Err(e) => {
                    warn!(field = %field, error = %e, "Skipping sort key of unparsable geometry");
                    None
                }
            }
        }
        AttributeFormat::Xml | AttributeFormat::Binary | AttributeFormat::Object => None,
        _ => Some(encode_value(value)),
    }
}

fn decode_raw(format: AttributeFormat, raw: &JsonValue) -> Option<AttributeValue> {
    Some(match format {
        AttributeFormat::String => AttributeValue::String(raw.as_str()?.to_string()),
        AttributeFormat::Geometry => AttributeValue::Geometry(raw.as_str()?.to_string()),
        AttributeFormat::Xml => AttributeValue::Xml(raw.as_str()?.to_string()),
        AttributeFormat::Short => AttributeValue::Short(i16::try_from(raw.as_i64()?).ok()?),
        AttributeFormat::Integer => AttributeValue::Integer(i32::try_from(raw.as_i64()?).ok()?),
        AttributeFormat::Long => AttributeValue::Long(raw.as_i64()?),
        #[allow(clippy::cast_possible_truncation)]
        AttributeFormat::Float => AttributeValue::Float(raw.as_f64()? as f32),
        AttributeFormat::Double => AttributeValue::Double(raw.as_f64()?),
        AttributeFormat::Boolean => AttributeValue::Boolean(raw.as_bool()?),
        AttributeFormat::Date => AttributeValue::Date(
            DateTime::parse_from_rfc3339(raw.as_str()?)
                .ok()?
                .with_timezone(&Utc),
        ),
        AttributeFormat::Binary => AttributeValue::Binary(
            base64::engine::general_purpose::STANDARD
                .decode(raw.as_str()?)
                .ok()?,
        ),
        AttributeFormat::Object => match raw {
            JsonValue::String(s) => {
                AttributeValue::Object(serde_json::from_str(s).unwrap_or_else(|_| raw.clone()))
            }
            other => AttributeValue::Object(other.clone()),
        },
    })
}
