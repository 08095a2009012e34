//! Catalog records ("metacards") and the schemas that describe them.
//!
//! A [`Record`] is a bag of named, typed [`Attribute`]s governed by a
//! [`RecordType`]. Every attribute written to the index must be declared by
//! the record's type; the schema resolver enforces that on encode.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier attribute. Assigned once, never changed by updates.
pub const ID: &str = "id";
/// Human readable title.
pub const TITLE: &str = "title";
/// Free-text description.
pub const DESCRIPTION: &str = "description";
/// Full XML metadata document, the target of XPath predicates.
pub const METADATA: &str = "metadata";
/// Content type of the metadata document.
pub const CONTENT_TYPE: &str = "metadata-content-type";
/// Footprint geometry (WKT).
pub const LOCATION: &str = "location";
/// Creation time. Immutable across updates.
pub const CREATED: &str = "created";
/// Last modification time.
pub const MODIFIED: &str = "modified";
/// Effective date, the temporal sort proxy.
pub const EFFECTIVE: &str = "effective";

/// Name of the record type declaring the core attributes.
pub const BASIC_TYPE_NAME: &str = "metacard";

/// Semantic format of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeFormat {
    /// UTF-8 text.
    String,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Boolean.
    Boolean,
    /// Instant in UTC.
    Date,
    /// Geometry as well-known text.
    Geometry,
    /// XML document.
    Xml,
    /// Raw bytes.
    Binary,
    /// Opaque structured object.
    Object,
}

impl AttributeFormat {
    /// Returns true for the numeric formats.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Short | Self::Integer | Self::Long | Self::Float | Self::Double
        )
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Text value.
    String(String),
    /// 16-bit integer value.
    Short(i16),
    /// 32-bit integer value.
    Integer(i32),
    /// 64-bit integer value.
    Long(i64),
    /// 32-bit float value.
    Float(f32),
    /// 64-bit float value.
    Double(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date value.
    Date(DateTime<Utc>),
    /// Geometry value in WKT.
    Geometry(String),
    /// XML document.
    Xml(String),
    /// Binary value.
    Binary(Vec<u8>),
    /// Opaque object value.
    Object(JsonValue),
}

impl AttributeValue {
    /// Returns the semantic format of this value.
    #[must_use]
    pub const fn format(&self) -> AttributeFormat {
        match self {
            Self::String(_) => AttributeFormat::String,
            Self::Short(_) => AttributeFormat::Short,
            Self::Integer(_) => AttributeFormat::Integer,
            Self::Long(_) => AttributeFormat::Long,
            Self::Float(_) => AttributeFormat::Float,
            Self::Double(_) => AttributeFormat::Double,
            Self::Boolean(_) => AttributeFormat::Boolean,
            Self::Date(_) => AttributeFormat::Date,
            Self::Geometry(_) => AttributeFormat::Geometry,
            Self::Xml(_) => AttributeFormat::Xml,
            Self::Binary(_) => AttributeFormat::Binary,
            Self::Object(_) => AttributeFormat::Object,
        }
    }

    /// Returns the text of a string-like value (string, geometry, XML).
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Geometry(s) | Self::Xml(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the instant of a date value.
    #[must_use]
    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Renders the value the way it is compared when used as a lookup key.
    #[must_use]
    pub fn to_key_string(&self) -> String {
        match self {
            Self::String(s) | Self::Geometry(s) | Self::Xml(s) => s.clone(),
            Self::Short(v) => v.to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Boolean(v) => v.to_string(),
            Self::Date(d) => crate::translate::format_date(d),
            Self::Binary(b) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(b)
            }
            Self::Object(o) => o.to_string(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// Declares one attribute of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Logical attribute name.
    pub name: String,
    /// Semantic format of every value.
    pub format: AttributeFormat,
    /// Searchable.
    pub indexed: bool,
    /// Returned with query results.
    pub stored: bool,
    /// Analyzed for free-text search.
    pub tokenized: bool,
    /// Holds more than one value.
    pub multi_valued: bool,
}

impl AttributeDescriptor {
    /// Creates an indexed, stored, single-valued descriptor.
    ///
    /// Strings and XML are tokenized by default.
    #[must_use]
    pub fn new(name: impl Into<String>, format: AttributeFormat) -> Self {
        Self {
            name: name.into(),
            format,
            indexed: true,
            stored: true,
            tokenized: matches!(format, AttributeFormat::String | AttributeFormat::Xml),
            multi_valued: false,
        }
    }

    /// Marks the descriptor multi-valued.
    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Disables free-text analysis.
    #[must_use]
    pub fn untokenized(mut self) -> Self {
        self.tokenized = false;
        self
    }

    /// Excludes the attribute from search.
    #[must_use]
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }
}

/// A named set of attribute descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    /// Type name.
    pub name: String,
    descriptors: BTreeMap<String, AttributeDescriptor>,
}

impl RecordType {
    /// Creates a record type from descriptors. Later duplicates win.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        descriptors: impl IntoIterator<Item = AttributeDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// The type declaring the core catalog attributes.
    #[must_use]
    pub fn basic() -> Self {
        Self::new(BASIC_TYPE_NAME, Self::core_descriptors())
    }

    /// Extends the core attributes with type-specific descriptors.
    #[must_use]
    pub fn extending_basic(
        name: impl Into<String>,
        extra: impl IntoIterator<Item = AttributeDescriptor>,
    ) -> Self {
        Self::new(name, Self::core_descriptors().into_iter().chain(extra))
    }

    fn core_descriptors() -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::new(ID, AttributeFormat::String).untokenized(),
            AttributeDescriptor::new(TITLE, AttributeFormat::String),
            AttributeDescriptor::new(DESCRIPTION, AttributeFormat::String),
            AttributeDescriptor::new(METADATA, AttributeFormat::Xml),
            AttributeDescriptor::new(CONTENT_TYPE, AttributeFormat::String).untokenized(),
            AttributeDescriptor::new(LOCATION, AttributeFormat::Geometry),
            AttributeDescriptor::new(CREATED, AttributeFormat::Date),
            AttributeDescriptor::new(MODIFIED, AttributeFormat::Date),
            AttributeDescriptor::new(EFFECTIVE, AttributeFormat::Date),
        ]
    }

    /// Looks up a descriptor by attribute name.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.descriptors.get(name)
    }

    /// Iterates over all descriptors in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.descriptors.values()
    }
}

/// A named attribute with one or more values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Logical attribute name.
    pub name: String,
    /// Values. The backend does not preserve the order of multi-valued
    /// attributes.
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    /// Creates a single-valued attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Returns the first value.
    #[must_use]
    pub fn value(&self) -> Option<&AttributeValue> {
        self.values.first()
    }
}

/// A catalog record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type governing which attributes the record may carry.
    pub record_type: Arc<RecordType>,
    /// Store that produced the record, if known.
    pub source_id: Option<String>,
    attributes: BTreeMap<String, Attribute>,
}

impl Record {
    /// Creates an empty record of the given type.
    #[must_use]
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self {
            record_type,
            source_id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Creates an empty record of the basic type.
    #[must_use]
    pub fn basic() -> Self {
        Self::new(Arc::new(RecordType::basic()))
    }

    /// Returns the identifier, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.text(ID)
    }

    /// Assigns the identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set_attribute(ID, AttributeValue::String(id.into()));
    }

    /// Builder form of [`Record::set_attribute`].
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Returns the named attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Replaces the named attribute with a single value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes
            .insert(name.to_string(), Attribute::new(name, value));
    }

    /// Replaces the named attribute with several values.
    pub fn set_values(&mut self, name: &str, values: Vec<AttributeValue>) {
        self.attributes.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                values,
            },
        );
    }

    /// Appends a value, creating the attribute if needed.
    pub fn push_value(&mut self, name: &str, value: AttributeValue) {
        self.attributes
            .entry(name.to_string())
            .or_insert_with(|| Attribute {
                name: name.to_string(),
                values: Vec::new(),
            })
            .values
            .push(value);
    }

    /// Removes the named attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    /// Returns the first value of a string-like attribute.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.attribute(name)?.value()?.as_text()
    }

    /// Returns the first value of a date attribute.
    #[must_use]
    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        self.attribute(name)?.value()?.as_date()
    }

    /// Iterates over all attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }
}
