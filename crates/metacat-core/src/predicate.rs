//! Backend-agnostic predicate tree.
//!
//! Callers build a [`Predicate`] and hand it to the store; the translator
//! compiles it into native query text. The enum is closed, so adding a
//! predicate kind forces every translation path to handle it.
//!
//! ## Usage
//!
//! ```rust
//! use metacat_core::predicate::Predicate;
//!
//! let filter = Predicate::and(vec![
//!     Predicate::equals("status", "active"),
//!     Predicate::within_distance("location", "POINT(10 20)", 500.0),
//! ]);
//! assert_eq!(filter.kind(), "and");
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metacard::AttributeFormat;

/// A literal operand of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// Text literal.
    Text(String),
    /// Integral number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Instant.
    Date(DateTime<Utc>),
}

impl Literal {
    /// Semantic format used to resolve the physical field for this literal.
    #[must_use]
    pub const fn format(&self) -> AttributeFormat {
        match self {
            Self::Text(_) => AttributeFormat::String,
            Self::Integer(_) => AttributeFormat::Long,
            Self::Float(_) => AttributeFormat::Double,
            Self::Boolean(_) => AttributeFormat::Boolean,
            Self::Date(_) => AttributeFormat::Date,
        }
    }

    /// True for numeric literals.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Renders a numeric literal as query text.
    #[must_use]
    pub fn number_text(&self) -> Option<String> {
        match self {
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every record.
    Include,
    /// Matches no record.
    Exclude,
    /// Exact equality. Text equality is only offered case-sensitively.
    Equals {
        /// Logical attribute name.
        attribute: String,
        /// Value to compare against.
        literal: Literal,
        /// Case-sensitive comparison (text only).
        case_sensitive: bool,
    },
    /// Case-insensitive fuzzy match of every whitespace-separated token.
    Fuzzy {
        /// Logical attribute name.
        attribute: String,
        /// Search phrase.
        phrase: String,
    },
    /// Wildcard match. `*` matches any run of characters, `?` one character.
    Like {
        /// Logical attribute name.
        attribute: String,
        /// Pattern, possibly containing wildcards.
        pattern: String,
        /// Match against the case-preserving field variant.
        case_sensitive: bool,
    },
    /// attribute > value
    GreaterThan {
        /// Logical attribute name.
        attribute: String,
        /// Numeric bound.
        value: Literal,
    },
    /// attribute >= value
    GreaterThanOrEqual {
        /// Logical attribute name.
        attribute: String,
        /// Numeric bound.
        value: Literal,
    },
    /// attribute < value
    LessThan {
        /// Logical attribute name.
        attribute: String,
        /// Numeric bound.
        value: Literal,
    },
    /// attribute <= value
    LessThanOrEqual {
        /// Logical attribute name.
        attribute: String,
        /// Numeric bound.
        value: Literal,
    },
    /// lower <= attribute <= upper
    Between {
        /// Logical attribute name.
        attribute: String,
        /// Inclusive lower bound.
        lower: Literal,
        /// Inclusive upper bound.
        upper: Literal,
    },
    /// Date inside [start, end].
    During {
        /// Logical attribute name.
        attribute: String,
        /// Inclusive start.
        start: DateTime<Utc>,
        /// Inclusive end.
        end: DateTime<Utc>,
    },
    /// Date at or before an instant.
    Before {
        /// Logical attribute name.
        attribute: String,
        /// Inclusive upper bound.
        date: DateTime<Utc>,
    },
    /// Date at or after an instant.
    After {
        /// Logical attribute name.
        attribute: String,
        /// Inclusive lower bound.
        date: DateTime<Utc>,
    },
    /// Date within `duration` before the moment of translation.
    Relative {
        /// Logical attribute name.
        attribute: String,
        /// Window length.
        duration: Duration,
    },
    /// Records closest to a geometry, limited to 1000 nautical miles.
    NearestNeighbor {
        /// Logical attribute name.
        attribute: String,
        /// Reference geometry (WKT).
        wkt: String,
    },
    /// Stored geometry contains the argument.
    Contains {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
    },
    /// Stored geometry lies within the argument.
    Within {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
    },
    /// Stored geometry shares no point with the argument.
    Disjoint {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
    },
    /// Stored geometry overlaps the argument.
    Overlaps {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
    },
    /// Stored geometry intersects the argument.
    Intersects {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
    },
    /// Stored geometry within `meters` of the argument.
    WithinDistance {
        /// Logical attribute name.
        attribute: String,
        /// Argument geometry (WKT).
        wkt: String,
        /// Distance in meters.
        meters: f64,
    },
    /// XML metadata has a node at `path`.
    XPathExists {
        /// Simplified XPath expression.
        path: String,
    },
    /// XML metadata node at `path` contains `pattern`.
    XPathLike {
        /// Simplified XPath expression.
        path: String,
        /// Text the node must contain.
        pattern: String,
        /// Case-sensitive containment.
        case_sensitive: bool,
    },
    /// Every operand matches.
    And {
        /// Operands (at least one).
        operands: Vec<Predicate>,
    },
    /// At least one operand matches.
    Or {
        /// Operands (at least one).
        operands: Vec<Predicate>,
    },
    /// The operand does not match.
    Not {
        /// Negated operand.
        operand: Box<Predicate>,
    },
}

impl Predicate {
    /// Case-sensitive equality.
    #[must_use]
    pub fn equals(attribute: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::Equals {
            attribute: attribute.into(),
            literal: literal.into(),
            case_sensitive: true,
        }
    }

    /// Fuzzy text match.
    #[must_use]
    pub fn fuzzy(attribute: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self::Fuzzy {
            attribute: attribute.into(),
            phrase: phrase.into(),
        }
    }

    /// Case-insensitive wildcard match.
    #[must_use]
    pub fn like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            attribute: attribute.into(),
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    /// Case-sensitive wildcard match.
    #[must_use]
    pub fn like_case_sensitive(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            attribute: attribute.into(),
            pattern: pattern.into(),
            case_sensitive: true,
        }
    }

    /// attribute > value
    #[must_use]
    pub fn gt(attribute: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::GreaterThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// attribute >= value
    #[must_use]
    pub fn gte(attribute: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::GreaterThanOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// attribute < value
    #[must_use]
    pub fn lt(attribute: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::LessThan {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// attribute <= value
    #[must_use]
    pub fn lte(attribute: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self::LessThanOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// lower <= attribute <= upper
    #[must_use]
    pub fn between(
        attribute: impl Into<String>,
        lower: impl Into<Literal>,
        upper: impl Into<Literal>,
    ) -> Self {
        Self::Between {
            attribute: attribute.into(),
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// Date inside [start, end].
    #[must_use]
    pub fn during(attribute: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::During {
            attribute: attribute.into(),
            start,
            end,
        }
    }

    /// Date at or before `date`.
    #[must_use]
    pub fn before(attribute: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self::Before {
            attribute: attribute.into(),
            date,
        }
    }

    /// Date at or after `date`.
    #[must_use]
    pub fn after(attribute: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self::After {
            attribute: attribute.into(),
            date,
        }
    }

    /// Date within the last `duration`.
    #[must_use]
    pub fn relative(attribute: impl Into<String>, duration: Duration) -> Self {
        Self::Relative {
            attribute: attribute.into(),
            duration,
        }
    }

    /// Nearest records to a geometry.
    #[must_use]
    pub fn nearest_neighbor(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::NearestNeighbor {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Geometry intersection.
    #[must_use]
    pub fn intersects(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::Intersects {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Stored geometry contains `wkt`.
    #[must_use]
    pub fn contains(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::Contains {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Stored geometry lies within `wkt`.
    #[must_use]
    pub fn within(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::Within {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Stored geometry shares no point with `wkt`.
    #[must_use]
    pub fn disjoint(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::Disjoint {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Stored geometry overlaps `wkt`.
    #[must_use]
    pub fn overlaps(attribute: impl Into<String>, wkt: impl Into<String>) -> Self {
        Self::Overlaps {
            attribute: attribute.into(),
            wkt: wkt.into(),
        }
    }

    /// Geometry within `meters` of `wkt`.
    #[must_use]
    pub fn within_distance(
        attribute: impl Into<String>,
        wkt: impl Into<String>,
        meters: f64,
    ) -> Self {
        Self::WithinDistance {
            attribute: attribute.into(),
            wkt: wkt.into(),
            meters,
        }
    }

    /// XML metadata has a node at `path`.
    #[must_use]
    pub fn xpath_exists(path: impl Into<String>) -> Self {
        Self::XPathExists { path: path.into() }
    }

    /// XML metadata node at `path` contains `pattern`, ignoring case.
    #[must_use]
    pub fn xpath_like(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::XPathLike {
            path: path.into(),
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    /// Conjunction.
    #[must_use]
    pub fn and(operands: Vec<Predicate>) -> Self {
        Self::And { operands }
    }

    /// Disjunction.
    #[must_use]
    pub fn or(operands: Vec<Predicate>) -> Self {
        Self::Or { operands }
    }

    /// Negation.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Predicate) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    /// Short name of the predicate kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::Equals { .. } => "equals",
            Self::Fuzzy { .. } => "fuzzy",
            Self::Like { .. } => "like",
            Self::GreaterThan { .. } => "greater_than",
            Self::GreaterThanOrEqual { .. } => "greater_than_or_equal",
            Self::LessThan { .. } => "less_than",
            Self::LessThanOrEqual { .. } => "less_than_or_equal",
            Self::Between { .. } => "between",
            Self::During { .. } => "during",
            Self::Before { .. } => "before",
            Self::After { .. } => "after",
            Self::Relative { .. } => "relative",
            Self::NearestNeighbor { .. } => "nearest_neighbor",
            Self::Contains { .. } => "contains",
            Self::Within { .. } => "within",
            Self::Disjoint { .. } => "disjoint",
            Self::Overlaps { .. } => "overlaps",
            Self::Intersects { .. } => "intersects",
            Self::WithinDistance { .. } => "within_distance",
            Self::XPathExists { .. } => "xpath_exists",
            Self::XPathLike { .. } => "xpath_like",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Not { .. } => "not",
        }
    }
}
