//! Filter translation: predicate tree -> native query text.
//!
//! [`FilterTranslator::translate`] walks a [`Predicate`] and produces one
//! [`Fragment`]. Every literal is escaped before it is embedded, so caller
//! input can never change the structure of the compiled query.
//!
//! # Distance sorting
//!
//! When the caller sorts by distance, circle queries are prefixed with
//! `{!score=distance}` so the index scores hits by distance. The query
//! parser only honours that prefix on the first clause of a group, so
//! `AND`/`OR` move a distance-sorted operand to the front.

mod escape;
mod spatial;
mod temporal;
pub mod xpath;

#[cfg(test)]
mod xpath_tests;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metacard::{AttributeFormat, METADATA};
use crate::predicate::{Literal, Predicate};
use crate::schema::SchemaResolver;

pub use escape::{escape_phrase, escape_query_chars, unescape_query_chars, RESERVED_CHARS};

/// Local parameter turning a spatial clause's score into its distance.
pub const DISTANCE_SCORE_PREFIX: &str = "{!score=distance}";

/// Query matching every document.
pub const MATCH_ALL: &str = "*:*";

/// Renders a date in the index's canonical form, `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Translator switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorOptions {
    /// Allow XPath predicates.
    pub xpath_enabled: bool,
    /// Score circle queries by distance.
    pub sort_by_distance: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            xpath_enabled: true,
            sort_by_distance: false,
        }
    }
}

/// Point a distance sort is measured from.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceOrigin {
    /// Logical geometry attribute.
    pub attribute: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Compiled query text plus what the store needs to know about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Native query text.
    pub text: String,
    /// Starts with [`DISTANCE_SCORE_PREFIX`].
    pub distance_sorted: bool,
    /// Origin of the first circle query, if any.
    pub distance_origin: Option<DistanceOrigin>,
}

impl Fragment {
    fn plain(text: String) -> Self {
        Self {
            text,
            distance_sorted: false,
            distance_origin: None,
        }
    }
}

/// Compiles predicates into native query text.
#[derive(Clone)]
pub struct FilterTranslator {
    resolver: Arc<dyn SchemaResolver>,
    options: TranslatorOptions,
}

impl std::fmt::Debug for FilterTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterTranslator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FilterTranslator {
    /// Creates a translator resolving fields through `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn SchemaResolver>, options: TranslatorOptions) -> Self {
        Self { resolver, options }
    }

    /// Returns the active options.
    #[must_use]
    pub fn options(&self) -> TranslatorOptions {
        self.options
    }

    /// Compiles a predicate tree.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` for malformed predicates: missing
    /// attribute or literal, unparsable geometry or path, case-insensitive
    /// exact match, empty combinators, or XPath while it is disabled.
    pub fn translate(&self, predicate: &Predicate) -> Result<Fragment> {
        let fragment = self.compile(predicate)?;
        debug!(
            kind = predicate.kind(),
            query = %fragment.text,
            distance_sorted = fragment.distance_sorted,
            "Compiled filter"
        );
        Ok(fragment)
    }

    fn compile(&self, predicate: &Predicate) -> Result<Fragment> {
        let kind = predicate.kind();
        match predicate {
            Predicate::Include => Ok(Fragment::plain(MATCH_ALL.to_string())),
            Predicate::Exclude => Ok(Fragment::plain(format!("({MATCH_ALL} -{MATCH_ALL})"))),
            Predicate::Equals {
                attribute,
                literal,
                case_sensitive,
            } => self.equals(attribute, literal, *case_sensitive),
            Predicate::Fuzzy { attribute, phrase } => self.fuzzy(attribute, phrase),
            Predicate::Like {
                attribute,
                pattern,
                case_sensitive,
            } => self.like(attribute, pattern, *case_sensitive),
            Predicate::GreaterThan { attribute, value } => {
                self.numeric_range(kind, attribute, value, |v| format!("{{{v} TO *]"))
            }
            Predicate::GreaterThanOrEqual { attribute, value } => {
                self.numeric_range(kind, attribute, value, |v| format!("[{v} TO *]"))
            }
            Predicate::LessThan { attribute, value } => {
                self.numeric_range(kind, attribute, value, |v| format!("[* TO {v}}}"))
            }
            Predicate::LessThanOrEqual { attribute, value } => {
                self.numeric_range(kind, attribute, value, |v| format!("[* TO {v}]"))
            }
            Predicate::Between {
                attribute,
                lower,
                upper,
            } => self.between(attribute, lower, upper),
            Predicate::During {
                attribute,
                start,
                end,
            } => self.during(attribute, start, end),
            Predicate::Before { attribute, date } => self.before(attribute, date),
            Predicate::After { attribute, date } => self.after(attribute, date),
            Predicate::Relative {
                attribute,
                duration,
            } => self.relative(attribute, *duration),
            Predicate::NearestNeighbor { attribute, wkt } => self.nearest_neighbor(attribute, wkt),
            Predicate::Intersects { attribute, wkt } => self.intersects(attribute, wkt),
            Predicate::Contains { attribute, wkt } => {
                self.spatial_operator(kind, attribute, wkt, "Contains")
            }
            Predicate::Within { attribute, wkt } => {
                self.spatial_operator(kind, attribute, wkt, "IsWithin")
            }
            Predicate::Disjoint { attribute, wkt } => {
                self.spatial_operator(kind, attribute, wkt, "IsDisjointTo")
            }
            Predicate::Overlaps { attribute, wkt } => {
                self.spatial_operator(kind, attribute, wkt, "Overlaps")
            }
            Predicate::WithinDistance {
                attribute,
                wkt,
                meters,
            } => self.within_distance(attribute, wkt, *meters),
            Predicate::XPathExists { path } => self.xpath(kind, path, None),
            Predicate::XPathLike {
                path,
                pattern,
                case_sensitive,
            } => self.xpath(kind, path, Some((pattern, *case_sensitive))),
            Predicate::And { operands } => self.combine(kind, operands, "AND"),
            Predicate::Or { operands } => self.combine(kind, operands, "OR"),
            Predicate::Not { operand } => self.negate(operand),
        }
    }

    // -------------------------------------------------------------------------
    // Field resolution
    // -------------------------------------------------------------------------

    fn field(
        &self,
        kind: &str,
        attribute: &str,
        format: AttributeFormat,
        exact: bool,
    ) -> Result<String> {
        if attribute.trim().is_empty() {
            return Err(Error::unsupported(format!(
                "{kind}: attribute name is missing"
            )));
        }
        self.resolver
            .resolve_field(attribute, format, exact)
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "{kind}: attribute '{attribute}' has no searchable {format:?} field"
                ))
            })
    }

    // -------------------------------------------------------------------------
    // Text and literal comparisons
    // -------------------------------------------------------------------------

    fn equals(&self, attribute: &str, literal: &Literal, case_sensitive: bool) -> Result<Fragment> {
        let kind = "equals";
        let text = match literal {
            Literal::Text(value) => {
                if !case_sensitive {
                    return Err(Error::unsupported(format!(
                        "{kind}: case-insensitive exact match on '{attribute}' is not supported"
                    )));
                }
                if value.is_empty() {
                    return Err(Error::unsupported(format!(
                        "{kind}: literal for '{attribute}' is missing"
                    )));
                }
                let field = self.field(kind, attribute, AttributeFormat::String, true)?;
                format!("{field}:\"{}\"", escape_query_chars(value))
            }
            Literal::Integer(_) | Literal::Float(_) => {
                let field = self.field(kind, attribute, literal.format(), true)?;
                format!("{field}:{}", number(kind, attribute, literal)?)
            }
            Literal::Boolean(b) => {
                let field = self.field(kind, attribute, AttributeFormat::Boolean, true)?;
                format!("{field}:{b}")
            }
            Literal::Date(d) => {
                let field = self.field(kind, attribute, AttributeFormat::Date, true)?;
                format!("{field}:\"{}\"", format_date(d))
            }
        };
        Ok(Fragment::plain(text))
    }

    fn fuzzy(&self, attribute: &str, phrase: &str) -> Result<Fragment> {
        let kind = "fuzzy";
        let field = self.field(kind, attribute, AttributeFormat::String, false)?;
        let terms: Vec<String> = phrase
            .split_whitespace()
            .map(|token| format!("+{field}:{}~", escape_query_chars(&token.to_lowercase())))
            .collect();
        if terms.is_empty() {
            return Err(Error::unsupported(format!(
                "{kind}: phrase for '{attribute}' is missing"
            )));
        }
        Ok(Fragment::plain(format!("({})", terms.join(" "))))
    }

    fn like(&self, attribute: &str, pattern: &str, case_sensitive: bool) -> Result<Fragment> {
        let kind = "like";
        if pattern.is_empty() {
            return Err(Error::unsupported(format!(
                "{kind}: pattern for '{attribute}' is missing"
            )));
        }
        let field = self.field(kind, attribute, AttributeFormat::String, case_sensitive)?;
        let escaped = escape_query_chars(pattern);
        let text = if escaped.contains(['*', '?']) {
            format!("{field}:({})", escape::escape_whitespace(&escaped))
        } else {
            format!("{field}:\"{escaped}\"")
        };
        Ok(Fragment::plain(text))
    }

    fn numeric_range(
        &self,
        kind: &str,
        attribute: &str,
        value: &Literal,
        range: impl Fn(&str) -> String,
    ) -> Result<Fragment> {
        let bound = number(kind, attribute, value)?;
        let field = self.field(kind, attribute, value.format(), true)?;
        Ok(Fragment::plain(format!("{field}:{}", range(&bound))))
    }

    fn between(&self, attribute: &str, lower: &Literal, upper: &Literal) -> Result<Fragment> {
        let kind = "between";
        let low = number(kind, attribute, lower)?;
        let high = number(kind, attribute, upper)?;
        let format = if matches!(lower, Literal::Float(_)) || matches!(upper, Literal::Float(_)) {
            AttributeFormat::Double
        } else {
            AttributeFormat::Long
        };
        let field = self.field(kind, attribute, format, true)?;
        Ok(Fragment::plain(format!("{field}:[{low} TO {high}]")))
    }

    // -------------------------------------------------------------------------
    // XPath
    // -------------------------------------------------------------------------

    fn xpath(&self, kind: &str, path: &str, pattern: Option<(&String, bool)>) -> Result<Fragment> {
        if !self.options.xpath_enabled {
            return Err(Error::unsupported(format!(
                "{kind}: XPath predicates are disabled"
            )));
        }
        if path.trim().is_empty() {
            return Err(Error::unsupported(format!("{kind}: path is missing")));
        }
        let parsed = xpath::XPath::parse(path)
            .map_err(|e| Error::unsupported(format!("{kind}: '{path}': {e}")))?;
        let field = self.field(kind, METADATA, AttributeFormat::Xml, true)?;

        let expression = match pattern {
            None => parsed.as_str().to_string(),
            Some((pattern, _)) if pattern.is_empty() => {
                return Err(Error::unsupported(format!(
                    "{kind}: pattern for '{path}' is missing"
                )));
            }
            Some((pattern, true)) => format!(
                "{}[contains(., {})]",
                parsed.as_str(),
                xpath::quote_literal(pattern)
            ),
            Some((pattern, false)) => format!(
                "{}[contains(lower-case(.), lower-case({}))]",
                parsed.as_str(),
                xpath::quote_literal(pattern)
            ),
        };
        Ok(Fragment::plain(format!(
            "{field}:\"xpath({})\"",
            escape_phrase(&expression)
        )))
    }

    // -------------------------------------------------------------------------
    // Combinators
    // -------------------------------------------------------------------------

    fn combine(&self, kind: &str, operands: &[Predicate], operator: &str) -> Result<Fragment> {
        if operands.is_empty() {
            return Err(Error::unsupported(format!(
                "{kind}: at least one operand is required"
            )));
        }
        let compiled = operands
            .iter()
            .map(|p| self.compile(p))
            .collect::<Result<Vec<_>>>()?;

        // The query parser only honours a distance score on the first clause.
        let (mut ordered, rest): (Vec<Fragment>, Vec<Fragment>) =
            compiled.into_iter().partition(|f| f.distance_sorted);
        ordered.extend(rest);

        let distance_sorted = ordered.first().is_some_and(|f| f.distance_sorted);
        let distance_origin = ordered.iter().find_map(|f| f.distance_origin.clone());
        let text = ordered
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(&format!(" {operator} "));

        Ok(Fragment {
            text: format!("({text})"),
            distance_sorted,
            distance_origin,
        })
    }

    fn negate(&self, operand: &Predicate) -> Result<Fragment> {
        let inner = self.compile(operand)?;
        let text = inner
            .text
            .strip_prefix(DISTANCE_SCORE_PREFIX)
            .unwrap_or(inner.text.as_str());
        // Anchored on match-all so the clause stands alone inside an OR group.
        Ok(Fragment::plain(format!("({MATCH_ALL} -{text})")))
    }
}

fn number(kind: &str, attribute: &str, literal: &Literal) -> Result<String> {
    if let Literal::Float(f) = literal {
        if !f.is_finite() {
            return Err(Error::unsupported(format!(
                "{kind}: value {f} for '{attribute}' is not a finite number"
            )));
        }
    }
    literal
        .number_text()
        .map(|n| escape_query_chars(&n))
        .ok_or_else(|| {
            Error::unsupported(format!(
                "{kind}: '{attribute}' requires a numeric literal, got {literal:?}"
            ))
        })
}
