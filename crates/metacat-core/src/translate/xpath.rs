//! Simplified XPath validation using pest.
//!
//! Paths are only checked here, never evaluated: the index evaluates them
//! against the stored XML. A path that does not parse is rejected before a
//! query is sent.

use std::fmt;

use pest::Parser as PestParser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "translate/xpath.pest"]
struct XPathGrammar;

/// Error raised for a path the grammar rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathError {
    /// Byte offset of the failure.
    pub position: usize,
    /// Parser message.
    pub message: String,
}

impl fmt::Display for XPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid XPath at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for XPathError {}

/// A path accepted by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    text: String,
    absolute: bool,
    steps: Vec<String>,
}

impl XPath {
    /// Parses and validates a path.
    ///
    /// # Errors
    ///
    /// Returns an [`XPathError`] if the path is not valid simplified XPath.
    pub fn parse(input: &str) -> Result<Self, XPathError> {
        let mut pairs = XPathGrammar::parse(Rule::xpath, input).map_err(|e| {
            let position = match e.location {
                pest::error::InputLocation::Pos(p) => p,
                pest::error::InputLocation::Span((s, _)) => s,
            };
            XPathError {
                position,
                message: e.variant.message().into_owned(),
            }
        })?;

        let path = pairs
            .next()
            .and_then(|xpath| xpath.into_inner().find(|p| p.as_rule() == Rule::path))
            .and_then(|path| path.into_inner().next())
            .ok_or_else(|| XPathError {
                position: 0,
                message: "empty path".to_string(),
            })?;

        let absolute = path.as_rule() == Rule::absolute_path;
        let relative = if absolute {
            path.into_inner().find(|p| p.as_rule() == Rule::relative_path)
        } else {
            Some(path)
        };
        let steps = relative
            .map(|r| {
                r.into_inner()
                    .filter(|p| p.as_rule() == Rule::step)
                    .map(|p| p.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            text: input.trim().to_string(),
            absolute,
            steps,
        })
    }

    /// The path as written, trimmed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when the path starts at the document root.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Top-level location steps, predicates included.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// Quotes text as an XPath string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
