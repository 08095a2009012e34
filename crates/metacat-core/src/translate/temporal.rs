//! Date range predicates. All ranges are inclusive.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{format_date, FilterTranslator, Fragment};
use crate::error::{Error, Result};
use crate::metacard::AttributeFormat;

impl FilterTranslator {
    pub(super) fn during(
        &self,
        attribute: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Fragment> {
        let kind = "during";
        if start > end {
            return Err(Error::unsupported(format!(
                "{kind}: start {} is after end {} for '{attribute}'",
                format_date(start),
                format_date(end)
            )));
        }
        self.date_range(kind, attribute, &format_date(start), &format_date(end))
    }

    pub(super) fn before(&self, attribute: &str, date: &DateTime<Utc>) -> Result<Fragment> {
        self.date_range("before", attribute, "*", &format_date(date))
    }

    pub(super) fn after(&self, attribute: &str, date: &DateTime<Utc>) -> Result<Fragment> {
        self.date_range("after", attribute, &format_date(date), "*")
    }

    /// Window ending at the moment of translation, so two translations of
    /// the same predicate differ.
    pub(super) fn relative(&self, attribute: &str, duration: Duration) -> Result<Fragment> {
        let kind = "relative";
        let span = chrono::Duration::from_std(duration).map_err(|e| {
            Error::unsupported(format!("{kind}: duration for '{attribute}' is too large: {e}"))
        })?;
        let now = Utc::now();
        let start = now
            .checked_sub_signed(span)
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "{kind}: duration for '{attribute}' reaches before the representable range"
                ))
            })?;
        self.date_range(kind, attribute, &format_date(&start), &format_date(&now))
    }

    fn date_range(&self, kind: &str, attribute: &str, from: &str, to: &str) -> Result<Fragment> {
        let field = self.field(kind, attribute, AttributeFormat::Date, true)?;
        Ok(Fragment::plain(format!("{field}:[{from} TO {to}]")))
    }
}
