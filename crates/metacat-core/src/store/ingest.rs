//! Create, update and delete.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{CatalogStore, Update};
use crate::backend::{CommitMode, IndexDocument};
use crate::error::{Error, Result};
use crate::metacard::{AttributeFormat, Record, CREATED, EFFECTIVE, ID, MODIFIED};
use crate::translate::format_date;

impl CatalogStore {
    /// Writes new records as one batch and returns them with identifiers
    /// filled in.
    ///
    /// Records without an identifier get a random one (32 hex digits) and
    /// the local source id. A record from another source must already
    /// carry an identifier.
    ///
    /// # Errors
    ///
    /// - `Configuration` for a foreign record without identifier or an
    ///   attribute its type does not declare
    /// - `IngestFailed` if the index rejects the batch
    pub fn create(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        if records.is_empty() {
            return Ok(records);
        }

        let mut documents = Vec::with_capacity(records.len());
        let mut created = Vec::with_capacity(records.len());
        for mut record in records {
            self.assign_identity(&mut record)?;
            documents.push(self.resolver.encode_record(&record)?);
            created.push(record);
        }

        self.write(documents)?;
        info!(count = created.len(), "Created records");
        Ok(created)
    }

    /// Replaces stored records matched by `key_attribute`.
    ///
    /// Each entry pairs a key value with its replacement. The replacement
    /// keeps the stored identifier and creation date, gets a fresh
    /// modification date and, when it has none, an effective date equal to
    /// it. Entries whose key matches nothing are skipped. Key values are
    /// read in the key attribute's format, so `2020-05-17T08:30:00Z`
    /// matches a stored date and `1.0` a stored double of one.
    ///
    /// # Errors
    ///
    /// - `Configuration` without a key attribute
    /// - `UnresolvableAttribute` if the key attribute has no field
    /// - `TooManyMatches` if more records match than entries were given
    /// - `IngestFailed` if the lookup or the write fails
    pub fn update(
        &self,
        updates: Vec<(String, Record)>,
        key_attribute: Option<&str>,
    ) -> Result<Vec<Update>> {
        let key = require_key("Update", key_attribute)?;
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let updates: Vec<(String, Record)> = updates
            .into_iter()
            .map(|(raw, new)| {
                let format = new.record_type.descriptor(key).map(|d| d.format);
                (canonical_key(format, &raw), new)
            })
            .collect();

        let keys: Vec<&str> = updates.iter().map(|(k, _)| k.as_str()).collect();
        let (found, existing) = self.find_by_key(key, &keys, keys.len() + 1)?;
        if found > updates.len() as u64 {
            return Err(Error::TooManyMatches {
                expected: updates.len(),
                found,
            });
        }

        let mut by_key: HashMap<String, Record> = HashMap::with_capacity(existing.len());
        for record in existing {
            if let Some(attribute) = record.attribute(key) {
                for value in &attribute.values {
                    by_key.insert(value.to_key_string(), record.clone());
                }
            }
        }

        let modified = Utc::now();
        let mut documents = Vec::new();
        let mut applied = Vec::new();
        for (key_value, mut new) in updates {
            let Some(old) = by_key.get(&key_value) else {
                debug!(key = %key, value = %key_value, "No stored record for update key, skipping");
                continue;
            };

            if let Some(id) = old.id() {
                new.set_id(id);
            }
            if let Some(created) = old.attribute(CREATED) {
                new.set_values(CREATED, created.values.clone());
            }
            if new.record_type.descriptor(MODIFIED).is_some() {
                new.set_attribute(MODIFIED, modified);
            }
            if new.attribute(EFFECTIVE).is_none() && new.record_type.descriptor(EFFECTIVE).is_some() {
                new.set_attribute(EFFECTIVE, modified);
            }
            if new.source_id.is_none() {
                new.source_id = Some(self.config.local_source_id.clone());
            }

            documents.push(self.resolver.encode_record(&new)?);
            applied.push(Update {
                old: old.clone(),
                new,
            });
        }

        if documents.is_empty() {
            info!("No stored records matched the update keys");
            return Ok(applied);
        }
        self.write(documents)?;
        info!(count = applied.len(), "Updated records");
        Ok(applied)
    }

    /// Deletes the records whose `key_attribute` equals any of `keys` and
    /// returns them as they were stored.
    ///
    /// Always ends with a hard commit.
    ///
    /// # Errors
    ///
    /// - `Configuration` without a key attribute
    /// - `UnresolvableAttribute` if the key attribute has no field
    /// - `IngestFailed` if the lookup, the delete or the commit fails
    pub fn delete(&self, keys: Vec<String>, key_attribute: Option<&str>) -> Result<Vec<Record>> {
        let key = require_key("Delete", key_attribute)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (_, deleted) = self.find_by_key(key, &values, self.config.max_rows)?;

        let ids: Vec<String> = if key == ID {
            keys.clone()
        } else {
            deleted
                .iter()
                .filter_map(|r| r.id().map(str::to_string))
                .collect()
        };
        if !ids.is_empty() {
            self.client
                .delete_by_ids(&ids)
                .map_err(|e| {
                    Error::ingest_backend(format!("Delete of {} records failed: {e}", ids.len()), e)
                })?;
        }
        self.client
            .commit(CommitMode::Hard)
            .map_err(|e| Error::ingest_backend(format!("Commit after delete failed: {e}"), e))?;

        info!(requested = keys.len(), count = deleted.len(), "Deleted records");
        Ok(deleted)
    }

    fn assign_identity(&self, record: &mut Record) -> Result<()> {
        if record.id().is_some_and(|id| !id.is_empty()) {
            return Ok(());
        }
        if let Some(source) = record
            .source_id
            .as_deref()
            .filter(|s| *s != self.config.local_source_id)
        {
            return Err(Error::Configuration(format!(
                "Record from source '{source}' has no identifier"
            )));
        }
        record.set_id(Uuid::new_v4().simple().to_string());
        record.source_id = Some(self.config.local_source_id.clone());
        Ok(())
    }

    fn write(&self, documents: Vec<IndexDocument>) -> Result<()> {
        let count = documents.len();
        self.client
            .add(documents)
            .map_err(|e| Error::ingest_backend(format!("Write of {count} documents failed: {e}"), e))?;
        if self.config.forced_auto_commit {
            self.client
                .commit(CommitMode::Soft)
                .map_err(|e| Error::ingest_backend(format!("Soft commit failed: {e}"), e))?;
        }
        Ok(())
    }
}

/// Renders a caller key the way `AttributeValue::to_key_string` renders a
/// stored value of `format`. Text that does not parse is kept as given.
fn canonical_key(format: Option<AttributeFormat>, raw: &str) -> String {
    let trimmed = raw.trim();
    let canonical = match format {
        Some(AttributeFormat::Date) => DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|d| format_date(&d.with_timezone(&Utc))),
        Some(AttributeFormat::Short | AttributeFormat::Integer | AttributeFormat::Long) => {
            trimmed.parse::<i64>().ok().map(|v| v.to_string())
        }
        Some(AttributeFormat::Float) => trimmed.parse::<f32>().ok().map(|v| v.to_string()),
        Some(AttributeFormat::Double) => trimmed.parse::<f64>().ok().map(|v| v.to_string()),
        Some(AttributeFormat::Boolean) => trimmed
            .to_ascii_lowercase()
            .parse::<bool>()
            .ok()
            .map(|v| v.to_string()),
        _ => None,
    };
    canonical.unwrap_or_else(|| raw.to_string())
}

fn require_key<'a>(operation: &str, key_attribute: Option<&'a str>) -> Result<&'a str> {
    key_attribute
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::Configuration(format!("{operation} requires a key attribute")))
}
