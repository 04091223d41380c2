//! Typed extraction of front-matter values.
//!
//! The markdown engine hands back front matter as a loosely typed map
//! ([`Metadata`]). An [`Extractor`] wraps that map together with a label
//! (the entry slug, or its source path when the slug is missing) and
//! converts individual keys into typed values.
//!
//! ## Rules
//!
//! - `get_*` accessors return a default when the key is absent.
//! - `require_*` accessors fail with [`MetadataError::MissingField`].
//! - A key that is present with the wrong type fails with
//!   [`MetadataError::WrongType`]; there is no coercion between types.
//! - A key whose value is YAML `null` (`updated:` with nothing after it)
//!   counts as absent.
//!
//! ## Dates
//!
//! Date fields accept a calendar date (`2024-01-05`) or an RFC 3339
//! timestamp (`2024-01-05T10:30:00+02:00`). Both are converted into a
//! [`DateStamp`]: a long display form (`January 5, 2024`) and a UNIX
//! timestamp. Date-only values are pinned to midnight UTC.

use crate::types::DateStamp;
use chrono::{DateTime, NaiveDate};
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw front matter, keyed by field name.
pub type Metadata = BTreeMap<String, Value>;

/// Display format for dates, e.g. `January 2, 2006`.
const DATE_DISPLAY: &str = "%B %-d, %Y";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{key} is required [{label}]")]
    MissingField { key: String, label: String },
    #[error("{key} is not a valid date: {raw:?} [{label}]")]
    InvalidDate {
        key: String,
        label: String,
        raw: String,
    },
    #[error("{key} must be a {expected} [{label}]")]
    WrongType {
        key: String,
        label: String,
        expected: &'static str,
    },
}

/// Reads typed fields out of one entry's front matter.
pub struct Extractor<'a> {
    metadata: &'a Metadata,
    label: String,
}

impl<'a> Extractor<'a> {
    pub fn new(metadata: &'a Metadata, label: impl Into<String>) -> Self {
        Self {
            metadata,
            label: label.into(),
        }
    }

    /// The label used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, MetadataError> {
        match self.lookup(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.wrong_type(key, "boolean")),
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> Result<String, MetadataError> {
        match self.lookup(key) {
            None => Ok(default.to_string()),
            Some(value) => self.as_string(key, value),
        }
    }

    pub fn require_string(&self, key: &str) -> Result<String, MetadataError> {
        let value = self.lookup(key).ok_or_else(|| self.missing(key))?;
        self.as_string(key, value)
    }

    /// Parse an optional date field. Absent keys yield `None`.
    pub fn get_date(&self, key: &str) -> Result<Option<DateStamp>, MetadataError> {
        match self.lookup(key) {
            None => Ok(None),
            Some(value) => self.as_date(key, value).map(Some),
        }
    }

    pub fn require_date(&self, key: &str) -> Result<DateStamp, MetadataError> {
        let value = self.lookup(key).ok_or_else(|| self.missing(key))?;
        self.as_date(key, value)
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        self.metadata.get(key).filter(|v| !v.is_null())
    }

    fn as_string(&self, key: &str, value: &Value) -> Result<String, MetadataError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.wrong_type(key, "string"))
    }

    fn as_date(&self, key: &str, value: &Value) -> Result<DateStamp, MetadataError> {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err(self.wrong_type(key, "date")),
        };
        parse_date(&raw).ok_or_else(|| MetadataError::InvalidDate {
            key: key.to_string(),
            label: self.label.clone(),
            raw,
        })
    }

    fn missing(&self, key: &str) -> MetadataError {
        MetadataError::MissingField {
            key: key.to_string(),
            label: self.label.clone(),
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> MetadataError {
        MetadataError::WrongType {
            key: key.to_string(),
            label: self.label.clone(),
            expected,
        }
    }
}

/// Parse a calendar date or RFC 3339 timestamp into a [`DateStamp`].
pub fn parse_date(raw: &str) -> Option<DateStamp> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
        return Some(DateStamp {
            display: date.format(DATE_DISPLAY).to_string(),
            timestamp: midnight.timestamp(),
        });
    }
    let instant = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(DateStamp {
        display: instant.format(DATE_DISPLAY).to_string(),
        timestamp: instant.timestamp(),
    })
}
