//! Input limits for user-editable event fields
//!
//! Violations surface as `Error::InvalidInput` and map to HTTP 400.

use crate::error::{Error, Result};
use crate::event::EventFields;
use chrono::NaiveDate;

/// Default maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Date format accepted on the wire
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Limits applied when validating event input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum title length in characters (default: 200)
    pub max_title_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_title_chars: MAX_TITLE_CHARS,
        }
    }
}

impl Limits {
    /// Validate a title: trimmed, non-empty, within `max_title_chars`
    pub fn validate_title(&self, title: &str) -> Result<String> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_input("title", "title cannot be empty"));
        }
        let chars = trimmed.chars().count();
        if chars > self.max_title_chars {
            return Err(Error::invalid_input(
                "title",
                format!("{} characters exceeds max {}", chars, self.max_title_chars),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// Parse a `YYYY-MM-DD` calendar date
    pub fn parse_date(&self, date: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|_| Error::invalid_input("date", format!("'{}' is not a YYYY-MM-DD date", date)))
    }

    /// Validate both editable fields
    pub fn validate_fields(&self, title: &str, date: &str) -> Result<EventFields> {
        Ok(EventFields {
            title: self.validate_title(title)?,
            date: self.parse_date(date)?,
        })
    }
}
