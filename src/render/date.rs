//! strftime-style date formatting with an ISO-8601 fallback.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use std::fmt::Write;

/// Pattern used when a Date field declares none.
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Format `instant` (in UTC) with a strftime pattern.
///
/// A pattern chrono cannot apply degrades to the ISO-8601 form
/// (`2024-06-30T12:00:00.000Z`) and is logged; it never fails.
pub fn format_date(instant: DateTime<Utc>, pattern: &str) -> String {
    match try_format(instant, pattern) {
        Some(text) => text,
        None => {
            let iso = iso_string(instant);
            warn!(
                "Failed to format date {} with pattern {:?}, using {}",
                instant, pattern, iso
            );
            iso
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_string(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn try_format(instant: DateTime<Utc>, pattern: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }

    let mut out = String::new();
    write!(out, "{}", instant.format_with_items(items.iter())).ok()?;
    Some(out)
}
