//! Flag parsing for catalog-admin. Flags are plain `--name value` pairs;
//! a flag followed by another flag has no value.

use anyhow::{Context, Result};
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Value of the first occurrence of `flag`.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .filter(|v| !v.starts_with("--"))
}

/// Values of every occurrence of a repeatable flag, in order.
pub fn flag_values(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag && !w[1].starts_with("--"))
        .map(|w| w[1].clone())
        .collect()
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// `--as-of` as a date, or `today` when the flag is absent.
pub fn parse_as_of(value: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .with_context(|| format!("--as-of '{s}' is not a YYYY-MM-DD date")),
        None => Ok(today),
    }
}
