use super::RawRow;
use crate::types::Date;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Why a sheet row cannot be reconciled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RowIssue {
    MissingField { field: &'static str },
    InvalidNumber { field: &'static str, value: String },
    InvalidDate { field: &'static str, value: String },
    InvertedWindow { valid_from: Date, valid_to: Date },
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::MissingField { field } => write!(f, "missing {field}"),
            RowIssue::InvalidNumber { field, value } => write!(f, "{field} '{value}' is not a number"),
            RowIssue::InvalidDate { field, value } => write!(f, "{field} '{value}' is not a date"),
            RowIssue::InvertedWindow {
                valid_from,
                valid_to,
            } => write!(f, "valid_to {valid_to} is before valid_from {valid_from}"),
        }
    }
}

/// Validation from a raw sheet row into a typed row.
pub trait FromRawRow: Sized {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub status: String,
    /// `None` keeps whatever URL the product already has.
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    pub code: String,
    pub name: String,
    pub sector_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub sku: String,
    pub store_code: Option<String>,
    pub price: f64,
    pub valid_from: Date,
    pub valid_to: Option<Date>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    pub sku: String,
    pub cost: f64,
    pub valid_from: Date,
    pub valid_to: Option<Date>,
}

/// Simplified layout row: the product and its current price/cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueRow {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub cost: Option<f64>,
    pub price: Option<f64>,
    pub photo_url: Option<String>,
}

pub const DEFAULT_STATUS: &str = "active";

impl FromRawRow for ProductRow {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue> {
        Ok(Self {
            sku: required(row, "sku")?,
            name: required(row, "name")?,
            brand: optional(row, "brand"),
            category: optional(row, "category"),
            status: optional(row, "status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            photo_url: optional(row, "photo_url"),
        })
    }
}

impl FromRawRow for StoreRow {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue> {
        Ok(Self {
            code: required(row, "code")?,
            name: required(row, "name")?,
            sector_id: optional(row, "sector_id"),
        })
    }
}

impl FromRawRow for PriceRow {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue> {
        let sku = required(row, "sku")?;
        let price = number(row, "price")?.ok_or(RowIssue::MissingField { field: "price" })?;
        let (valid_from, valid_to) = window(row)?;
        Ok(Self {
            sku,
            store_code: optional(row, "store_code"),
            price,
            valid_from,
            valid_to,
        })
    }
}

impl FromRawRow for CostRow {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue> {
        let sku = required(row, "sku")?;
        let cost = number(row, "cost")?.ok_or(RowIssue::MissingField { field: "cost" })?;
        let (valid_from, valid_to) = window(row)?;
        Ok(Self {
            sku,
            cost,
            valid_from,
            valid_to,
        })
    }
}

impl FromRawRow for CatalogueRow {
    fn from_raw(row: &RawRow) -> Result<Self, RowIssue> {
        Ok(Self {
            sku: required(row, "sku")?,
            name: required(row, "name")?,
            category: optional(row, "category"),
            cost: number(row, "cost")?,
            price: number(row, "price")?,
            photo_url: optional(row, "photo_url"),
        })
    }
}

// ── Cell helpers ───────────────────────────────────────────────

fn optional(row: &RawRow, field: &str) -> Option<String> {
    row.get(field).map(str::to_string)
}

fn required(row: &RawRow, field: &'static str) -> Result<String, RowIssue> {
    optional(row, field).ok_or(RowIssue::MissingField { field })
}

/// Blank is `Ok(None)`; present but unparseable is an issue.
fn number(row: &RawRow, field: &'static str) -> Result<Option<f64>, RowIssue> {
    let Some(text) = row.get(field) else {
        return Ok(None);
    };
    parse_number(text)
        .map(Some)
        .ok_or_else(|| RowIssue::InvalidNumber {
            field,
            value: text.to_string(),
        })
}

fn date(row: &RawRow, field: &'static str) -> Result<Option<Date>, RowIssue> {
    let Some(text) = row.get(field) else {
        return Ok(None);
    };
    parse_date(text)
        .map(Some)
        .ok_or_else(|| RowIssue::InvalidDate {
            field,
            value: text.to_string(),
        })
}

fn window(row: &RawRow) -> Result<(Date, Option<Date>), RowIssue> {
    let valid_from = date(row, "valid_from")?.ok_or(RowIssue::MissingField { field: "valid_from" })?;
    let valid_to = date(row, "valid_to")?;
    if let Some(to) = valid_to {
        if to < valid_from {
            return Err(RowIssue::InvertedWindow {
                valid_from,
                valid_to: to,
            });
        }
    }
    Ok((valid_from, valid_to))
}

/// Decimal text. A lone decimal comma (`12,50`) is accepted.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let normalized = if !text.contains('.') && text.matches(',').count() == 1 {
        text.replace(',', ".")
    } else {
        text.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Calendar date, or the date part of a date-time cell.
pub(crate) fn parse_date(text: &str) -> Option<Date> {
    let date_part = text
        .trim()
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Date {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn numbers_accept_decimal_comma() {
        assert_eq!(parse_number("12.50"), Some(12.5));
        assert_eq!(parse_number(" 12,50 "), Some(12.5));
        assert_eq!(parse_number("1,234.5"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn dates_accept_common_layouts() {
        assert_eq!(parse_date("2024-07-01"), Some(d("2024-07-01")));
        assert_eq!(parse_date("2024/07/01"), Some(d("2024-07-01")));
        assert_eq!(parse_date("01/07/2024"), Some(d("2024-07-01")));
        assert_eq!(parse_date("2024-07-01 00:00:00"), Some(d("2024-07-01")));
        assert_eq!(parse_date("2024-07-01T12:30:00Z"), Some(d("2024-07-01")));
        assert_eq!(parse_date("July 1st"), None);
    }

    #[test]
    fn product_defaults_status_and_blanks() {
        let raw = RawRow::new(2)
            .with("sku", " SKU-1 ")
            .with("name", "Widget")
            .with("brand", "")
            .with("photo_url", "   ");
        let row = ProductRow::from_raw(&raw).unwrap();
        assert_eq!(row.sku, "SKU-1");
        assert_eq!(row.status, "active");
        assert_eq!(row.brand, None);
        assert_eq!(row.photo_url, None);
    }

    #[test]
    fn price_row_requires_sku_value_and_start() {
        let base = RawRow::new(2).with("sku", "SKU-1").with("price", "12").with("valid_from", "2024-01-01");
        assert!(PriceRow::from_raw(&base).is_ok());

        let no_price = base.clone().with("price", "");
        assert_eq!(
            PriceRow::from_raw(&no_price),
            Err(RowIssue::MissingField { field: "price" })
        );
        let no_start = base.clone().with("valid_from", "");
        assert_eq!(
            PriceRow::from_raw(&no_start),
            Err(RowIssue::MissingField { field: "valid_from" })
        );
        let no_sku = base.clone().with("sku", "");
        assert_eq!(
            PriceRow::from_raw(&no_sku),
            Err(RowIssue::MissingField { field: "sku" })
        );
    }

    #[test]
    fn wrong_type_is_the_same_kind_of_issue_as_missing() {
        let raw = RawRow::new(3).with("sku", "SKU-1").with("cost", "cheap").with("valid_from", "2024-01-01");
        assert!(matches!(
            CostRow::from_raw(&raw),
            Err(RowIssue::InvalidNumber { field: "cost", .. })
        ));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let raw = RawRow::new(2)
            .with("sku", "SKU-1")
            .with("cost", "8")
            .with("valid_from", "2024-06-30")
            .with("valid_to", "2024-01-01");
        assert!(matches!(
            CostRow::from_raw(&raw),
            Err(RowIssue::InvertedWindow { .. })
        ));
    }

    #[test]
    fn catalogue_values_are_optional() {
        let raw = RawRow::new(2).with("sku", "SKU-9").with("name", "Loose item");
        let row = CatalogueRow::from_raw(&raw).unwrap();
        assert_eq!(row.price, None);
        assert_eq!(row.cost, None);
    }
}
