//! Ingest stage: raw retail export into validated tables.
//!
//! RULE: nothing downstream of this module sees an unvalidated row.
//!
//! Steps, in order:
//!   1. Drop rows without a customer identifier
//!   2. Normalise invoice timestamps to the day
//!   3. Route return-marked invoices to the returns table
//!   4. Keep sales with quantity > 0 and unit price > 0, derive revenue
//!   5. Validate every kept row, collecting all violations
//!   6. Build the calendar dimension over the sales date range

use crate::{
    config::IngestSettings,
    error::{AnalysisError, AnalysisResult, RowViolation},
    transaction::{validate_sales, ReturnTransaction, SalesTransaction},
    types::CustomerId,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

// ── Raw export ───────────────────────────────────────────────────────────────

/// One row of the raw export, as delivered.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "InvoiceNo", deserialize_with = "string_or_number")]
    pub invoice_no:   String,
    #[serde(rename = "StockCode", deserialize_with = "string_or_number")]
    pub stock_code:   String,
    #[serde(rename = "Description", default)]
    pub description:  Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity:     i64,
    #[serde(rename = "InvoiceDate")]
    pub invoice_date: String,
    #[serde(rename = "UnitPrice")]
    pub unit_price:   f64,
    #[serde(rename = "CustomerID", default)]
    pub customer_id:  Option<f64>,
    #[serde(rename = "Country")]
    pub country:      String,
}

/// Codes arrive as either JSON strings or numbers (spreadsheet exports).
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Read a raw export: a JSON array of rows.
pub fn load_raw_records(path: &str) -> AnalysisResult<Vec<RawRecord>> {
    if !Path::new(path).exists() {
        return Err(AnalysisError::MissingInput {
            location: path.to_string(),
        });
    }
    log::info!("Ingesting {path}...");
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Parse a raw timestamp and drop the time of day.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

// ── Calendar dimension ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date:        NaiveDate,
    pub year:        i32,
    pub quarter:     u32,
    pub month:       u32,
    pub month_name:  String,
    pub week:        u32,
    /// Monday = 0.
    pub day_of_week: u32,
    pub day_name:    String,
}

/// One row per day from `start` to `end` inclusive.
pub fn calendar_dimension(start: NaiveDate, end: NaiveDate) -> Vec<CalendarDay> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| CalendarDay {
            date,
            year:        date.year(),
            quarter:     (date.month() - 1) / 3 + 1,
            month:       date.month(),
            month_name:  date.format("%B").to_string(),
            week:        date.iso_week().week(),
            day_of_week: date.weekday().num_days_from_monday(),
            day_name:    date.format("%A").to_string(),
        })
        .collect()
}

// ── Processing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub sales:    Vec<SalesTransaction>,
    pub returns:  Vec<ReturnTransaction>,
    pub calendar: Vec<CalendarDay>,
}

fn violation(row: usize, raw: &RawRecord, field: &str, reason: String) -> RowViolation {
    RowViolation {
        row,
        invoice_no: raw.invoice_no.clone(),
        field: field.to_string(),
        reason,
    }
}

/// Split and validate a raw export. Fails with every offending row at once.
pub fn process_records(raw: &[RawRecord], settings: &IngestSettings) -> AnalysisResult<IngestOutput> {
    let mut sales = Vec::new();
    let mut returns = Vec::new();
    let mut violations = Vec::new();
    let mut dropped_anonymous = 0usize;
    let mut dropped_invalid = 0usize;
    let mut skipped_returns = 0usize;

    for (row, rec) in raw.iter().enumerate() {
        let Some(raw_customer) = rec.customer_id else {
            dropped_anonymous += 1;
            continue;
        };

        let is_return = rec.invoice_no.starts_with(settings.return_marker.as_str());
        let date = normalize_date(&rec.invoice_date);
        let customer = CustomerId::from_f64(raw_customer);

        if is_return {
            // Unreadable returns are skipped, never reported as violations.
            match (date, customer) {
                (Some(invoice_date), Some(customer_id)) => returns.push(ReturnTransaction {
                    invoice_no: rec.invoice_no.clone(),
                    stock_code: rec.stock_code.clone(),
                    description: rec.description.clone(),
                    quantity: rec.quantity,
                    invoice_date,
                    unit_price: rec.unit_price,
                    customer_id: Some(customer_id),
                    country: rec.country.clone(),
                }),
                _ => {
                    log::warn!(
                        "raw export: skipping return row {row} (invoice {}): date '{}', customer {raw_customer}",
                        rec.invoice_no,
                        rec.invoice_date
                    );
                    skipped_returns += 1;
                }
            }
            continue;
        }

        if rec.quantity <= 0 || rec.unit_price <= 0.0 {
            dropped_invalid += 1;
            continue;
        }

        let Some(invoice_date) = date else {
            violations.push(violation(
                row, rec, "InvoiceDate",
                format!("unparseable timestamp '{}'", rec.invoice_date),
            ));
            continue;
        };
        let Some(customer_id) = customer else {
            violations.push(violation(
                row, rec, "CustomerID",
                format!("not a non-negative integral key: {raw_customer}"),
            ));
            continue;
        };

        sales.push(SalesTransaction::new(
            rec.invoice_no.clone(),
            rec.stock_code.clone(),
            rec.description.clone(),
            rec.quantity,
            invoice_date,
            rec.unit_price,
            customer_id,
            rec.country.clone(),
        ));
    }

    if !violations.is_empty() {
        for v in &violations {
            log::error!("raw export: {v}");
        }
        return Err(AnalysisError::SchemaViolation {
            dataset: "raw export".into(),
            violations,
        });
    }
    validate_sales("sales", &sales)?;

    let calendar = match (
        sales.iter().map(|t| t.invoice_date).min(),
        sales.iter().map(|t| t.invoice_date).max(),
    ) {
        (Some(start), Some(end)) => calendar_dimension(start, end),
        _ => Vec::new(),
    };

    log::debug!(
        "ingest: dropped {dropped_anonymous} rows without customer, {dropped_invalid} non-positive sales rows, \
         {skipped_returns} unreadable return rows"
    );
    log::info!("Processed {} sales, {} returns", sales.len(), returns.len());

    Ok(IngestOutput { sales, returns, calendar })
}
