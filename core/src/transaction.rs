//! Validated transaction tables.
//!
//! Sales and returns are held as plain row vectors. Every engine takes them
//! by shared slice and never mutates them.

use crate::{
    error::{AnalysisError, AnalysisResult, RowViolation},
    types::{CustomerId, InvoiceNo},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One purchased line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTransaction {
    pub invoice_no:    InvoiceNo,
    pub stock_code:    String,
    pub description:   Option<String>,
    pub quantity:      i64,
    pub invoice_date:  NaiveDate,
    pub unit_price:    f64,
    pub customer_id:   CustomerId,
    pub country:       String,
    pub total_revenue: f64,
}

impl SalesTransaction {
    /// Build a line item with revenue derived from quantity and unit price.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_no: impl Into<String>,
        stock_code: impl Into<String>,
        description: Option<String>,
        quantity: i64,
        invoice_date: NaiveDate,
        unit_price: f64,
        customer_id: CustomerId,
        country: impl Into<String>,
    ) -> Self {
        Self {
            invoice_no: invoice_no.into(),
            stock_code: stock_code.into(),
            description,
            quantity,
            invoice_date,
            unit_price,
            customer_id,
            country: country.into(),
            total_revenue: quantity as f64 * unit_price,
        }
    }
}

/// A reversed line item. Quantity is negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnTransaction {
    pub invoice_no:   InvoiceNo,
    pub stock_code:   String,
    pub description:  Option<String>,
    pub quantity:     i64,
    pub invoice_date: NaiveDate,
    pub unit_price:   f64,
    pub customer_id:  Option<CustomerId>,
    pub country:      String,
}

/// Check every sales row against the table constraints.
///
/// Validation is lazy: all offending rows are collected before failing.
pub fn validate_sales(dataset: &str, sales: &[SalesTransaction]) -> AnalysisResult<()> {
    let mut violations = Vec::new();

    for (row, txn) in sales.iter().enumerate() {
        let mut flag = |field: &str, reason: String| {
            violations.push(RowViolation {
                row,
                invoice_no: txn.invoice_no.clone(),
                field: field.to_string(),
                reason,
            });
        };

        if txn.invoice_no.trim().is_empty() {
            flag("InvoiceNo", "must not be empty".into());
        }
        if txn.stock_code.trim().is_empty() {
            flag("StockCode", "must not be empty".into());
        }
        if txn.quantity <= 0 {
            flag("Quantity", format!("must be > 0, got {}", txn.quantity));
        }
        if !(txn.unit_price.is_finite() && txn.unit_price > 0.0) {
            flag("UnitPrice", format!("must be > 0, got {}", txn.unit_price));
        }
        if !(txn.total_revenue.is_finite() && txn.total_revenue >= 0.0) {
            flag("TotalRevenue", format!("must be >= 0, got {}", txn.total_revenue));
        }
        if txn.customer_id.0 < 0 {
            flag("CustomerID", format!("must be non-negative, got {}", txn.customer_id));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        for v in &violations {
            log::error!("{dataset}: {v}");
        }
        Err(AnalysisError::SchemaViolation {
            dataset: dataset.to_string(),
            violations,
        })
    }
}
