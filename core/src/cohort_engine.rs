//! Cohort comparison engine: basket and product mix of two segments.
//!
//! Given the sales table and the RFM table, this engine:
//!   1. Selects each segment's line items by customer membership
//!   2. Measures average basket size / value and product breadth
//!   3. Ranks products by revenue within each segment
//!   4. Splits the product codes into shared and exclusive sets
//!
//! Depends on: rfm_engine. Pure; neither input is modified.

use crate::{
    config::CohortSettings,
    rfm_engine::RfmTable,
    transaction::SalesTransaction,
    types::Segment,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub stock_code:  String,
    pub description: Option<String>,
    pub revenue:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketMetrics {
    pub customers:        usize,
    pub invoices:         usize,
    /// Mean over invoices of summed quantity. `None` when the cohort bought nothing.
    pub avg_basket_size:  Option<f64>,
    /// Mean over invoices of summed revenue.
    pub avg_basket_value: Option<f64>,
    pub unique_products:  usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCohort {
    pub segment:       Segment,
    pub metrics:       BasketMetrics,
    pub top_products:  Vec<ProductRevenue>,
    pub product_codes: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOverlap {
    pub common:      BTreeSet<String>,
    pub first_only:  BTreeSet<String>,
    pub second_only: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortComparison {
    pub first:   SegmentCohort,
    pub second:  SegmentCohort,
    pub overlap: ProductOverlap,
    /// Highest-revenue products bought only by the first segment.
    pub first_only_top: Vec<ProductRevenue>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Line items belonging to customers of `segment`.
pub fn segment_transactions<'a>(
    sales: &'a [SalesTransaction],
    rfm: &RfmTable,
    segment: Segment,
) -> Vec<&'a SalesTransaction> {
    let members = rfm.customers_in(segment);
    sales
        .iter()
        .filter(|t| members.contains(&t.customer_id))
        .collect()
}

pub fn basket_metrics(txns: &[&SalesTransaction], customers: usize) -> BasketMetrics {
    let mut baskets: HashMap<&str, (i64, f64)> = HashMap::new();
    for t in txns {
        let b = baskets.entry(t.invoice_no.as_str()).or_insert((0, 0.0));
        b.0 += t.quantity;
        b.1 += t.total_revenue;
    }

    let invoices = baskets.len();
    let (avg_basket_size, avg_basket_value) = if invoices == 0 {
        (None, None)
    } else {
        let qty: i64 = baskets.values().map(|b| b.0).sum();
        let rev: f64 = baskets.values().map(|b| b.1).sum();
        (Some(qty as f64 / invoices as f64), Some(rev / invoices as f64))
    };

    let unique_products = txns
        .iter()
        .map(|t| t.stock_code.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    BasketMetrics {
        customers,
        invoices,
        avg_basket_size,
        avg_basket_value,
        unique_products,
    }
}

/// Products grouped by code + description, highest revenue first.
///
/// Ties are broken by code then description so the ranking is stable.
pub fn product_revenue<'a, I>(txns: I) -> Vec<ProductRevenue>
where
    I: IntoIterator<Item = &'a SalesTransaction>,
{
    let mut grouped: HashMap<(&str, Option<&str>), f64> = HashMap::new();
    for t in txns {
        *grouped
            .entry((t.stock_code.as_str(), t.description.as_deref()))
            .or_insert(0.0) += t.total_revenue;
    }

    let mut ranked: Vec<ProductRevenue> = grouped
        .into_iter()
        .map(|((code, desc), revenue)| ProductRevenue {
            stock_code:  code.to_string(),
            description: desc.map(str::to_string),
            revenue,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.stock_code.cmp(&b.stock_code))
            .then_with(|| a.description.cmp(&b.description))
    });
    ranked
}

fn build_cohort<'a>(
    sales: &'a [SalesTransaction],
    rfm: &RfmTable,
    segment: Segment,
    top_n: usize,
) -> (SegmentCohort, Vec<&'a SalesTransaction>) {
    let txns = segment_transactions(sales, rfm, segment);
    let customers = rfm.customers_in(segment).len();

    let mut top_products = product_revenue(txns.iter().copied());
    top_products.truncate(top_n);

    let cohort = SegmentCohort {
        segment,
        metrics: basket_metrics(&txns, customers),
        top_products,
        product_codes: txns.iter().map(|t| t.stock_code.clone()).collect(),
    };
    (cohort, txns)
}

/// Compare the basket and product mix of two segments.
pub fn compare_segments(
    sales: &[SalesTransaction],
    rfm: &RfmTable,
    first: Segment,
    second: Segment,
    settings: &CohortSettings,
) -> CohortComparison {
    let (first_cohort, first_txns) = build_cohort(sales, rfm, first, settings.top_products);
    let (second_cohort, _) = build_cohort(sales, rfm, second, settings.top_products);

    let overlap = ProductOverlap {
        common: first_cohort
            .product_codes
            .intersection(&second_cohort.product_codes)
            .cloned()
            .collect(),
        first_only: first_cohort
            .product_codes
            .difference(&second_cohort.product_codes)
            .cloned()
            .collect(),
        second_only: second_cohort
            .product_codes
            .difference(&first_cohort.product_codes)
            .cloned()
            .collect(),
    };

    let mut first_only_top = product_revenue(
        first_txns
            .iter()
            .copied()
            .filter(|t| overlap.first_only.contains(&t.stock_code)),
    );
    first_only_top.truncate(settings.top_exclusive_products);

    log::debug!(
        "cohort: {first} ({} customers) vs {second} ({} customers), {} shared products",
        first_cohort.metrics.customers,
        second_cohort.metrics.customers,
        overlap.common.len(),
    );

    CohortComparison {
        first: first_cohort,
        second: second_cohort,
        overlap,
        first_only_top,
    }
}
