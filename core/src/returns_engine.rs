//! Return-rate engine: return friction per customer and per segment.
//!
//! This engine:
//!   1. Folds return invoices per customer (non-null customers only)
//!   2. Folds sales per customer and outer-joins the returns onto them
//!   3. Derives order and item return rates per customer
//!   4. Aggregates per segment, both as a rate of sums and a mean of rates
//!   5. Compares the scrutinised segment against the baseline
//!
//! Depends on: rfm_engine. A missing returns dataset is not an error: the
//! analysis runs as if nothing was returned and says so.

use crate::{
    rfm_engine::RfmTable,
    transaction::{ReturnTransaction, SalesTransaction},
    types::{CustomerId, Segment},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerReturnMetrics {
    pub customer_id:      CustomerId,
    pub segment:          Segment,
    pub return_count:     i64,
    pub returned_items:   i64,
    pub order_count:      i64,
    pub purchased_items:  i64,
    /// return_count / order_count × 100
    pub return_rate:      f64,
    /// returned_items / purchased_items × 100
    pub item_return_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReturnSummary {
    pub segment:                  Segment,
    pub customers:                usize,
    pub return_count:             i64,
    pub order_count:              i64,
    pub returned_items:           i64,
    pub purchased_items:          i64,
    /// Rate of the summed counts.
    pub overall_return_rate:      f64,
    pub overall_item_return_rate: f64,
    /// Mean of each customer's own rate.
    pub mean_return_rate:         f64,
    pub mean_item_return_rate:    f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnSignal {
    /// The scrutinised segment returns more than the baseline.
    ElevatedRisk,
    LowerThanBaseline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnComparison {
    pub first:       Segment,
    pub second:      Segment,
    pub first_rate:  f64,
    pub second_rate: f64,
    /// first_rate − second_rate, in percentage points.
    pub difference:  f64,
    pub signal:      ChurnSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnAnalysis {
    /// False when no returns dataset was supplied; every count is then zero.
    pub returns_available: bool,
    /// Return rows supplied, before dropping rows without a customer.
    pub return_records:    usize,
    pub customers:         Vec<CustomerReturnMetrics>,
    /// One entry per segment that has customers, in `Segment::ALL` order.
    pub segments:          Vec<SegmentReturnSummary>,
    /// Present only when both compared segments have customers.
    pub comparison:        Option<ReturnComparison>,
}

impl ReturnAnalysis {
    pub fn segment(&self, segment: Segment) -> Option<&SegmentReturnSummary> {
        self.segments.iter().find(|s| s.segment == segment)
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally<'a> {
    invoices: HashSet<&'a str>,
    items:    i64,
}

fn percent(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

pub fn analyze_returns(
    returns: Option<&[ReturnTransaction]>,
    sales: &[SalesTransaction],
    rfm: &RfmTable,
    first: Segment,
    second: Segment,
) -> ReturnAnalysis {
    let returns_available = returns.is_some();
    if !returns_available {
        log::warn!("returns: no returns dataset, assuming zero returns");
    }
    let returns = returns.unwrap_or_default();

    let mut returned: BTreeMap<CustomerId, Tally<'_>> = BTreeMap::new();
    for r in returns {
        let Some(customer_id) = r.customer_id else {
            continue;
        };
        let t = returned.entry(customer_id).or_default();
        t.invoices.insert(r.invoice_no.as_str());
        t.items += r.quantity.abs();
    }

    let mut sold: BTreeMap<CustomerId, Tally<'_>> = BTreeMap::new();
    for s in sales {
        let t = sold.entry(s.customer_id).or_default();
        t.invoices.insert(s.invoice_no.as_str());
        t.items += s.quantity;
    }

    // Sales population drives the join; customers outside the RFM table drop out.
    let customers: Vec<CustomerReturnMetrics> = sold
        .iter()
        .filter_map(|(&customer_id, sales_tally)| {
            let segment = rfm.segment_of(customer_id)?;
            let (return_count, returned_items) = returned
                .get(&customer_id)
                .map(|t| (t.invoices.len() as i64, t.items))
                .unwrap_or((0, 0));
            let order_count = sales_tally.invoices.len() as i64;
            let purchased_items = sales_tally.items;
            Some(CustomerReturnMetrics {
                customer_id,
                segment,
                return_count,
                returned_items,
                order_count,
                purchased_items,
                return_rate: percent(return_count, order_count),
                item_return_rate: percent(returned_items, purchased_items),
            })
        })
        .collect();

    let segments: Vec<SegmentReturnSummary> = Segment::ALL
        .into_iter()
        .filter_map(|segment| summarize_segment(segment, &customers))
        .collect();

    let comparison = compare(&segments, first, second);

    ReturnAnalysis {
        returns_available,
        return_records: returns.len(),
        customers,
        segments,
        comparison,
    }
}

fn summarize_segment(
    segment: Segment,
    customers: &[CustomerReturnMetrics],
) -> Option<SegmentReturnSummary> {
    let members: Vec<&CustomerReturnMetrics> =
        customers.iter().filter(|c| c.segment == segment).collect();
    if members.is_empty() {
        return None;
    }

    let n = members.len() as f64;
    let return_count: i64 = members.iter().map(|c| c.return_count).sum();
    let order_count: i64 = members.iter().map(|c| c.order_count).sum();
    let returned_items: i64 = members.iter().map(|c| c.returned_items).sum();
    let purchased_items: i64 = members.iter().map(|c| c.purchased_items).sum();

    Some(SegmentReturnSummary {
        segment,
        customers: members.len(),
        return_count,
        order_count,
        returned_items,
        purchased_items,
        overall_return_rate: percent(return_count, order_count),
        overall_item_return_rate: percent(returned_items, purchased_items),
        mean_return_rate: members.iter().map(|c| c.return_rate).sum::<f64>() / n,
        mean_item_return_rate: members.iter().map(|c| c.item_return_rate).sum::<f64>() / n,
    })
}

fn compare(
    segments: &[SegmentReturnSummary],
    first: Segment,
    second: Segment,
) -> Option<ReturnComparison> {
    let a = segments.iter().find(|s| s.segment == first)?;
    let b = segments.iter().find(|s| s.segment == second)?;
    let difference = a.overall_return_rate - b.overall_return_rate;
    Some(ReturnComparison {
        first,
        second,
        first_rate: a.overall_return_rate,
        second_rate: b.overall_return_rate,
        difference,
        signal: if difference > 0.0 {
            ChurnSignal::ElevatedRisk
        } else {
            ChurnSignal::LowerThanBaseline
        },
    })
}
