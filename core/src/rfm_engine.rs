//! RFM computation engine: one scored, segmented record per customer.
//!
//! This engine:
//!   1. Fixes the snapshot date (latest invoice date + offset)
//!   2. Folds line items into per-customer Recency / Frequency / Monetary
//!   3. Scores R and M by quantile cut, F by percentile rank + fixed bins
//!   4. Classifies each customer into exactly one Segment
//!
//! Runs first. Cohort and return analyses join against its output.

use crate::{
    binning::{fixed_cut, percentile_rank, quantile_cut, PERCENTILE_EDGES},
    config::RfmSettings,
    error::{AnalysisError, AnalysisResult},
    transaction::SalesTransaction,
    types::{CustomerId, Segment},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmScores {
    pub r: u8,
    pub f: u8,
    pub m: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRfm {
    pub customer_id: CustomerId,
    pub recency:     i64,
    pub frequency:   i64,
    pub monetary:    f64,
    pub r_score:     u8,
    pub f_score:     u8,
    pub m_score:     u8,
    pub segment:     Segment,
}

impl CustomerRfm {
    pub fn scores(&self) -> RfmScores {
        RfmScores {
            r: self.r_score,
            f: self.f_score,
            m: self.m_score,
        }
    }
}

/// Mean raw metrics of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment:        Segment,
    pub customers:      usize,
    pub mean_recency:   f64,
    pub mean_frequency: f64,
    pub mean_monetary:  f64,
}

/// The output of record: one row per customer, ordered by customer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmTable {
    pub snapshot_date: NaiveDate,
    pub records:       Vec<CustomerRfm>,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, customer_id: CustomerId) -> Option<&CustomerRfm> {
        self.records
            .binary_search_by_key(&customer_id, |r| r.customer_id)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn segment_of(&self, customer_id: CustomerId) -> Option<Segment> {
        self.get(customer_id).map(|r| r.segment)
    }

    pub fn customers_in(&self, segment: Segment) -> HashSet<CustomerId> {
        self.records
            .iter()
            .filter(|r| r.segment == segment)
            .map(|r| r.customer_id)
            .collect()
    }

    /// Customer count per segment. Segments with no customers are omitted.
    pub fn segment_counts(&self) -> BTreeMap<Segment, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.segment).or_insert(0) += 1;
        }
        counts
    }

    pub fn segment_profiles(&self) -> Vec<SegmentProfile> {
        let mut sums: BTreeMap<Segment, (usize, f64, f64, f64)> = BTreeMap::new();
        for r in &self.records {
            let e = sums.entry(r.segment).or_insert((0, 0.0, 0.0, 0.0));
            e.0 += 1;
            e.1 += r.recency as f64;
            e.2 += r.frequency as f64;
            e.3 += r.monetary;
        }
        sums.into_iter()
            .map(|(segment, (n, rec, freq, mon))| SegmentProfile {
                segment,
                customers:      n,
                mean_recency:   rec / n as f64,
                mean_frequency: freq / n as f64,
                mean_monetary:  mon / n as f64,
            })
            .collect()
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Latest invoice date plus the configured offset.
pub fn snapshot_date(sales: &[SalesTransaction], offset_days: i64) -> AnalysisResult<NaiveDate> {
    sales
        .iter()
        .map(|t| t.invoice_date)
        .max()
        .map(|latest| latest + Duration::days(offset_days))
        .ok_or_else(|| AnalysisError::DegenerateDistribution {
            metric: "recency",
            reason: "no sales transactions to derive a snapshot from".into(),
        })
}

/// First matching rule wins. Frequency here is the raw invoice count, not
/// the F score: a single-invoice customer can still rank above F=1.
pub fn classify(scores: RfmScores, frequency: i64) -> Segment {
    match (scores.r, scores.f, scores.m) {
        (5.., 4.., 4..)                  => Segment::Champion,
        (..=2, _, 4..)                   => Segment::AtRisk,
        (4.., _, _) if frequency == 1    => Segment::NewCustomer,
        _                                => Segment::Standard,
    }
}

struct CustomerAccumulator<'a> {
    last_invoice: NaiveDate,
    invoices:     HashSet<&'a str>,
    monetary:     f64,
}

/// Reduce the sales table to one scored record per customer.
pub fn build_rfm(sales: &[SalesTransaction], settings: &RfmSettings) -> AnalysisResult<RfmTable> {
    settings.validate()?;
    let snapshot = snapshot_date(sales, settings.snapshot_offset_days)?;

    let mut customers: BTreeMap<CustomerId, CustomerAccumulator<'_>> = BTreeMap::new();
    for txn in sales {
        let acc = customers
            .entry(txn.customer_id)
            .or_insert_with(|| CustomerAccumulator {
                last_invoice: txn.invoice_date,
                invoices:     HashSet::new(),
                monetary:     0.0,
            });
        acc.last_invoice = acc.last_invoice.max(txn.invoice_date);
        acc.invoices.insert(txn.invoice_no.as_str());
        acc.monetary += txn.total_revenue;
    }

    let ids: Vec<CustomerId> = customers.keys().copied().collect();
    let recency: Vec<i64> = customers
        .values()
        .map(|acc| (snapshot - acc.last_invoice).num_days())
        .collect();
    let frequency: Vec<i64> = customers.values().map(|acc| acc.invoices.len() as i64).collect();
    let monetary: Vec<f64> = customers.values().map(|acc| acc.monetary).collect();

    let recency_f: Vec<f64> = recency.iter().map(|&d| d as f64).collect();
    let frequency_f: Vec<f64> = frequency.iter().map(|&f| f as f64).collect();

    let r_scores = quantile_cut("recency", &recency_f, &[5, 4, 3, 2, 1])?;
    let f_scores = fixed_cut(
        "frequency",
        &percentile_rank(&frequency_f),
        &PERCENTILE_EDGES,
        &[1, 2, 3, 4, 5],
    )?;
    let m_scores = quantile_cut("monetary", &monetary, &[1, 2, 3, 4, 5])?;

    let records: Vec<CustomerRfm> = (0..ids.len())
        .map(|i| {
            let scores = RfmScores {
                r: r_scores[i],
                f: f_scores[i],
                m: m_scores[i],
            };
            CustomerRfm {
                customer_id: ids[i],
                recency:     recency[i],
                frequency:   frequency[i],
                monetary:    monetary[i],
                r_score:     scores.r,
                f_score:     scores.f,
                m_score:     scores.m,
                segment:     classify(scores, frequency[i]),
            }
        })
        .collect();

    log::debug!(
        "rfm: scored {} customers against snapshot {snapshot}",
        records.len()
    );

    Ok(RfmTable {
        snapshot_date: snapshot,
        records,
    })
}
