//! Ordinal score binning.
//!
//! Two strategies feed the RFM scores:
//!   - `quantile_cut`: equal-population bins over the raw values.
//!   - `percentile_rank` + `fixed_cut`: for heavily tied metrics, where
//!     quantile edges would collapse.
//!
//! RULE: neither strategy ever produces fewer bins than asked for. A
//! population that cannot support the full set of bins is an error.

use crate::error::{AnalysisError, AnalysisResult};

/// Number of ordinal score bins.
pub const SCORE_BINS: usize = 5;

/// Fixed-width edges over a (0, 1] percentile rank.
pub const PERCENTILE_EDGES: [f64; SCORE_BINS + 1] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// Value at quantile `q` of an ascending slice, linearly interpolated.
fn interpolate(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Equal-population bin edges: `bins + 1` strictly increasing values.
pub fn quantile_edges(metric: &'static str, values: &[f64], bins: usize) -> AnalysisResult<Vec<f64>> {
    if values.is_empty() {
        return Err(AnalysisError::DegenerateDistribution {
            metric,
            reason: "population is empty".into(),
        });
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(AnalysisError::DegenerateDistribution {
            metric,
            reason: format!("non-finite value {bad}"),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let edges: Vec<f64> = (0..=bins)
        .map(|i| interpolate(&sorted, i as f64 / bins as f64))
        .collect();

    if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
        return Err(AnalysisError::DegenerateDistribution {
            metric,
            reason: format!(
                "bin edges must be unique, got duplicate edge {} across {} customers",
                w[1],
                values.len()
            ),
        });
    }

    Ok(edges)
}

/// Index of the bin holding `value`.
///
/// The first bin is closed on both ends; the rest are right-closed.
fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    if value < edges[0] {
        return None;
    }
    edges[1..].iter().position(|&upper| value <= upper)
}

/// Assign each value its label from equal-population bins.
///
/// `labels[i]` is the label of the i-th bin in ascending value order, so a
/// descending score (e.g. recency) passes its labels reversed.
pub fn quantile_cut(metric: &'static str, values: &[f64], labels: &[u8]) -> AnalysisResult<Vec<u8>> {
    let edges = quantile_edges(metric, values, labels.len())?;
    values
        .iter()
        .map(|&v| {
            bin_index(&edges, v)
                .map(|i| labels[i])
                .ok_or_else(|| AnalysisError::DegenerateDistribution {
                    metric,
                    reason: format!("value {v} falls outside the bin edges"),
                })
        })
        .collect()
}

/// Fractional rank in (0, 1]. Tied values share their average rank.
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end share their mean.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg / n as f64;
        }
        start = end;
    }
    ranks
}

/// Assign labels from fixed, right-closed edges. The lowest edge is open.
pub fn fixed_cut(
    metric: &'static str,
    values: &[f64],
    edges: &[f64],
    labels: &[u8],
) -> AnalysisResult<Vec<u8>> {
    debug_assert_eq!(edges.len(), labels.len() + 1);
    values
        .iter()
        .map(|&v| {
            if v <= edges[0] {
                return None;
            }
            edges[1..]
                .iter()
                .position(|&upper| v <= upper)
                .map(|i| labels[i])
        })
        .zip(values)
        .map(|(label, v)| {
            label.ok_or_else(|| AnalysisError::DegenerateDistribution {
                metric,
                reason: format!("value {v} falls outside the fixed edges"),
            })
        })
        .collect()
}
