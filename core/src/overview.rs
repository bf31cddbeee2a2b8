//! Dataset-wide summaries computed ahead of segmentation.

use crate::{config::OverviewSettings, transaction::SalesTransaction, types::CustomerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRevenue {
    pub country: String,
    pub revenue: f64,
    /// Fraction of total revenue, 0 to 1.
    pub share:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoSummary {
    pub product_count: usize,
    /// Configured slice of products, 0 to 1.
    pub product_share: f64,
    pub top_count:     usize,
    /// Revenue share of the top slice, 0 to 1.
    pub top_share:     f64,
    pub threshold:     f64,
    pub holds:         bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionSummary {
    pub total_customers:  usize,
    pub one_time:         usize,
    pub repeat_customers: usize,
    /// 1 − one_time / total, 0 to 1.
    pub repeat_rate:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub transactions:   usize,
    pub total_revenue:  f64,
    pub top_countries:  Vec<CountryRevenue>,
    pub pareto:         ParetoSummary,
    pub retention:      RetentionSummary,
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total } else { 0.0 }
}

/// Countries by revenue, highest first, truncated to `top_n`.
pub fn revenue_by_country(sales: &[SalesTransaction], top_n: usize) -> Vec<CountryRevenue> {
    let mut by_country: HashMap<&str, f64> = HashMap::new();
    for t in sales {
        *by_country.entry(t.country.as_str()).or_insert(0.0) += t.total_revenue;
    }
    let total: f64 = by_country.values().sum();

    let mut ranked: Vec<(&str, f64)> = by_country.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(country, revenue)| CountryRevenue {
            country: country.to_string(),
            revenue,
            share: share(revenue, total),
        })
        .collect()
}

/// Revenue share of the top slice of products.
pub fn pareto_analysis(sales: &[SalesTransaction], product_share: f64, threshold: f64) -> ParetoSummary {
    let mut by_product: HashMap<&str, f64> = HashMap::new();
    for t in sales {
        *by_product.entry(t.stock_code.as_str()).or_insert(0.0) += t.total_revenue;
    }

    let mut revenue: Vec<f64> = by_product.into_values().collect();
    revenue.sort_by(|a, b| b.total_cmp(a));

    let total: f64 = revenue.iter().sum();
    let top_count = (revenue.len() as f64 * product_share).floor() as usize;
    let top_share = share(revenue.iter().take(top_count).sum(), total);

    ParetoSummary {
        product_count: revenue.len(),
        product_share,
        top_count,
        top_share,
        threshold,
        holds: top_share >= threshold,
    }
}

pub fn customer_retention(sales: &[SalesTransaction]) -> RetentionSummary {
    let mut invoices: BTreeMap<CustomerId, HashSet<&str>> = BTreeMap::new();
    for t in sales {
        invoices
            .entry(t.customer_id)
            .or_default()
            .insert(t.invoice_no.as_str());
    }

    let total_customers = invoices.len();
    let one_time = invoices.values().filter(|inv| inv.len() == 1).count();
    let repeat_rate = if total_customers == 0 {
        0.0
    } else {
        1.0 - one_time as f64 / total_customers as f64
    };

    RetentionSummary {
        total_customers,
        one_time,
        repeat_customers: total_customers - one_time,
        repeat_rate,
    }
}

pub fn build_overview(sales: &[SalesTransaction], settings: &OverviewSettings) -> DatasetOverview {
    DatasetOverview {
        transactions:  sales.len(),
        total_revenue: sales.iter().map(|t| t.total_revenue).sum(),
        top_countries: revenue_by_country(sales, settings.top_countries),
        pareto:        pareto_analysis(sales, settings.pareto_product_share, settings.pareto_threshold),
        retention:     customer_retention(sales),
    }
}
