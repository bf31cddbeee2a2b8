//! Reporting sink.
//!
//! RULE: the sink is write-only. Nothing it does feeds back into the
//! analysis; the pipeline hands it finished values and moves on.

use crate::{
    cohort_engine::{CohortComparison, ProductRevenue, SegmentCohort},
    overview::{DatasetOverview, ParetoSummary},
    returns_engine::{ChurnSignal, ReturnAnalysis},
    rfm_engine::RfmTable,
    types::Segment,
};

/// Receives each section of a run as soon as it is computed.
pub trait ReportSink {
    fn overview(&mut self, overview: &DatasetOverview);
    fn rfm(&mut self, table: &RfmTable);
    fn rfm_saved(&mut self, run_id: &str, location: &str);
    fn cohort(&mut self, comparison: &CohortComparison);
    fn returns(&mut self, analysis: &ReturnAnalysis);
}

/// Writes every section through the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LogReport;

fn truncate(desc: Option<&str>, width: usize) -> String {
    desc.unwrap_or("N/A").chars().take(width).collect()
}

fn log_products(title: &str, products: &[ProductRevenue]) {
    log::info!("");
    log::info!("{title}:");
    for p in products {
        log::info!(
            "  {} - {}: £{:.2}",
            p.stock_code,
            truncate(p.description.as_deref(), 40),
            p.revenue
        );
    }
}

fn fmt_avg(value: Option<f64>, prefix: &str) -> String {
    value
        .map(|v| format!("{prefix}{v:.2}"))
        .unwrap_or_else(|| "n/a".into())
}

fn pareto_line(p: &ParetoSummary) -> String {
    format!(
        "Top {:.0}% Products ({}): {:.1}% of Total Revenue",
        p.product_share * 100.0,
        p.top_count,
        p.top_share * 100.0
    )
}

fn cohort_label(cohort: &SegmentCohort) -> &'static str {
    cohort.segment.as_str()
}

impl ReportSink for LogReport {
    fn overview(&mut self, overview: &DatasetOverview) {
        log::info!("");
        log::info!("--- Revenue by Country ---");
        for c in &overview.top_countries {
            log::info!("{}: £{:.2} ({:.1}%)", c.country, c.revenue, c.share * 100.0);
        }

        let p = &overview.pareto;
        log::info!("");
        log::info!("--- Pareto Analysis (Products) ---");
        log::info!("{}", pareto_line(p));
        if p.holds {
            log::info!("[Pass] Pareto principle holds.");
        } else {
            log::info!(
                "[Info] Revenue is more distributed (Share < {:.0}%).",
                p.threshold * 100.0
            );
        }

        let r = &overview.retention;
        log::info!("");
        log::info!("--- Customer Retention ---");
        log::info!("Total Customers: {}", r.total_customers);
        log::info!(
            "Repeat Rate: {:.1}% ({} customers)",
            r.repeat_rate * 100.0,
            r.repeat_customers
        );
    }

    fn rfm(&mut self, table: &RfmTable) {
        log::info!("");
        log::info!("--- RFM Segmentation (snapshot {}) ---", table.snapshot_date);
        log::info!("Segment Distribution:");
        for (segment, count) in table.segment_counts() {
            log::info!("  {segment:<14} {count}");
        }
        log::info!("Segment Profiles (Mean):");
        log::info!("  {:<14} {:>8} {:>10} {:>10}", "Segment", "Recency", "Frequency", "Monetary");
        for p in table.segment_profiles() {
            log::info!(
                "  {:<14} {:>8.1} {:>10.1} {:>10.1}",
                p.segment.as_str(),
                p.mean_recency,
                p.mean_frequency,
                p.mean_monetary
            );
        }
    }

    fn rfm_saved(&mut self, run_id: &str, location: &str) {
        log::info!("RFM Table saved to {location} (run {run_id})");
    }

    fn cohort(&mut self, cmp: &CohortComparison) {
        let (a, b) = (cohort_label(&cmp.first), cohort_label(&cmp.second));

        log::info!("");
        log::info!("--- Basket Analysis: {a} vs {b} ---");
        log::info!("{a} Customers: {}", cmp.first.metrics.customers);
        log::info!("{b} Customers: {}", cmp.second.metrics.customers);

        log_products(&format!("Top {} Products for {a}", cmp.first.top_products.len()), &cmp.first.top_products);
        log_products(&format!("Top {} Products for {b}", cmp.second.top_products.len()), &cmp.second.top_products);

        let (ma, mb) = (&cmp.first.metrics, &cmp.second.metrics);
        log::info!("");
        log::info!("--- Basket Metrics Comparison ---");
        log::info!(
            "Avg Basket Size (Items): {a}={}, {b}={}",
            fmt_avg(ma.avg_basket_size, ""),
            fmt_avg(mb.avg_basket_size, "")
        );
        log::info!(
            "Avg Basket Value: {a}={}, {b}={}",
            fmt_avg(ma.avg_basket_value, "£"),
            fmt_avg(mb.avg_basket_value, "£")
        );
        log::info!("Unique Products: {a}={}, {b}={}", ma.unique_products, mb.unique_products);

        log::info!("");
        log::info!("--- Product Overlap ---");
        log::info!("Common Products: {}", cmp.overlap.common.len());
        log::info!("{a} Only: {}", cmp.overlap.first_only.len());
        log::info!("{b} Only: {}", cmp.overlap.second_only.len());

        if !cmp.first_only_top.is_empty() {
            log_products(
                &format!("Top {} Products Unique to {a} (Potential Issues)", cmp.first_only_top.len()),
                &cmp.first_only_top,
            );
        }
    }

    fn returns(&mut self, analysis: &ReturnAnalysis) {
        log::info!("");
        log::info!("--- Return Rate Analysis ---");
        if !analysis.returns_available {
            log::warn!("Returns data not found. Skipping; every return rate below is zero.");
        } else {
            log::info!("Loaded {} return records", analysis.return_records);
        }

        for segment in Segment::ALL {
            let Some(s) = analysis.segment(segment) else {
                continue;
            };
            log::info!("");
            log::info!("{segment}:");
            log::info!(
                "  Order Return Rate: {:.2}% ({} returns / {} orders)",
                s.overall_return_rate, s.return_count, s.order_count
            );
            log::info!(
                "  Item Return Rate: {:.2}% ({} items / {} items)",
                s.overall_item_return_rate, s.returned_items, s.purchased_items
            );
            log::info!("  Avg Customer Return Rate: {:.2}%", s.mean_return_rate);
            log::info!("  Avg Customer Item Return Rate: {:.2}%", s.mean_item_return_rate);
        }

        if let Some(c) = &analysis.comparison {
            log::info!("");
            log::info!("--- {} vs {} Comparison ---", c.first, c.second);
            log::info!("{} Return Rate: {:.2}%", c.first, c.first_rate);
            log::info!("{} Return Rate: {:.2}%", c.second, c.second_rate);
            let verdict = match c.signal {
                ChurnSignal::ElevatedRisk      => "(Higher churn risk!)".to_string(),
                ChurnSignal::LowerThanBaseline => format!("(Lower than {})", c.second),
            };
            log::info!("Difference: {:+.2}% {verdict}", c.difference);
        }
    }
}
