mod common;

use common::{init_logging, retail_population, retail_returns, sample_sales};
use rfm_core::{
    cohort_engine::CohortComparison,
    config::AnalysisConfig,
    overview::DatasetOverview,
    pipeline::AnalysisPipeline,
    report::{LogReport, ReportSink},
    returns_engine::{ChurnSignal, ReturnAnalysis},
    rfm_engine::RfmTable,
    store::AnalysisStore,
    types::Segment,
    AnalysisError,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Records the order in which sections arrive.
#[derive(Default)]
struct CaptureSink {
    sections: Vec<&'static str>,
    saved_run: Option<String>,
}

impl ReportSink for CaptureSink {
    fn overview(&mut self, _: &DatasetOverview) {
        self.sections.push("overview");
    }
    fn rfm(&mut self, _: &RfmTable) {
        self.sections.push("rfm");
    }
    fn rfm_saved(&mut self, run_id: &str, _: &str) {
        self.sections.push("rfm_saved");
        self.saved_run = Some(run_id.to_string());
    }
    fn cohort(&mut self, _: &CohortComparison) {
        self.sections.push("cohort");
    }
    fn returns(&mut self, _: &ReturnAnalysis) {
        self.sections.push("returns");
    }
}

fn store_with_sales() -> AnalysisStore {
    init_logging();
    let store = AnalysisStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.replace_sales(&retail_population()).unwrap();
    store
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every stage runs in order and the RFM table lands in the store.
#[test]
fn full_run_persists_rfm_and_reports_every_section() {
    let store = store_with_sales();
    store.replace_returns(&retail_returns()).unwrap();

    let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), &store);
    let mut sink = CaptureSink::default();
    let outcome = pipeline.run(&mut sink).unwrap();

    assert_eq!(
        sink.sections,
        ["overview", "rfm", "rfm_saved", "cohort", "returns"]
    );
    assert_eq!(sink.saved_run.as_deref(), Some(outcome.run_id.as_str()));
    assert!(outcome.run_id.starts_with("run-"));

    assert_eq!(store.rfm_row_count(&outcome.run_id).unwrap(), 10);
    assert_eq!(store.latest_run_id().unwrap(), Some(outcome.run_id.clone()));
    assert_eq!(store.load_rfm_table(&outcome.run_id).unwrap(), Some(outcome.rfm.clone()));

    assert_eq!(outcome.overview.transactions, retail_population().len());
    assert_eq!(outcome.cohort.first.segment, Segment::AtRisk);
    assert_eq!(outcome.cohort.second.segment, Segment::Champion);
    assert!(outcome.returns.returns_available);
    assert_eq!(
        outcome.returns.comparison.as_ref().map(|c| c.signal),
        Some(ChurnSignal::ElevatedRisk)
    );
}

/// Without a returns dataset the run completes with zero returns.
#[test]
fn missing_returns_does_not_fail_the_run() {
    let store = store_with_sales();

    let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), &store);
    let outcome = pipeline.run(&mut LogReport).unwrap();

    assert!(!outcome.returns.returns_available);
    assert!(outcome.returns.customers.iter().all(|c| c.return_count == 0));
    assert_eq!(
        outcome.returns.comparison.map(|c| c.signal),
        Some(ChurnSignal::LowerThanBaseline)
    );
}

/// Each run gets its own id; earlier runs stay readable.
#[test]
fn repeated_runs_are_kept_apart() {
    let store = store_with_sales();
    let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), &store);

    let first = pipeline.run(&mut LogReport).unwrap();
    let second = pipeline.run(&mut LogReport).unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(store.rfm_row_count(&first.run_id).unwrap(), 10);
    assert_eq!(store.rfm_row_count(&second.run_id).unwrap(), 10);
    assert_eq!(store.latest_run_id().unwrap(), Some(second.run_id));
}

/// A store without sales is a missing input, not an empty analysis.
#[test]
fn missing_sales_fails_before_anything_is_written() {
    init_logging();
    let store = AnalysisStore::in_memory().unwrap();
    store.migrate().unwrap();

    let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), &store);
    let mut sink = CaptureSink::default();
    let err = pipeline.run(&mut sink).unwrap_err();

    assert!(matches!(err, AnalysisError::MissingInput { .. }));
    assert!(sink.sections.is_empty());
    assert_eq!(store.latest_run_id().unwrap(), None);
}

/// Four customers fall under the default population floor; nothing persists.
#[test]
fn small_population_is_rejected() {
    init_logging();
    let store = AnalysisStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.replace_sales(&sample_sales()).unwrap();

    let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), &store);
    let mut sink = CaptureSink::default();
    match pipeline.run(&mut sink) {
        Err(AnalysisError::DegenerateDistribution { metric, .. }) => {
            assert_eq!(metric, "population")
        }
        other => panic!("expected a degenerate population, got {other:?}"),
    }
    assert_eq!(sink.sections, ["overview"]);
    assert_eq!(store.latest_run_id().unwrap(), None);
}

/// Lowering the floor lets the same four customers through.
#[test]
fn population_floor_is_configurable() {
    init_logging();
    let store = AnalysisStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.replace_sales(&sample_sales()).unwrap();

    let mut config = AnalysisConfig::default();
    config.rfm.min_customers = 4;
    let pipeline = AnalysisPipeline::new(config, &store);
    let outcome = pipeline.run(&mut LogReport).unwrap();

    assert_eq!(outcome.rfm.len(), 4);
    assert_eq!(outcome.cohort.second.metrics.customers, 0);
    assert_eq!(outcome.cohort.second.metrics.avg_basket_size, None);
    assert!(outcome.returns.comparison.is_none());
}

/// The compared segments come from config.
#[test]
fn configured_segments_drive_the_comparison() {
    let store = store_with_sales();
    let mut config = AnalysisConfig::default();
    config.cohort.first_segment = Segment::Standard;
    config.cohort.second_segment = Segment::NewCustomer;

    let outcome = AnalysisPipeline::new(config, &store)
        .run(&mut LogReport)
        .unwrap();

    assert_eq!(outcome.cohort.first.segment, Segment::Standard);
    assert_eq!(outcome.cohort.first.metrics.customers, 5);
    assert_eq!(outcome.cohort.second.metrics.customers, 1);
}

/// A failed RFM insert leaves no run behind for `latest_run_id` to find.
#[test]
fn failed_save_leaves_no_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retail.db");
    let path = path.to_str().unwrap();

    let store = AnalysisStore::open(path).unwrap();
    store.migrate().unwrap();
    store.replace_sales(&retail_population()).unwrap();

    let side = rusqlite::Connection::open(path).unwrap();
    side.execute_batch(
        "CREATE TRIGGER reject_rfm BEFORE INSERT ON customer_rfm
         BEGIN SELECT RAISE(ABORT, 'rfm table is read-only'); END;",
    )
    .unwrap();

    let mut sink = CaptureSink::default();
    let err = AnalysisPipeline::new(AnalysisConfig::default(), &store)
        .run(&mut sink)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Database(_)), "got {err:?}");
    assert_eq!(store.latest_run_id().unwrap(), None);
    assert!(sink.saved_run.is_none());
}

/// A snapshot offset below one day is refused before anything is written.
#[test]
fn non_positive_snapshot_offset_is_rejected() {
    let store = store_with_sales();
    let mut config = AnalysisConfig::default();
    config.rfm.snapshot_offset_days = -1;

    let err = AnalysisPipeline::new(config, &store)
        .run(&mut LogReport)
        .unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidSetting { .. }), "got {err:?}");
    assert_eq!(store.latest_run_id().unwrap(), None);
}
