//! The analysis pipeline: one batch run over a published dataset.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Load + validate sales    (fatal if missing or invalid)
//!   2. Dataset overview
//!   3. RFM engine               (population guard first)
//!   4. Persist run + RFM table   (one transaction)
//!   5. Cohort engine
//!   6. Load returns             (optional; missing = zero returns)
//!   7. Return-rate engine
//!
//! RULES:
//!   - Engines receive immutable tables and return new values.
//!   - Nothing is written unless RFM scoring succeeded.
//!   - The report sink only receives; it never feeds back.

use crate::{
    cohort_engine::{compare_segments, CohortComparison},
    config::AnalysisConfig,
    error::{AnalysisError, AnalysisResult},
    overview::{build_overview, DatasetOverview},
    report::ReportSink,
    returns_engine::{analyze_returns, ReturnAnalysis},
    rfm_engine::{build_rfm, RfmTable},
    store::AnalysisStore,
    transaction::{validate_sales, ReturnTransaction, SalesTransaction},
    types::RunId,
};
use std::collections::HashSet;

/// Everything a run computed.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub run_id:   RunId,
    pub overview: DatasetOverview,
    pub rfm:      RfmTable,
    pub cohort:   CohortComparison,
    pub returns:  ReturnAnalysis,
}

pub struct AnalysisPipeline<'a> {
    config: AnalysisConfig,
    store:  &'a AnalysisStore,
}

impl<'a> AnalysisPipeline<'a> {
    pub fn new(config: AnalysisConfig, store: &'a AnalysisStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Execute every stage in order, emitting each section to `sink`.
    pub fn run(&self, sink: &mut dyn ReportSink) -> AnalysisResult<AnalysisOutcome> {
        let sales = self.store.load_sales()?;
        validate_sales("sales", &sales)?;
        log::info!("Loaded {} sales line items from {}", sales.len(), self.store.location());

        let overview = build_overview(&sales, &self.config.overview);
        sink.overview(&overview);

        let rfm = self.score_customers(&sales)?;
        sink.rfm(&rfm);

        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        self.store
            .save_run(&run_id, env!("CARGO_PKG_VERSION"), &rfm)?;
        sink.rfm_saved(&run_id, self.store.location());

        let cohort_cfg = &self.config.cohort;
        let cohort = compare_segments(
            &sales,
            &rfm,
            cohort_cfg.first_segment,
            cohort_cfg.second_segment,
            cohort_cfg,
        );
        sink.cohort(&cohort);

        let returns = self.load_returns()?;
        let returns = analyze_returns(
            returns.as_deref(),
            &sales,
            &rfm,
            cohort_cfg.first_segment,
            cohort_cfg.second_segment,
        );
        sink.returns(&returns);

        log::info!("run {run_id} complete: {} customers segmented", rfm.len());

        Ok(AnalysisOutcome {
            run_id,
            overview,
            rfm,
            cohort,
            returns,
        })
    }

    fn score_customers(&self, sales: &[SalesTransaction]) -> AnalysisResult<RfmTable> {
        let customers: HashSet<_> = sales.iter().map(|t| t.customer_id).collect();
        let min = self.config.rfm.min_customers;
        if customers.len() < min {
            return Err(AnalysisError::DegenerateDistribution {
                metric: "population",
                reason: format!(
                    "{} customers present, at least {min} required for scoring",
                    customers.len()
                ),
            });
        }
        build_rfm(sales, &self.config.rfm)
    }

    /// `None` when the store has no returns dataset.
    fn load_returns(&self) -> AnalysisResult<Option<Vec<ReturnTransaction>>> {
        match self.store.load_returns() {
            Ok(rows) => Ok(Some(rows)),
            Err(AnalysisError::MissingOptionalInput { location }) => {
                log::warn!("Returns data not found at {location}. Skipping.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
