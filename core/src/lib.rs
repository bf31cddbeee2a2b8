//! Retail customer segmentation: RFM scoring, cohort comparison and
//! return-rate analysis over a validated transaction dataset.

pub mod binning;
pub mod cohort_engine;
pub mod config;
pub mod error;
pub mod ingest;
pub mod overview;
pub mod pipeline;
pub mod report;
pub mod returns_engine;
pub mod rfm_engine;
pub mod store;
pub mod transaction;
pub mod types;

pub use error::{AnalysisError, AnalysisResult};
