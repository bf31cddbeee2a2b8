use crate::{
    error::{AnalysisError, AnalysisResult},
    types::Segment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Invoice prefix that marks a return.
    pub return_marker: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { return_marker: "C".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmSettings {
    /// Days added to the latest invoice date to form the snapshot.
    pub snapshot_offset_days: i64,
    /// Smallest population the pipeline will score.
    pub min_customers: usize,
}

impl RfmSettings {
    /// The snapshot must fall after the latest invoice so Recency is at least 1.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.snapshot_offset_days < 1 {
            return Err(AnalysisError::InvalidSetting {
                setting: "rfm.snapshot_offset_days",
                reason:  format!("must be at least 1, got {}", self.snapshot_offset_days),
            });
        }
        Ok(())
    }
}

impl Default for RfmSettings {
    fn default() -> Self {
        Self {
            snapshot_offset_days: 1,
            min_customers: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortSettings {
    /// The segment under scrutiny (the churn-risk side of every comparison).
    pub first_segment: Segment,
    /// The baseline segment.
    pub second_segment: Segment,
    pub top_products: usize,
    pub top_exclusive_products: usize,
}

impl Default for CohortSettings {
    fn default() -> Self {
        Self {
            first_segment: Segment::AtRisk,
            second_segment: Segment::Champion,
            top_products: 10,
            top_exclusive_products: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewSettings {
    pub top_countries: usize,
    /// Fraction of the product catalogue treated as the "top" slice.
    pub pareto_product_share: f64,
    /// Revenue share the top slice must reach for the Pareto check to pass.
    pub pareto_threshold: f64,
}

impl Default for OverviewSettings {
    fn default() -> Self {
        Self {
            top_countries: 5,
            pareto_product_share: 0.20,
            pareto_threshold: 0.80,
        }
    }
}

/// Every tunable of an analysis run. Passed explicitly to each stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub ingest:   IngestSettings,
    pub rfm:      RfmSettings,
    pub cohort:   CohortSettings,
    pub overview: OverviewSettings,
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config
            .rfm
            .validate()
            .map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        if config.cohort.first_segment == config.cohort.second_segment {
            anyhow::bail!(
                "{path}: cohort comparison needs two different segments, got '{}' twice",
                config.cohort.first_segment
            );
        }
        Ok(config)
    }
}
