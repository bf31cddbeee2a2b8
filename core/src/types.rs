//! Shared primitive types used across the analysis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The canonical run identifier.
pub type RunId = String;

/// An invoice identifier. Stable per order; return invoices carry the
/// configured return marker as a prefix.
pub type InvoiceNo = String;

/// Numeric customer key.
///
/// The retail export stores this as a float; ingest only admits integral
/// values, so the key is held as an integer and round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl CustomerId {
    /// Accepts a raw float key if it is finite, non-negative and integral.
    pub fn from_f64(raw: f64) -> Option<Self> {
        if raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw <= i64::MAX as f64 {
            Some(Self(raw as i64))
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavioural segment derived from RFM scores.
///
/// Variant order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "Champion")]
    Champion,
    #[serde(rename = "At-Risk")]
    AtRisk,
    #[serde(rename = "New Customer")]
    NewCustomer,
    #[serde(rename = "Standard")]
    Standard,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Champion,
        Segment::AtRisk,
        Segment::NewCustomer,
        Segment::Standard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Champion    => "Champion",
            Segment::AtRisk      => "At-Risk",
            Segment::NewCustomer => "New Customer",
            Segment::Standard    => "Standard",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = crate::error::AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .into_iter()
            .find(|seg| seg.as_str() == s)
            .ok_or_else(|| crate::error::AnalysisError::UnknownSegment { label: s.to_string() })
    }
}
