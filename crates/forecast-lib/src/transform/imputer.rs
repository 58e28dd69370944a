//! Missing-value imputation

use crate::error::TransformError;
use serde::{Deserialize, Serialize};

/// Fill policy the imputer was fitted with (informational)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant,
}

/// Fills missing numeric entries with per-column statistics learned at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
    pub statistics: Vec<f64>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy, statistics: Vec<f64>) -> Self {
        Self {
            strategy,
            statistics,
        }
    }

    pub fn width(&self) -> usize {
        self.statistics.len()
    }

    /// A value is missing when it is `None` or NaN.
    pub fn transform(&self, row: &[Option<f64>]) -> Result<Vec<f64>, TransformError> {
        if row.len() != self.statistics.len() {
            return Err(TransformError::WidthMismatch {
                transformer: "imputer",
                expected: self.statistics.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.statistics)
            .map(|(value, fill)| match value {
                Some(v) if !v.is_nan() => *v,
                _ => *fill,
            })
            .collect())
    }
}
