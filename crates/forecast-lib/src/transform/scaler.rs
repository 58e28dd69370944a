//! Numeric scaling

use crate::error::TransformError;
use serde::{Deserialize, Serialize};

/// Fitted numeric scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `x * scale + min`, mapping the fitted range onto [0, 1]
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default)]
        clip: bool,
    },
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn width(&self) -> usize {
        match self {
            Scaler::MinMax { min, .. } => min.len(),
            Scaler::Standard { mean, .. } => mean.len(),
        }
    }

    /// Parameter vectors must agree in length and be finite.
    pub(crate) fn check(&self) -> Result<(), String> {
        let (a, b) = match self {
            Scaler::MinMax { min, scale, .. } => (min, scale),
            Scaler::Standard { mean, scale } => (mean, scale),
        };
        if a.len() != b.len() {
            return Err(format!(
                "parameter lengths differ ({} vs {})",
                a.len(),
                b.len()
            ));
        }
        if a.iter().chain(b).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_string());
        }
        Ok(())
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, TransformError> {
        if row.len() != self.width() {
            return Err(TransformError::WidthMismatch {
                transformer: "scaler",
                expected: self.width(),
                actual: row.len(),
            });
        }

        let out: Vec<f64> = match self {
            Scaler::MinMax { min, scale, clip } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| {
                    let v = x * s + m;
                    if *clip {
                        v.clamp(0.0, 1.0)
                    } else {
                        v
                    }
                })
                .collect(),
            Scaler::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| {
                    // zero-variance columns are only centered
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
        };

        if let Some(index) = out.iter().position(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite {
                transformer: "scaler",
                index,
            });
        }
        Ok(out)
    }
}
