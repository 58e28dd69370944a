//! One-hot categorical encoding

use crate::error::TransformError;
use serde::{Deserialize, Serialize};

/// What to do with a category that was not seen at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode the column as all zeros
    Ignore,
}

/// Dense one-hot encoder over fitted category lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// One ordered category list per categorical column.
    /// Absent when the fitted encoder did not export them.
    #[serde(default)]
    pub categories: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    pub fn new(categories: Vec<Vec<String>>, handle_unknown: HandleUnknown) -> Self {
        Self {
            categories: Some(categories),
            handle_unknown,
        }
    }

    /// Categories for the column at `index` within the categorical block
    pub fn categories_at(&self, index: usize) -> Option<&[String]> {
        self.categories
            .as_ref()
            .and_then(|c| c.get(index))
            .map(Vec::as_slice)
    }

    /// Number of input columns the encoder was fitted on
    pub fn n_columns(&self) -> Option<usize> {
        self.categories.as_ref().map(Vec::len)
    }

    /// Total width of the encoded block
    pub fn output_width(&self) -> usize {
        self.categories
            .as_ref()
            .map(|c| c.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Encode one categorical-only row. `columns` names each entry of
    /// `row` and is used only for error reporting.
    pub fn transform(
        &self,
        row: &[&str],
        columns: &[String],
    ) -> Result<Vec<f64>, TransformError> {
        let categories = match &self.categories {
            Some(c) => c,
            // an empty block needs no fitted state
            None if row.is_empty() => return Ok(Vec::new()),
            None => return Err(TransformError::NoCategories),
        };
        if row.len() != categories.len() {
            return Err(TransformError::WidthMismatch {
                transformer: "encoder",
                expected: categories.len(),
                actual: row.len(),
            });
        }

        let mut out = vec![0.0; self.output_width()];
        let mut offset = 0;
        for (i, (value, cats)) in row.iter().zip(categories).enumerate() {
            match cats.iter().position(|c| c == value) {
                Some(pos) => out[offset + pos] = 1.0,
                None if self.handle_unknown == HandleUnknown::Ignore => {}
                None => {
                    return Err(TransformError::UnknownCategory {
                        column: columns.get(i).cloned().unwrap_or_else(|| i.to_string()),
                        value: value.to_string(),
                    })
                }
            }
            offset += cats.len();
        }
        Ok(out)
    }
}
