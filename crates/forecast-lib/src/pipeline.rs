//! Feature preprocessing pipeline
//!
//! Turns one raw input row into the exact feature vector the classifier was
//! trained on. The step order is fixed:
//!
//! 1. project onto `numeric_cols` (missing markers kept)
//! 2. impute
//! 3. scale
//! 4. project onto `categorical_cols`
//! 5. one-hot encode
//! 6. concatenate, numeric block first

use crate::bundle::ArtifactBundle;
use crate::error::{PredictError, ValidationError};
use crate::models::{FeatureVector, RawInputRow, RawValue};
use tracing::trace;

/// Run the full preprocessing pipeline on one row
pub fn process(
    row: &RawInputRow,
    bundle: &ArtifactBundle,
) -> Result<FeatureVector, PredictError> {
    let numeric = project_numeric(row, bundle.numeric_cols())?;
    let imputed = bundle.imputer().transform(&numeric)?;
    let scaled = bundle.scaler().transform(&imputed)?;

    let categorical = project_categorical(row, bundle.categorical_cols())?;
    let encoded = bundle
        .encoder()
        .transform(&categorical, bundle.categorical_cols())?;

    trace!(
        numeric_width = scaled.len(),
        encoded_width = encoded.len(),
        "Preprocessed input row"
    );
    Ok(FeatureVector::concat(scaled, encoded))
}

/// Numeric-only view of `row` in column order. `None` marks missing data.
///
/// Only `RawValue::Missing` counts as missing. NaN and infinities, whether
/// given as numbers or as text such as "NaN" or "inf", are not numbers a user
/// can enter and are rejected.
pub fn project_numeric(
    row: &RawInputRow,
    columns: &[String],
) -> Result<Vec<Option<f64>>, ValidationError> {
    columns
        .iter()
        .map(|col| {
            let not_numeric = |value: String| ValidationError::NotNumeric {
                column: col.clone(),
                value,
            };
            match row.get(col) {
                Some(RawValue::Number(v)) if v.is_finite() => Ok(Some(*v)),
                Some(RawValue::Number(v)) => Err(not_numeric(v.to_string())),
                Some(RawValue::Missing) => Ok(None),
                Some(RawValue::Text(s)) => match s.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(Some(v)),
                    _ => Err(not_numeric(s.clone())),
                },
                None => Err(ValidationError::MissingColumn(col.clone())),
            }
        })
        .collect()
}

/// Categorical-only view of `row` in column order
pub fn project_categorical<'a>(
    row: &'a RawInputRow,
    columns: &[String],
) -> Result<Vec<&'a str>, ValidationError> {
    columns
        .iter()
        .map(|col| match row.get(col) {
            Some(RawValue::Text(s)) => Ok(s.as_str()),
            Some(_) => Err(ValidationError::NotCategorical(col.clone())),
            None => Err(ValidationError::MissingColumn(col.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::testing::{fixture_bundle, fixture_row, numeric_only_bundle};

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_process_layout() {
        let bundle = fixture_bundle();
        let fv = process(&fixture_row(), &bundle).unwrap();

        assert_eq!(fv.len(), bundle.n_features());
        // MinTemp 15 -> 15*0.02+0.2, Rainfall 10 -> 0.1, Humidity3pm 80 -> 0.8
        assert!(close(fv.numeric_block(), &[0.5, 0.1, 0.8]));
        // WindDir9am=S, RainToday=Yes
        assert_eq!(fv.encoded_block(), &[0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_numeric_order_follows_numeric_cols() {
        let bundle = fixture_bundle();
        let row = fixture_row()
            .with("MinTemp", RawValue::Number(-10.0))
            .with("Humidity3pm", RawValue::Number(100.0));
        let fv = process(&row, &bundle).unwrap();
        // entry i belongs to numeric_cols[i] even though input_cols interleave
        assert!(close(fv.numeric_block(), &[0.0, 0.1, 1.0]));
    }

    #[test]
    fn test_process_is_deterministic() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("Rainfall", RawValue::Missing);
        let a = process(&row, &bundle).unwrap();
        let b = process(&row, &bundle).unwrap();
        let bits = |fv: &FeatureVector| {
            fv.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_missing_reaches_imputer_as_none() {
        let row = fixture_row().with("Rainfall", RawValue::Missing);
        let projected = project_numeric(&row, &fixture_bundle().numeric_cols().to_vec()).unwrap();
        assert_eq!(projected, vec![Some(15.0), None, Some(80.0)]);
    }

    #[test]
    fn test_missing_value_is_imputed_not_zeroed() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("Rainfall", RawValue::Missing);
        let fv = process(&row, &bundle).unwrap();
        // imputed with 2.0, then scaled by 0.01
        assert!((fv.numeric_block()[1] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_all_numeric_missing() {
        let bundle = fixture_bundle();
        let row = fixture_row()
            .with("MinTemp", RawValue::Missing)
            .with("Rainfall", RawValue::Missing)
            .with("Humidity3pm", RawValue::Missing);
        let fv = process(&row, &bundle).unwrap();
        assert_eq!(fv.len(), bundle.n_features());
        // statistics 12, 2, 50 scaled
        assert!(close(fv.numeric_block(), &[0.44, 0.02, 0.5]));
    }

    #[test]
    fn test_unknown_category_is_transform_error() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("WindDir9am", RawValue::Text("XYZ".into()));
        let err = process(&row, &bundle).unwrap_err();
        assert_eq!(
            err,
            PredictError::Transform(TransformError::UnknownCategory {
                column: "WindDir9am".into(),
                value: "XYZ".into()
            })
        );
    }

    #[test]
    fn test_malformed_numeric_is_validation_error() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("MinTemp", RawValue::Text("warm".into()));
        let err = process(&row, &bundle).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Validation(ValidationError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_non_finite_text_is_validation_error() {
        let bundle = fixture_bundle();
        for text in ["NaN", "nan", "inf", "-infinity"] {
            let row = fixture_row().with("MinTemp", RawValue::Text(text.into()));
            assert_eq!(
                process(&row, &bundle).unwrap_err(),
                PredictError::Validation(ValidationError::NotNumeric {
                    column: "MinTemp".into(),
                    value: text.into()
                }),
                "{text} must not be treated as a number or as missing"
            );
        }
    }

    #[test]
    fn test_non_finite_number_is_validation_error() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("Rainfall", RawValue::Number(f64::NAN));
        assert!(matches!(
            process(&row, &bundle).unwrap_err(),
            PredictError::Validation(ValidationError::NotNumeric { ref column, .. })
                if column == "Rainfall"
        ));

        let row = fixture_row().with("Humidity3pm", RawValue::Number(f64::INFINITY));
        assert_eq!(
            project_numeric(&row, bundle.numeric_cols()).unwrap_err(),
            ValidationError::NotNumeric {
                column: "Humidity3pm".into(),
                value: "inf".into()
            }
        );
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("MinTemp", RawValue::Text(" 15.0 ".into()));
        let fv = process(&row, &bundle).unwrap();
        assert!((fv.numeric_block()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_categorical_value_rejected() {
        let bundle = fixture_bundle();
        let row = fixture_row().with("RainToday", RawValue::Missing);
        assert_eq!(
            process(&row, &bundle).unwrap_err(),
            PredictError::Validation(ValidationError::NotCategorical("RainToday".into()))
        );
    }

    #[test]
    fn test_absent_column_rejected() {
        let bundle = fixture_bundle();
        let row = RawInputRow::new().with("MinTemp", RawValue::Number(1.0));
        assert_eq!(
            process(&row, &bundle).unwrap_err(),
            PredictError::Validation(ValidationError::MissingColumn("Rainfall".into()))
        );
    }

    #[test]
    fn test_empty_categorical_block() {
        let bundle = numeric_only_bundle();
        let fv = process(&fixture_row(), &bundle).unwrap();
        assert!(fv.encoded_block().is_empty());
        assert!(close(fv.as_slice(), &[0.5, 0.1, 0.8]));
    }
}
