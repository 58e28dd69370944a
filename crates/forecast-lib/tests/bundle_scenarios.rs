//! End-to-end scenarios against the shipped weather bundle

use forecast_lib::{
    pipeline, ArtifactBundle, ColumnKind, Forecaster, FormInput, Label, Outcome, RawInputRow,
    RawValue, REMEDIATION_HINT,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

fn bundle_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/aussie_rain.json")
}

fn forecaster() -> Forecaster {
    let bundle = ArtifactBundle::load(bundle_path()).expect("shipped bundle loads");
    Forecaster::new(Arc::new(bundle))
}

/// The documented example observation
fn katherine_row() -> RawInputRow {
    let numbers = [
        ("MinTemp", 23.2),
        ("MaxTemp", 33.2),
        ("Rainfall", 10.2),
        ("Evaporation", 4.2),
        ("Sunshine", 0.0),
        ("WindGustSpeed", 52.0),
        ("WindSpeed9am", 13.0),
        ("WindSpeed3pm", 20.0),
        ("Humidity9am", 89.0),
        ("Humidity3pm", 58.0),
        ("Pressure9am", 1004.8),
        ("Pressure3pm", 1001.5),
        ("Cloud9am", 8.0),
        ("Cloud3pm", 5.0),
        ("Temp9am", 25.7),
        ("Temp3pm", 33.0),
    ];
    let texts = [
        ("Location", "Katherine"),
        ("WindGustDir", "NNW"),
        ("WindDir9am", "NW"),
        ("WindDir3pm", "NNE"),
        ("RainToday", "Yes"),
    ];
    let mut row = RawInputRow::new();
    for (col, v) in numbers {
        row.insert(col, RawValue::Number(v));
    }
    for (col, v) in texts {
        row.insert(col, RawValue::Text(v.to_string()));
    }
    row
}

#[test]
fn test_column_partition() {
    let f = forecaster();
    let bundle = f.bundle();
    let numeric: HashSet<_> = bundle.numeric_cols().iter().collect();
    let categorical: HashSet<_> = bundle.categorical_cols().iter().collect();
    let input: HashSet<_> = bundle.input_cols().iter().collect();

    assert!(numeric.is_disjoint(&categorical));
    assert_eq!(numeric.union(&categorical).copied().collect::<HashSet<_>>(), input);
}

#[test]
fn test_example_row_predicts() {
    let f = forecaster();
    let result = f.predict(&katherine_row()).unwrap();
    assert!(matches!(result.label, Label::Yes | Label::No));
    assert!((0.0..=1.0).contains(&result.probability));
}

#[test]
fn test_schema_defaults_equal_example_row() {
    let f = forecaster();
    assert_eq!(f.default_row(), katherine_row());
}

#[test]
fn test_out_of_vocabulary_direction_is_reported() {
    let f = forecaster();
    let bad = katherine_row().with("WindDir9am", RawValue::Text("XYZ".to_string()));

    match f.submit(&bad) {
        Outcome::Failure { message, hint, .. } => {
            assert!(message.starts_with("Error: "), "message: {}", message);
            assert!(message.contains("WindDir9am"));
            assert_eq!(hint, REMEDIATION_HINT);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    // still usable afterwards
    assert!(f.submit(&katherine_row()).is_forecast());
}

#[test]
fn test_every_numeric_column_missing() {
    let f = forecaster();
    let mut form = FormInput::new();
    for spec in f.schema().columns() {
        if spec.kind == ColumnKind::Numeric {
            form.mark_missing(spec.name.clone());
        }
    }
    let row = f.collect(&form);
    for col in f.bundle().numeric_cols() {
        assert_eq!(row.get(col), Some(&RawValue::Missing));
    }

    let features = pipeline::process(&row, f.bundle()).unwrap();
    assert_eq!(features.len(), f.bundle().n_features());
    assert!(features.as_slice().iter().all(|v| v.is_finite()));
    assert!(f.submit(&row).is_forecast());
}

#[test]
fn test_probability_in_range_across_inputs() {
    let f = forecaster();
    for humidity in [0.0, 25.0, 50.0, 75.0, 100.0] {
        for pressure in [980.0, 1015.0, 1050.0] {
            let row = katherine_row()
                .with("Humidity3pm", RawValue::Number(humidity))
                .with("Pressure3pm", RawValue::Number(pressure));
            let result = f.predict(&row).unwrap();
            assert!((0.0..=1.0).contains(&result.probability));
        }
    }
}

#[test]
fn test_categorical_options_come_from_encoder() {
    let f = forecaster();
    let location = f.schema().column("Location").unwrap();
    assert_eq!(location.options.len(), 49);
    assert!(location.options.contains(&"Katherine".to_string()));
    assert_eq!(f.schema().column("RainToday").unwrap().options, vec!["No", "Yes"]);
}
