//! Artifact bundle loading and validation
//!
//! The bundle is a single JSON document holding the fitted classifier, the
//! fitted imputer/scaler/encoder and the column schema they were trained
//! on. It is loaded once, validated eagerly and never mutated afterwards.

use crate::error::LoadError;
use crate::inference::{Classifier, ModelSpec, POSITIVE_CLASS_INDEX};
use crate::models::Label;
use crate::schema::ColumnPresentation;
use crate::transform::{CategoryProvider, OneHotEncoder, Scaler, SimpleImputer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Default bundle location, relative to the working directory
pub const DEFAULT_BUNDLE_PATH: &str = "models/aussie_rain.json";

/// On-disk layout of the bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleFile {
    pub model: ModelSpec,
    pub imputer: SimpleImputer,
    pub scaler: Scaler,
    pub encoder: OneHotEncoder,
    pub input_cols: Vec<String>,
    pub numeric_cols: Vec<String>,
    pub categorical_cols: Vec<String>,
    pub encoded_cols: Vec<String>,
    /// Per-column overrides of the built-in presentation metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub presentation: HashMap<String, ColumnPresentation>,
}

/// Loaded, validated and immutable bundle
pub struct ArtifactBundle {
    model: Box<dyn Classifier>,
    imputer: SimpleImputer,
    scaler: Scaler,
    encoder: OneHotEncoder,
    input_cols: Vec<String>,
    numeric_cols: Vec<String>,
    categorical_cols: Vec<String>,
    encoded_cols: Vec<String>,
    presentation: HashMap<String, ColumnPresentation>,
    version: String,
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("model", &self.model.kind())
            .field("input_cols", &self.input_cols)
            .field("numeric_cols", &self.numeric_cols)
            .field("categorical_cols", &self.categorical_cols)
            .field("encoded_cols", &self.encoded_cols.len())
            .field("version", &self.version)
            .finish()
    }
}

impl ArtifactBundle {
    /// Load and validate a bundle from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_verified(path, None)
    }

    /// Load a bundle, optionally verifying its SHA-256 checksum first
    pub fn load_verified(
        path: impl AsRef<Path>,
        expected_sha256: Option<&str>,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let checksum = sha256_hex(&bytes);
        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(LoadError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual: checksum,
                });
            }
        }

        let file: BundleFile = serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let bundle = Self::build(file, base_dir, short_version(&checksum))?;

        info!(
            path = %path.display(),
            version = %bundle.version,
            model = bundle.model.kind(),
            features = bundle.n_features(),
            "Loaded artifact bundle"
        );
        Ok(bundle)
    }

    /// Build a bundle from an in-memory description
    pub fn from_file(file: BundleFile, base_dir: &Path) -> Result<Self, LoadError> {
        let bytes = serde_json::to_vec(&file)
            .map_err(|e| LoadError::schema(format!("bundle is not serializable: {}", e)))?;
        Self::build(file, base_dir, short_version(&sha256_hex(&bytes)))
    }

    fn build(file: BundleFile, base_dir: &Path, version: String) -> Result<Self, LoadError> {
        validate_columns(&file)?;
        validate_transformers(&file)?;

        let model = file.model.into_classifier(base_dir)?;
        validate_model(model.as_ref(), file.numeric_cols.len() + file.encoded_cols.len())?;

        Ok(Self {
            model,
            imputer: file.imputer,
            scaler: file.scaler,
            encoder: file.encoder,
            input_cols: file.input_cols,
            numeric_cols: file.numeric_cols,
            categorical_cols: file.categorical_cols,
            encoded_cols: file.encoded_cols,
            presentation: file.presentation,
            version,
        })
    }

    /// Swap in another classifier backend. It must accept the same classes
    /// and feature width as the one it replaces.
    pub fn with_classifier(mut self, model: Box<dyn Classifier>) -> Result<Self, LoadError> {
        validate_model(model.as_ref(), self.n_features())?;
        self.model = model;
        Ok(self)
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn imputer(&self) -> &SimpleImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn input_cols(&self) -> &[String] {
        &self.input_cols
    }

    pub fn numeric_cols(&self) -> &[String] {
        &self.numeric_cols
    }

    pub fn categorical_cols(&self) -> &[String] {
        &self.categorical_cols
    }

    pub fn encoded_cols(&self) -> &[String] {
        &self.encoded_cols
    }

    pub fn presentation(&self) -> &HashMap<String, ColumnPresentation> {
        &self.presentation
    }

    /// Short SHA-256 fingerprint of the bundle contents
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Width of the feature vector fed to the model
    pub fn n_features(&self) -> usize {
        self.numeric_cols.len() + self.encoded_cols.len()
    }
}

impl CategoryProvider for ArtifactBundle {
    fn categories_for(&self, column: &str) -> Option<&[String]> {
        let index = self.categorical_cols.iter().position(|c| c == column)?;
        self.encoder.categories_at(index)
    }
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn short_version(checksum: &str) -> String {
    format!("sha256:{}", &checksum[..12.min(checksum.len())])
}

fn find_duplicate(cols: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    cols.iter().find(|c| !seen.insert(c.as_str())).map(String::as_str)
}

/// `sub` must appear within `all` in the same relative order
fn is_ordered_subsequence(sub: &[String], all: &[String]) -> bool {
    let mut it = all.iter();
    sub.iter().all(|s| it.any(|a| a == s))
}

fn validate_columns(file: &BundleFile) -> Result<(), LoadError> {
    for (name, cols) in [
        ("input_cols", &file.input_cols),
        ("numeric_cols", &file.numeric_cols),
        ("categorical_cols", &file.categorical_cols),
        ("encoded_cols", &file.encoded_cols),
    ] {
        if let Some(dup) = find_duplicate(cols) {
            return Err(LoadError::schema(format!("duplicate column '{}' in {}", dup, name)));
        }
    }

    let numeric: HashSet<&str> = file.numeric_cols.iter().map(String::as_str).collect();
    let categorical: HashSet<&str> = file.categorical_cols.iter().map(String::as_str).collect();
    let input: HashSet<&str> = file.input_cols.iter().map(String::as_str).collect();

    if let Some(both) = numeric.intersection(&categorical).next() {
        return Err(LoadError::schema(format!(
            "column '{}' is both numeric and categorical",
            both
        )));
    }
    if let Some(extra) = numeric.union(&categorical).find(|c| !input.contains(*c)) {
        return Err(LoadError::schema(format!(
            "column '{}' is not listed in input_cols",
            extra
        )));
    }
    if let Some(orphan) = file
        .input_cols
        .iter()
        .find(|c| !numeric.contains(c.as_str()) && !categorical.contains(c.as_str()))
    {
        return Err(LoadError::schema(format!(
            "input column '{}' is neither numeric nor categorical",
            orphan
        )));
    }
    if !is_ordered_subsequence(&file.numeric_cols, &file.input_cols)
        || !is_ordered_subsequence(&file.categorical_cols, &file.input_cols)
    {
        return Err(LoadError::schema(
            "numeric_cols and categorical_cols must follow input_cols order",
        ));
    }
    Ok(())
}

fn validate_transformers(file: &BundleFile) -> Result<(), LoadError> {
    let n_numeric = file.numeric_cols.len();

    if file.imputer.width() != n_numeric {
        return Err(LoadError::component(
            "imputer",
            format!(
                "fitted on {} columns, bundle has {} numeric columns",
                file.imputer.width(),
                n_numeric
            ),
        ));
    }
    if file.imputer.statistics.iter().any(|s| s.is_nan()) {
        return Err(LoadError::component("imputer", "fill statistics contain NaN"));
    }

    file.scaler
        .check()
        .map_err(|m| LoadError::component("scaler", m))?;
    if file.scaler.width() != n_numeric {
        return Err(LoadError::component(
            "scaler",
            format!(
                "fitted on {} columns, bundle has {} numeric columns",
                file.scaler.width(),
                n_numeric
            ),
        ));
    }

    match &file.encoder.categories {
        Some(categories) => {
            if categories.len() != file.categorical_cols.len() {
                return Err(LoadError::component(
                    "encoder",
                    format!(
                        "fitted on {} columns, bundle has {} categorical columns",
                        categories.len(),
                        file.categorical_cols.len()
                    ),
                ));
            }
            for (col, cats) in file.categorical_cols.iter().zip(categories) {
                if cats.is_empty() {
                    return Err(LoadError::component(
                        "encoder",
                        format!("no categories for column '{}'", col),
                    ));
                }
                if let Some(dup) = find_duplicate(cats) {
                    return Err(LoadError::component(
                        "encoder",
                        format!("duplicate category '{}' for column '{}'", dup, col),
                    ));
                }
            }
            if file.encoder.output_width() != file.encoded_cols.len() {
                return Err(LoadError::component(
                    "encoder",
                    format!(
                        "produces {} columns, encoded_cols lists {}",
                        file.encoder.output_width(),
                        file.encoded_cols.len()
                    ),
                ));
            }
        }
        // without category lists the encoder contributes no columns
        None if !file.encoded_cols.is_empty() => {
            return Err(LoadError::component(
                "encoder",
                format!(
                    "exported no categories, encoded_cols lists {}",
                    file.encoded_cols.len()
                ),
            ));
        }
        None if !file.categorical_cols.is_empty() => {
            warn!("Encoder exported no category lists; categorical inputs fall back to 'Unknown'");
        }
        None => {}
    }
    Ok(())
}

fn validate_model(model: &dyn Classifier, n_features: usize) -> Result<(), LoadError> {
    let classes = model.classes();
    if classes.len() != 2
        || classes[POSITIVE_CLASS_INDEX] != Label::POSITIVE
        || classes[1 - POSITIVE_CLASS_INDEX] != Label::NEGATIVE
    {
        return Err(LoadError::component(
            "model",
            format!(
                "expected classes [\"{}\", \"{}\"], found {:?}",
                Label::NEGATIVE,
                Label::POSITIVE,
                classes
            ),
        ));
    }
    if model.n_features() != n_features {
        return Err(LoadError::component(
            "model",
            format!(
                "expects {} features, pipeline produces {}",
                model.n_features(),
                n_features
            ),
        ));
    }
    Ok(())
}
