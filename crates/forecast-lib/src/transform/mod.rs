//! Pre-fitted feature transformers

mod encoder;
mod imputer;
mod scaler;

pub use encoder::{HandleUnknown, OneHotEncoder};
pub use imputer::{ImputeStrategy, SimpleImputer};
pub use scaler::Scaler;

/// Option used for a categorical column when no fitted categories exist
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Source of the fitted category list for a categorical column
pub trait CategoryProvider {
    /// Ordered categories for `column`, or `None` if none were exported
    fn categories_for(&self, column: &str) -> Option<&[String]>;
}
