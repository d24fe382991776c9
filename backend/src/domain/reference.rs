//! Static reference data: nutrient deficiencies and fertilizers.

use super::FertilizerId;

/// Canonical label for a healthy leaf.
pub const NORMAL_LABEL: &str = "ปกติ";

/// Nutrient deficiency reference record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nutrient {
    /// Short code such as `N` or `K`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Visible symptoms.
    pub symptoms: Option<String>,
    /// Diagnostic notes.
    pub notes: Option<String>,
    /// Fertilizer usually recommended for this deficiency.
    pub fertilizer_id: Option<FertilizerId>,
}

/// Fertilizer reference record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fertilizer {
    /// Fertilizer identifier.
    pub id: FertilizerId,
    /// Product name.
    pub name: String,
    /// Formulation, e.g. `46-0-0`.
    pub formulation: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Both reference lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCatalogue {
    /// Nutrients ordered by code.
    pub nutrients: Vec<Nutrient>,
    /// Fertilizers ordered by id.
    pub fertilizers: Vec<Fertilizer>,
}

/// Map detector spellings of the healthy class onto [`NORMAL_LABEL`].
///
/// # Examples
/// ```
/// use backend::domain::{NORMAL_LABEL, normalize_label};
///
/// assert_eq!(normalize_label(" Nomal "), NORMAL_LABEL);
/// assert_eq!(normalize_label("K "), "K ");
/// ```
///
/// Any other label is returned exactly as the detector produced it.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.eq_ignore_ascii_case("normal") || trimmed.eq_ignore_ascii_case("nomal") {
        NORMAL_LABEL.to_owned()
    } else {
        label.to_owned()
    }
}

/// Whether a label denotes a healthy leaf.
#[must_use]
pub fn is_normal_label(label: &str) -> bool {
    normalize_label(label).trim() == NORMAL_LABEL
}
