//! Zones (subdivisions of a field) and the tree marks inside them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{FieldId, GeoPoint, MarkId, UserId, ZoneId};

/// Errors raised while validating zone and mark inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneValidationError {
    /// The zone name was absent or blank.
    #[error("zone_name is required")]
    MissingName,
    /// Tree count below zero.
    #[error("num_trees must be zero or greater")]
    NegativeTreeCount,
    /// A tree number below one.
    #[error("tree_no must be a positive integer")]
    InvalidTreeNumber,
    /// The same tree number appears twice in one request.
    #[error("tree_no {tree_no} appears more than once")]
    DuplicateTreeNumber { tree_no: i32 },
}

impl ZoneValidationError {
    /// Stable code reported to clients in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_field",
            Self::NegativeTreeCount => "invalid_tree_count",
            Self::InvalidTreeNumber => "invalid_tree_no",
            Self::DuplicateTreeNumber { .. } => "duplicate_tree_no",
        }
    }
}

/// Stored zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zone identifier.
    pub id: ZoneId,
    /// Parent field.
    pub field_id: FieldId,
    /// Owner of the parent field.
    pub owner_id: UserId,
    /// Zone name.
    pub name: String,
    /// Number of trees in the zone.
    pub num_trees: i32,
    /// Number of inspection rounds recorded for the zone.
    pub inspection_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Validated name and tree count for a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDraft {
    name: String,
    num_trees: i32,
}

impl ZoneDraft {
    /// Validate a zone name and tree count. A missing count means zero.
    pub fn try_new(name: Option<&str>, num_trees: Option<i32>) -> Result<Self, ZoneValidationError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ZoneValidationError::MissingName)?;
        let num_trees = num_trees.unwrap_or(0);
        if num_trees < 0 {
            return Err(ZoneValidationError::NegativeTreeCount);
        }
        Ok(Self {
            name: name.to_owned(),
            num_trees,
        })
    }

    /// Zone name, trimmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared tree count.
    pub fn num_trees(&self) -> i32 {
        self.num_trees
    }

    /// Replace the tree count, e.g. with the number of marks supplied.
    #[must_use]
    pub fn with_num_trees(mut self, num_trees: i32) -> Self {
        self.num_trees = num_trees.max(0);
        self
    }
}

/// Result of creating a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedZone {
    /// Stored zone.
    pub zone: Zone,
    /// Number of marks inserted with it.
    pub inserted_marks: usize,
}

/// Mark counts after a mark mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkTally {
    /// Marks written by the request.
    pub inserted: usize,
    /// Tree count recomputed from the stored marks.
    pub num_trees: i32,
}

/// Stored tree location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeMark {
    /// Mark identifier.
    pub id: MarkId,
    /// Zone the tree belongs to.
    pub zone_id: ZoneId,
    /// Tree number, unique per zone.
    pub tree_no: i32,
    /// Tree position.
    pub position: GeoPoint,
}

/// Tree location to be stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeMarkDraft {
    /// Tree number, unique per zone.
    pub tree_no: i32,
    /// Tree position.
    pub position: GeoPoint,
}

/// Tree mark as received, before defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeMarkInput {
    /// Explicit tree number, if the client sent one.
    pub tree_no: Option<i32>,
    /// Parsed position; `None` when the coordinates were unusable.
    pub position: Option<GeoPoint>,
}

/// Resolve a batch of marks.
///
/// Marks without a usable position are dropped. A missing `tree_no` defaults
/// to the 1-based index of the mark in the submitted list, counted before
/// anything is dropped.
///
/// # Examples
/// ```
/// use backend::domain::{GeoPoint, TreeMarkInput, resolve_tree_marks};
///
/// let position = GeoPoint::new(7.0, 99.0);
/// let marks = resolve_tree_marks(&[
///     TreeMarkInput { tree_no: None, position },
///     TreeMarkInput { tree_no: None, position: None },
///     TreeMarkInput { tree_no: None, position },
/// ])
/// .unwrap();
/// assert_eq!(marks.iter().map(|m| m.tree_no).collect::<Vec<_>>(), vec![1, 3]);
/// ```
pub fn resolve_tree_marks(
    inputs: &[TreeMarkInput],
) -> Result<Vec<TreeMarkDraft>, ZoneValidationError> {
    let mut seen = HashSet::new();
    let mut marks = Vec::with_capacity(inputs.len());
    for (input, index) in inputs.iter().zip(1..) {
        let Some(position) = input.position else {
            continue;
        };
        let tree_no = input.tree_no.unwrap_or(index);
        if tree_no < 1 {
            return Err(ZoneValidationError::InvalidTreeNumber);
        }
        if !seen.insert(tree_no) {
            return Err(ZoneValidationError::DuplicateTreeNumber { tree_no });
        }
        marks.push(TreeMarkDraft { tree_no, position });
    }
    Ok(marks)
}
