//! Field (land parcel) model and its polygon boundary.

use chrono::{DateTime, Utc};

use super::{FieldId, UserId};

/// Errors raised while validating field inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldValidationError {
    /// The name was absent or blank.
    #[error("field_name is required")]
    MissingName,
    /// The area was absent, not finite, or not positive.
    #[error("size_square_meter must be greater than zero")]
    InvalidSize,
}

impl FieldValidationError {
    /// Request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingName => "field_name",
            Self::InvalidSize => "size_square_meter",
        }
    }
}

/// WGS84 coordinate.
///
/// ## Invariants
/// - Both components are finite.
/// - Latitude lies in `[-90, 90]`, longitude in `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Validate a coordinate pair, returning `None` when it is unusable.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::GeoPoint;
    ///
    /// assert!(GeoPoint::new(13.75, 100.5).is_some());
    /// assert!(GeoPoint::new(f64::NAN, 100.5).is_none());
    /// assert!(GeoPoint::new(91.0, 0.0).is_none());
    /// ```
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Boundary vertex with its 1-based position in the polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldVertex {
    /// 1-based order of the vertex in the ring.
    pub point_order: i32,
    /// Vertex coordinate.
    pub position: GeoPoint,
}

/// Ordered polygon vertices of a field.
///
/// Orders are always contiguous from 1, whatever the caller supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundary(Vec<FieldVertex>);

impl Boundary {
    /// Number the usable points 1..n in the given order.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        Self(
            points
                .into_iter()
                .zip(1..)
                .map(|(position, point_order)| FieldVertex {
                    point_order,
                    position,
                })
                .collect(),
        )
    }

    /// Vertices in order.
    pub fn vertices(&self) -> &[FieldVertex] {
        &self.0
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the boundary has no vertices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated input for creating or updating a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
    name: String,
    size_square_meter: f64,
    boundary: Option<Boundary>,
}

impl FieldDraft {
    /// Validate a draft. `boundary` of `None` leaves stored vertices untouched
    /// on update.
    pub fn try_new(
        name: Option<&str>,
        size_square_meter: Option<f64>,
        boundary: Option<Boundary>,
    ) -> Result<Self, FieldValidationError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(FieldValidationError::MissingName)?;
        let size = size_square_meter
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or(FieldValidationError::InvalidSize)?;
        Ok(Self {
            name: name.to_owned(),
            size_square_meter: size,
            boundary,
        })
    }

    /// Field name, trimmed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Area in square metres.
    pub fn size_square_meter(&self) -> f64 {
        self.size_square_meter
    }

    /// Replacement boundary, if one was supplied.
    pub fn boundary(&self) -> Option<&Boundary> {
        self.boundary.as_ref()
    }
}

/// Stored field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field identifier.
    pub id: FieldId,
    /// Owning account.
    pub owner_id: UserId,
    /// Field name.
    pub name: String,
    /// Area in square metres.
    pub size_square_meter: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Field list row.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    /// Field row.
    pub field: Field,
    /// Number of stored boundary vertices.
    pub vertex_count: i64,
}

/// Field with its full boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDetail {
    /// Field row.
    pub field: Field,
    /// Boundary ordered by `point_order`.
    pub vertices: Vec<FieldVertex>,
}
