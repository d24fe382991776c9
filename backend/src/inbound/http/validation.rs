//! Shared validation helpers for inbound HTTP adapters.
//!
//! Mobile clients send coordinates and sizes either as JSON numbers or as
//! numeric strings, spell coordinates `lat`/`lng` or `latitude`/`longitude`,
//! and sometimes post the vertex list as a JSON-encoded string. The helpers
//! here absorb those variations before domain constructors run.

use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::domain::{
    Boundary, Error, FieldValidationError, GeoPoint, InvalidId,
    RegistrationValidationError, TreeMarkInput, ZoneValidationError,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidNumber,
    InvalidSize,
    InvalidStatus,
    NotAList,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidNumber => "invalid_number",
            ErrorCode::InvalidSize => "invalid_size",
            ErrorCode::InvalidStatus => "bad_status",
            ErrorCode::NotAList => "not_a_list",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: &str, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code,
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(field, ErrorCode::MissingField.as_str(), format!("missing required field: {name}"))
}

pub(crate) fn invalid_number_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(field, ErrorCode::InvalidNumber.as_str(), format!("{name} must be a number"))
}

pub(crate) fn invalid_status_error(field: FieldName, allowed: &str) -> Error {
    let name = field.as_str();
    field_error(
        field,
        ErrorCode::InvalidStatus.as_str(),
        format!("{name} must be one of {allowed}"),
    )
}

pub(crate) fn not_a_list_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(field, ErrorCode::NotAList.as_str(), format!("{name} must be a list"))
}

pub(crate) fn map_field_validation_error(err: &FieldValidationError) -> Error {
    let code = match err {
        FieldValidationError::MissingName => ErrorCode::MissingField,
        FieldValidationError::InvalidSize => ErrorCode::InvalidSize,
    };
    field_error(FieldName::new(err.field()), code.as_str(), err.to_string())
}

pub(crate) fn map_zone_validation_error(err: &ZoneValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "code": err.code() }))
}

pub(crate) fn map_registration_error(err: &RegistrationValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "code": err.code() }))
}

/// Deserialise a key so that an explicit `null` is distinguishable from an
/// absent key: absent stays `None` (via `#[serde(default)]`), `null` becomes
/// `Some(Value::Null)`.
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Read a JSON number or numeric string. Blank strings count as absent.
///
/// # Examples
/// ```ignore
/// assert_eq!(lenient_f64(&json!("12.5")), Some(12.5));
/// ```
pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Read a whole number the same way as [`lenient_f64`].
pub(crate) fn lenient_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(raw) => raw.trim().parse::<i32>().ok(),
        _ => None,
    }
}

/// Optional number field: absent or `null` is `None`; anything unparseable
/// is a `400`.
pub(crate) fn optional_f64(value: Option<&Value>, field: FieldName) -> Result<Option<f64>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(raw) => lenient_f64(raw).map(Some).ok_or_else(|| invalid_number_error(field)),
    }
}

/// Optional whole number field with the same rules as [`optional_f64`].
pub(crate) fn optional_i32(value: Option<&Value>, field: FieldName) -> Result<Option<i32>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(raw) => lenient_i32(raw).map(Some).ok_or_else(|| invalid_number_error(field)),
    }
}

fn coordinate(object: &serde_json::Map<String, Value>, long: &str, short: &str) -> Option<f64> {
    object
        .get(long)
        .or_else(|| object.get(short))
        .and_then(lenient_f64)
}

/// Position of a vertex or mark object, if both coordinates are usable.
pub(crate) fn position_of(value: &Value) -> Option<GeoPoint> {
    let object = value.as_object()?;
    let latitude = coordinate(object, "latitude", "lat")?;
    let longitude = coordinate(object, "longitude", "lng")?;
    GeoPoint::new(latitude, longitude)
}

/// Parse a vertex list sent as a JSON array or as a JSON-encoded string.
/// Anything else, including undecodable strings, yields an empty boundary.
/// Unusable vertices are skipped and the rest renumbered from 1.
pub(crate) fn boundary_from(value: &Value) -> Boundary {
    let decoded;
    let list = match value {
        Value::Array(items) => items.as_slice(),
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw).unwrap_or(Value::Null);
            decoded.as_array().map_or(&[][..], Vec::as_slice)
        }
        _ => &[],
    };
    Boundary::from_points(list.iter().filter_map(position_of))
}

/// Convert one mark object. A non-object yields an input without position,
/// which the domain skips.
pub(crate) fn mark_input(value: &Value) -> TreeMarkInput {
    TreeMarkInput {
        tree_no: value.get("tree_no").and_then(lenient_i32),
        position: position_of(value),
    }
}

/// Convert a list of mark objects.
pub(crate) fn mark_inputs(items: &[Value]) -> Vec<TreeMarkInput> {
    items.iter().map(mark_input).collect()
}

/// Identifier taken from a path segment. Non-positive ids cannot exist, so
/// they are reported as missing resources.
pub(crate) fn path_id<T>(raw: i32, kind: &str) -> Result<T, Error>
where
    T: TryFrom<i32, Error = InvalidId>,
{
    T::try_from(raw).map_err(|_| Error::not_found(format!("{kind} {raw} not found")))
}

/// Identifier taken from a body or query value.
pub(crate) fn body_id<T>(raw: i32, field: FieldName) -> Result<T, Error>
where
    T: TryFrom<i32, Error = InvalidId>,
{
    T::try_from(raw).map_err(|_| invalid_number_error(field))
}

/// Optional identifier filter from a query string.
pub(crate) fn optional_id<T>(raw: Option<i32>, field: FieldName) -> Result<Option<T>, Error>
where
    T: TryFrom<i32, Error = InvalidId>,
{
    raw.map(|value| body_id(value, field)).transpose()
}

/// Trimmed, non-empty string.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
