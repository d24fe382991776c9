//! Inspection rounds: images, nutrient findings and fertilizer
//! recommendations recorded while surveying a zone.

use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{
    FertilizerId, FieldId, ImageId, InspectionId, RecommendationId, UserId, ZoneId,
};

/// Maximum number of images stored per round.
pub const MAX_IMAGES_PER_ROUND: i64 = 5;
/// Maximum accepted size of one image in bytes.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
/// Accepted image file extensions, lowercase.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Error for status strings outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

/// Lifecycle of an inspection round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    /// Open: images may be uploaded.
    Pending,
    /// Closed after review.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl InspectionStatus {
    /// Database and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InspectionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Progress of a fertilizer recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    /// Proposed, not acted on.
    Suggested,
    /// Fertilizer has been applied.
    Applied,
    /// Farmer chose not to apply.
    Skipped,
}

impl RecommendationStatus {
    /// Database and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for RecommendationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suggested" => Ok(Self::Suggested),
            "applied" => Ok(Self::Applied),
            "skipped" => Ok(Self::Skipped),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Severity of a detected deficiency, derived from detector confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low confidence.
    Mild,
    /// Medium confidence.
    Moderate,
    /// High confidence.
    Severe,
}

impl Severity {
    /// Bucket a confidence in `[0, 1]`.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Self::Severe
        } else if confidence >= 0.5 {
            Self::Moderate
        } else {
            Self::Mild
        }
    }

    /// Database and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// Lowercase extension of `filename` if it is an accepted image type.
///
/// # Examples
/// ```
/// use backend::domain::image_extension;
///
/// assert_eq!(image_extension("leaf.JPG").as_deref(), Some("jpg"));
/// assert_eq!(image_extension("notes.txt"), None);
/// assert_eq!(image_extension("jpg"), None);
/// ```
#[must_use]
pub fn image_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() && !filename.starts_with('.') {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// Inspection round of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Round identifier.
    pub id: InspectionId,
    /// Field the zone belongs to.
    pub field_id: FieldId,
    /// Inspected zone.
    pub zone_id: ZoneId,
    /// Owner of the field.
    pub owner_id: UserId,
    /// Sequence number of the round within its zone, from 1.
    pub round_no: i32,
    /// Current status.
    pub status: InspectionStatus,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the round was opened.
    pub inspected_at: DateTime<Utc>,
}

/// Request to open a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInspection {
    /// Field the zone belongs to.
    pub field_id: FieldId,
    /// Zone to inspect.
    pub zone_id: ZoneId,
    /// Round number to assign.
    pub round_no: i32,
    /// Trimmed notes, `None` when blank.
    pub notes: Option<String>,
    /// Opening time.
    pub inspected_at: DateTime<Utc>,
}

/// Upload bookkeeping stored with each image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Client-side file name.
    pub original_name: String,
    /// Name of the stored file.
    pub saved_name: String,
    /// Compact UTC timestamp used in the stored name.
    pub saved_at_utc: String,
}

/// Stored inspection image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionImage {
    /// Image identifier.
    pub id: ImageId,
    /// Owning round.
    pub inspection_id: InspectionId,
    /// Path relative to the upload root.
    pub image_path: String,
    /// Path of the annotated image, once produced.
    pub detection_path: Option<String>,
    /// Upload time.
    pub captured_at: DateTime<Utc>,
    /// Upload bookkeeping.
    pub meta: ImageMeta,
}

/// Image row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInspectionImage {
    /// Path relative to the upload root.
    pub image_path: String,
    /// Upload time.
    pub captured_at: DateTime<Utc>,
    /// Upload bookkeeping.
    pub meta: ImageMeta,
}

/// Nutrient deficiency detected in a round.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Image the finding came from, if any.
    pub image_id: Option<ImageId>,
    /// Tree the finding refers to, if known.
    pub tree_no: Option<i32>,
    /// Nutrient reference code.
    pub nutrient_code: String,
    /// Severity bucket.
    pub severity: Severity,
    /// Detector confidence as a percentage with two decimals.
    pub confidence: f64,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// Fertilizer recommendation with reference names joined in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// Recommendation identifier.
    pub id: RecommendationId,
    /// Owning round.
    pub inspection_id: InspectionId,
    /// Recommended fertilizer.
    pub fertilizer_id: Option<FertilizerId>,
    /// Nutrient being corrected.
    pub nutrient_code: Option<String>,
    /// Advice text.
    pub text: String,
    /// Dose per area, free text.
    pub rate_per_area: Option<String>,
    /// Application method, free text.
    pub application_method: Option<String>,
    /// Progress.
    pub status: RecommendationStatus,
    /// Day the fertilizer was applied.
    pub applied_date: Option<NaiveDate>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Fertilizer name.
    pub fertilizer_name: Option<String>,
    /// Fertilizer formulation.
    pub formulation: Option<String>,
    /// Nutrient name.
    pub nutrient_name: Option<String>,
}

/// Recommendation row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecommendation {
    /// Recommended fertilizer.
    pub fertilizer_id: Option<FertilizerId>,
    /// Nutrient being corrected.
    pub nutrient_code: String,
    /// Advice text.
    pub text: String,
}

/// Status change for a recommendation.
///
/// ## Invariants
/// - `applied_date` is `Some` exactly when `status` is `Applied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationUpdate {
    status: RecommendationStatus,
    applied_date: Option<NaiveDate>,
}

/// Reasons a recommendation update is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecommendationUpdateError {
    /// Status outside suggested|applied|skipped.
    #[error("status must be one of suggested, applied, skipped")]
    BadStatus,
    /// Applied date not in `YYYY-MM-DD` form.
    #[error("applied_date must use YYYY-MM-DD")]
    BadDateFormat,
}

impl RecommendationUpdateError {
    /// Stable code reported to clients in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadStatus => "bad_status",
            Self::BadDateFormat => "bad_date_format",
        }
    }
}

impl RecommendationUpdate {
    /// Build an update. An applied status without a date uses `today`; other
    /// statuses clear the date.
    pub fn try_new(
        status: &str,
        applied_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, RecommendationUpdateError> {
        let status = status
            .parse::<RecommendationStatus>()
            .map_err(|_| RecommendationUpdateError::BadStatus)?;
        let applied_date = match status {
            RecommendationStatus::Applied => match applied_date.map(str::trim) {
                Some(raw) if !raw.is_empty() => Some(
                    parse_day(raw).ok_or(RecommendationUpdateError::BadDateFormat)?,
                ),
                _ => Some(today),
            },
            RecommendationStatus::Suggested | RecommendationStatus::Skipped => None,
        };
        Ok(Self {
            status,
            applied_date,
        })
    }

    /// New status.
    pub fn status(&self) -> RecommendationStatus {
        self.status
    }

    /// Applied date, set only for applied recommendations.
    pub fn applied_date(&self) -> Option<NaiveDate> {
        self.applied_date
    }
}

/// Parse a `YYYY-MM-DD` day.
#[must_use]
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Bucket width for the history report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryGrouping {
    /// `YYYY-MM` buckets.
    #[default]
    Month,
    /// `YYYY` buckets.
    Year,
}

impl HistoryGrouping {
    /// Parse a grouping, falling back to monthly for anything unknown.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("year") => Self::Year,
            _ => Self::Month,
        }
    }

    /// Bucket label for a timestamp.
    pub fn bucket(self, at: DateTime<Utc>) -> String {
        match self {
            Self::Month => format!("{:04}-{:02}", at.year(), at.month()),
            Self::Year => format!("{:04}", at.year()),
        }
    }
}

/// Inclusive time range. `to` reaches the last second of its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    /// Earliest instant included.
    pub from: Option<DateTime<Utc>>,
    /// Latest instant included.
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Build a range from optional `YYYY-MM-DD` strings. Unparseable bounds
    /// are ignored.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::DateRange;
    ///
    /// let range = DateRange::from_days(Some("2025-01-01"), Some("2025-01-31"));
    /// assert_eq!(range.to.unwrap().to_rfc3339(), "2025-01-31T23:59:59+00:00");
    /// ```
    pub fn from_days(from: Option<&str>, to: Option<&str>) -> Self {
        let start = from
            .and_then(parse_day)
            .map(|day| day.and_time(NaiveTime::MIN).and_utc());
        let end = to.and_then(parse_day).and_then(|day| {
            day.succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc() - TimeDelta::seconds(1))
        });
        Self {
            from: start,
            to: end,
        }
    }
}

/// History report filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    /// Bucket width.
    pub group: HistoryGrouping,
    /// Time window on `inspected_at`.
    pub range: DateRange,
    /// Restrict to one field.
    pub field_id: Option<FieldId>,
    /// Restrict to one zone.
    pub zone_id: Option<ZoneId>,
}

/// One history bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBucket {
    /// `YYYY-MM` or `YYYY`.
    pub bucket: String,
    /// Rounds opened in the bucket.
    pub inspections: i64,
    /// Findings recorded for those rounds.
    pub findings: i64,
}

/// Finding count per nutrient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NutrientCount {
    /// Nutrient reference code.
    pub nutrient_code: String,
    /// Number of findings.
    pub count: i64,
}

/// Number of nutrients listed in the history report.
pub const TOP_NUTRIENTS: usize = 5;

/// History report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionHistory {
    /// Bucket width used.
    pub group: HistoryGrouping,
    /// Buckets in ascending order.
    pub buckets: Vec<HistoryBucket>,
    /// Most frequent nutrients, at most [`TOP_NUTRIENTS`].
    pub top_nutrients: Vec<NutrientCount>,
}

/// Filters for the paged inspection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InspectionFilter {
    /// Calendar year of `inspected_at`.
    pub year: Option<i32>,
    /// Calendar month (1-12) of `inspected_at`.
    pub month: Option<u32>,
    /// Restrict to one field.
    pub field_id: Option<FieldId>,
    /// Restrict to one zone.
    pub zone_id: Option<ZoneId>,
}

/// Inspection list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionSummary {
    /// Round.
    pub inspection: Inspection,
    /// Zone name.
    pub zone_name: String,
    /// Field name.
    pub field_name: String,
    /// Number of images.
    pub images: i64,
    /// Number of findings.
    pub findings: i64,
    /// Number of recommendations.
    pub recommendations: i64,
}

/// Round with its related records.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionDetail {
    /// Round.
    pub inspection: Inspection,
    /// Zone name.
    pub zone_name: String,
    /// Field name.
    pub field_name: String,
    /// Images ordered by id.
    pub images: Vec<InspectionImage>,
    /// Findings in insertion order.
    pub findings: Vec<Finding>,
    /// Advisory messages about the round's state.
    pub warnings: Vec<String>,
}

impl InspectionDetail {
    /// Derive advisory messages from the round's contents.
    pub fn derive_warnings(images: usize, findings: usize, status: InspectionStatus) -> Vec<String> {
        let mut warnings = Vec::new();
        if images == 0 {
            warnings.push("no images uploaded yet".to_owned());
        } else if findings == 0 {
            warnings.push("images have not been analysed yet".to_owned());
        }
        if status == InspectionStatus::Pending
            && i64::try_from(images).is_ok_and(|n| n >= MAX_IMAGES_PER_ROUND)
        {
            warnings.push("image quota reached for this round".to_owned());
        }
        warnings
    }
}

/// Result of opening a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRound {
    /// The open round.
    pub inspection: Inspection,
    /// True when an already pending round was returned.
    pub idempotent: bool,
}

/// Image upload as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Client-side file name.
    pub filename: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Result of storing an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Stored image.
    pub image: InspectionImage,
    /// Images still accepted by the round.
    pub quota_remain: i64,
}

/// Result of running the detector over a round.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// Findings now stored for the round.
    pub findings: Vec<Finding>,
    /// Number of suggested recommendations generated.
    pub recommendations: usize,
    /// Images that could not be analysed.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).expect("valid date")
    }

    #[rstest]
    #[case("photo.png", Some("png"))]
    #[case("photo.WebP", Some("webp"))]
    #[case("archive.tar.gz", None)]
    #[case("noext", None)]
    #[case("", None)]
    fn image_extensions(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(image_extension(name).as_deref(), expected);
    }

    #[rstest]
    #[case(0.95, Severity::Severe)]
    #[case(0.82, Severity::Moderate)]
    #[case(0.2, Severity::Mild)]
    fn severity_buckets(#[case] confidence: f64, #[case] expected: Severity) {
        assert_eq!(Severity::from_confidence(confidence), expected);
    }

    #[rstest]
    fn applied_without_date_uses_today() {
        let update = RecommendationUpdate::try_new("Applied", None, today()).expect("valid");
        assert_eq!(update.status(), RecommendationStatus::Applied);
        assert_eq!(update.applied_date(), Some(today()));
    }

    #[rstest]
    fn applied_with_date_keeps_it() {
        let update =
            RecommendationUpdate::try_new("applied", Some("2025-02-01"), today()).expect("valid");
        assert_eq!(update.applied_date(), NaiveDate::from_ymd_opt(2025, 2, 1));
    }

    #[rstest]
    fn other_statuses_clear_date() {
        let update =
            RecommendationUpdate::try_new("skipped", Some("2025-02-01"), today()).expect("valid");
        assert_eq!(update.applied_date(), None);
    }

    #[rstest]
    #[case("done", None, RecommendationUpdateError::BadStatus)]
    #[case("applied", Some("01/02/2025"), RecommendationUpdateError::BadDateFormat)]
    fn invalid_updates(
        #[case] status: &str,
        #[case] date: Option<&str>,
        #[case] expected: RecommendationUpdateError,
    ) {
        assert_eq!(RecommendationUpdate::try_new(status, date, today()), Err(expected));
    }

    #[rstest]
    #[case(Some("YEAR"), HistoryGrouping::Year)]
    #[case(Some("week"), HistoryGrouping::Month)]
    #[case(None, HistoryGrouping::Month)]
    fn grouping_falls_back_to_month(#[case] raw: Option<&str>, #[case] expected: HistoryGrouping) {
        assert_eq!(HistoryGrouping::parse_lenient(raw), expected);
    }

    #[rstest]
    fn buckets_are_zero_padded() {
        let at = Utc.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).single().expect("valid time");
        assert_eq!(HistoryGrouping::Month.bucket(at), "2025-04");
        assert_eq!(HistoryGrouping::Year.bucket(at), "2025");
    }

    #[rstest]
    fn range_ignores_malformed_bounds() {
        let range = DateRange::from_days(Some("yesterday"), None);
        assert_eq!(range, DateRange::default());
    }

    #[rstest]
    fn range_starts_at_midnight() {
        let range = DateRange::from_days(Some("2025-01-05"), None);
        let expected = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).single();
        assert_eq!(range.from, expected);
    }

    #[rstest]
    fn warnings_follow_round_contents() {
        assert_eq!(
            InspectionDetail::derive_warnings(0, 0, InspectionStatus::Pending),
            vec!["no images uploaded yet".to_owned()]
        );
        assert_eq!(
            InspectionDetail::derive_warnings(5, 2, InspectionStatus::Pending),
            vec!["image quota reached for this round".to_owned()]
        );
        assert!(InspectionDetail::derive_warnings(5, 2, InspectionStatus::Completed).is_empty());
    }
}
