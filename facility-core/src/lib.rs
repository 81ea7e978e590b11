//! Canonical facility model, normalization tables and shared configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod labels;
pub mod owner;
pub mod status;

pub use labels::{canonical_key, canonicalize, LabelRules};
pub use owner::{OwnerCategory, OwnerCategoryRule, OwnerCategoryRules};
pub use status::{FacilityStatus, Locale, StatusEntry, StatusLabels, StatusVocabulary};

/// Every lookup table the normalizers consume, injected rather than global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct NormalizationTables {
    pub labels: LabelRules,
    pub statuses: StatusVocabulary,
    pub owner_categories: OwnerCategoryRules,
}

/// Option lists always offered to filter and form controls, whatever the data holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferencePresets {
    pub facility_types: Vec<String>,
    pub owners: Vec<String>,
    pub affiliations: Vec<String>,
}

/// Runtime configuration for the registry service and the pure pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Whether a live backend is wired in at all.
    pub configured: bool,
    /// Documents requested per page; zero means the built-in default.
    pub page_size: usize,
    /// Serve the local dataset when the backend cannot be read.
    pub fallback_enabled: bool,
    /// Search terms shorter than this are ignored.
    pub search_min_chars: usize,
    pub tables: NormalizationTables,
    pub presets: ReferencePresets,
}

pub const DEFAULT_PAGE_SIZE: usize = 100;

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            configured: true,
            page_size: DEFAULT_PAGE_SIZE,
            fallback_enabled: true,
            search_min_chars: 2,
            tables: NormalizationTables::default(),
            presets: ReferencePresets::default(),
        }
    }
}

impl RegistryConfig {
    pub fn effective_page_size(&self) -> usize {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }
}

/// Weak reference to a user account. Never owns or resolves the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserRef(pub String);

impl UserRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

pub fn longitude_in_range(value: f64) -> bool {
    value.is_finite() && value >= LONGITUDE_RANGE.0 && value <= LONGITUDE_RANGE.1
}

pub fn latitude_in_range(value: f64) -> bool {
    value.is_finite() && value >= LATITUDE_RANGE.0 && value <= LATITUDE_RANGE.1
}

/// WGS84 position. Both halves exist together or not at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// Builds a position only when both values are finite and within bounds.
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        if longitude_in_range(longitude) && latitude_in_range(latitude) {
            Some(Self {
                longitude,
                latitude,
            })
        } else {
            None
        }
    }

    pub fn to_geometry(self) -> Geometry {
        Geometry::Point {
            coordinates: [self.longitude, self.latitude],
        }
    }
}

/// GeoJSON-style geometry as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    pub fn as_point(&self) -> Option<[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => Some(*coordinates),
            _ => None,
        }
    }
}

/// Canonical facility entity. Produced only by the record mapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: String,
    pub facility_name: String,
    pub establishment_name: Option<String>,
    pub governorate: String,
    pub facility_status: FacilityStatus,
    /// Source label the status was derived from, kept for display.
    pub status_label: String,
    pub facility_type_label: String,
    pub facility_owner: String,
    pub facility_affiliation: String,
    pub coordinates: Option<Coordinates>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserRef>,
    pub last_edited_by: Option<UserRef>,
}

impl Facility {
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    /// Point geometry derived from the coordinates.
    pub fn geometry(&self) -> Option<Geometry> {
        self.coordinates.map(Coordinates::to_geometry)
    }
}

/// Name in the registry's primary language with an optional second variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LocalizedName {
    pub primary: String,
    pub secondary: Option<String>,
}

impl LocalizedName {
    /// Returns `None` when neither variant carries text.
    pub fn new(primary: Option<String>, secondary: Option<String>) -> Option<Self> {
        let primary = primary.filter(|s| !s.trim().is_empty());
        let secondary = secondary.filter(|s| !s.trim().is_empty());
        match (primary, secondary) {
            (Some(primary), secondary) => Some(Self { primary, secondary }),
            (None, Some(secondary)) => Some(Self {
                primary: secondary,
                secondary: None,
            }),
            (None, None) => None,
        }
    }

    pub fn display(&self) -> &str {
        &self.primary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Governorate {
    pub id: String,
    pub name: LocalizedName,
    pub boundary: Option<Geometry>,
}

/// Inclusion constraints over a facility collection. Empty fields do not constrain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpecification {
    pub search_term: String,
    pub governorate: String,
    pub statuses: BTreeSet<String>,
    pub facility_types: BTreeSet<String>,
    pub owners: BTreeSet<String>,
    pub affiliations: BTreeSet<String>,
}

impl FilterSpecification {
    /// Lowercased search needle, present only when it is long enough to apply.
    pub fn search_needle(&self, min_chars: usize) -> Option<String> {
        let term = self.search_term.trim();
        if term.chars().count() >= min_chars.max(1) {
            Some(term.to_lowercase())
        } else {
            None
        }
    }

    pub fn governorate(&self) -> Option<&str> {
        let value = self.governorate.trim();
        (!value.is_empty()).then_some(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Created,
    Updated,
    Seed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EditStatus::Pending => "pending",
            EditStatus::Approved => "approved",
            EditStatus::Rejected => "rejected",
        }
    }

    /// Review decisions only ever leave the pending state.
    pub fn can_transition_to(self, next: EditStatus) -> bool {
        matches!(
            (self, next),
            (EditStatus::Pending, EditStatus::Approved)
                | (EditStatus::Pending, EditStatus::Rejected)
        )
    }
}

impl fmt::Display for EditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record per facility mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditLogEntry {
    #[serde(default, rename = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub facility_id: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub action: EditAction,
    /// Raw form payload as submitted.
    pub changes: Value,
    pub status: EditStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// Field-level validation messages, keyed by backend field name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), FacilityError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FacilityError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Failures reported by the document store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend request failed ({code}): {message}")]
    Request { code: u16, message: String },
}

/// Library error for every fallible registry operation.
#[derive(Debug, thiserror::Error)]
pub enum FacilityError {
    #[error("could not read input: {0}")]
    Parse(String),
    #[error("validation failed: {0}")]
    Validation(ValidationReport),
    #[error("rejected by validation service: {0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("edit cannot move from {from} to {to}")]
    InvalidTransition { from: EditStatus, to: EditStatus },
}
