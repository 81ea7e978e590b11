//! Facility record normalization, filtering and aggregation over raw backend documents.

use facility_core::{Facility, FacilityError, RegistryConfig};
use serde_json::Value;

pub mod fallback;
pub mod fields;
pub mod filter;
pub mod mapper;
pub mod options;
pub mod query;
pub mod service;
pub mod stats;
pub mod store;
pub mod validation;

pub use fallback::FallbackDataset;
pub use fields::Document;
pub use filter::{FilterEngine, ResolvedFilter};
pub use mapper::{parse_geometry, FacilityForm, FacilityMapper};
pub use options::{derive_reference_options, ReferenceOptions};
pub use query::{run_queries, QueryConstraint, QueryOutcome};
pub use service::{EditPage, FacilityPage, GovernorateList, RegistryService, SaveContext, Source};
pub use stats::{build_stats, Aggregator, MonthCount, Stats};
pub use store::{Collection, DocumentList, DocumentStore, EditLog, FacilityValidator, MemoryStore};
pub use validation::{validate_form, StoreValidator};

/// Normalize facilities from a JSON string holding an array of documents.
pub fn normalize_documents_str(
    documents_json: &str,
    config: &RegistryConfig,
) -> Result<Vec<Facility>, FacilityError> {
    let value: Value =
        serde_json::from_str(documents_json).map_err(|err| FacilityError::Parse(err.to_string()))?;
    normalize_documents_value(&value, config)
}

/// Normalize facilities from a `serde_json::Value`.
///
/// Accepts either a bare array or a listing envelope with a `documents` array.
pub fn normalize_documents_value(
    documents: &Value,
    config: &RegistryConfig,
) -> Result<Vec<Facility>, FacilityError> {
    let entries = documents
        .as_array()
        .or_else(|| documents.get("documents").and_then(Value::as_array))
        .ok_or_else(|| {
            FacilityError::Parse(
                "expected an array of documents or a documents envelope".to_string(),
            )
        })?;

    let mapper = FacilityMapper::new(config.tables.clone());
    Ok(entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| mapper.to_canonical(entry))
        .collect())
}
