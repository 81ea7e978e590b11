//! Local dataset served when the backend cannot be read.

use std::collections::BTreeSet;

use chrono::Utc;
use facility_core::{EditAction, EditLogEntry, EditStatus, FacilityError};
use serde_json::{json, Value};
use tracing::error;

use crate::fields::{self, Document};

const EMBEDDED_FACILITIES: &str = include_str!("../data/sample_facilities.json");

fn raw_or_null(doc: &Document, aliases: &fields::FieldAliases) -> Value {
    aliases.resolve(doc).cloned().unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FallbackDataset {
    documents: Vec<Document>,
}

impl FallbackDataset {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Parses a JSON array of raw facility documents; non-object entries are skipped.
    pub fn from_json_str(json: &str) -> Result<Self, FacilityError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| FacilityError::Parse(err.to_string()))?;
        let entries = value.as_array().ok_or_else(|| {
            FacilityError::Parse("expected a JSON array of facilities".to_string())
        })?;
        Ok(Self::new(
            entries.iter().filter_map(Value::as_object).cloned().collect(),
        ))
    }

    /// The dataset bundled with the crate.
    pub fn embedded() -> Self {
        match Self::from_json_str(EMBEDDED_FACILITIES) {
            Ok(dataset) => dataset,
            Err(err) => {
                error!(error = %err, "bundled fallback dataset is unreadable");
                Self::default()
            }
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Distinct governorates in first-seen order, as raw governorate documents.
    pub fn governorates(&self) -> Vec<Value> {
        let mut seen = BTreeSet::new();
        self.documents
            .iter()
            .filter_map(|doc| fields::GOVERNORATE.non_empty_text(doc))
            .filter(|name| seen.insert(name.clone()))
            .enumerate()
            .map(|(index, name)| json!({ "$id": format!("gov_{index}"), "name": name }))
            .collect()
    }

    /// One approved seed entry per facility.
    pub fn seed_edits(&self) -> Vec<EditLogEntry> {
        self.documents
            .iter()
            .map(|doc| {
                let facility_id = fields::ID.text(doc).unwrap_or_default();
                EditLogEntry {
                    id: Some(format!("edit_{facility_id}")),
                    facility_id,
                    user_id: Some("mock_user".to_string()),
                    user_name: None,
                    action: EditAction::Seed,
                    changes: json!({
                        "facilityName": raw_or_null(doc, &fields::FACILITY_NAME),
                        "facilityStatus": raw_or_null(doc, &fields::STATUS),
                    }),
                    status: EditStatus::Approved,
                    timestamp: fields::extract_datetime(doc, &fields::UPDATED_AT)
                        .unwrap_or_else(Utc::now),
                    admin_notes: None,
                }
            })
            .collect()
    }
}
