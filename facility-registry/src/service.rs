//! Registry operations over the backend, with an explicit local fallback.

use std::sync::Arc;

use chrono::Utc;
use facility_core::{
    BackendError, EditAction, EditLogEntry, EditStatus, Facility, FacilityError,
    FilterSpecification, Governorate, RegistryConfig,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fallback::FallbackDataset;
use crate::fields::{self, value_as_text, Document};
use crate::filter::FilterEngine;
use crate::mapper::{FacilityForm, FacilityMapper};
use crate::options::{derive_reference_options, ReferenceOptions};
use crate::query::QueryConstraint;
use crate::stats::{Aggregator, Stats};
use crate::store::{Collection, DocumentList, DocumentStore, EditLog, FacilityValidator};
use crate::validation::validate_form;

/// Where a listing came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Live,
    /// Served from the local dataset; `reason` is set when the backend failed.
    Fallback { reason: Option<String> },
}

impl Source {
    pub fn is_live(&self) -> bool {
        matches!(self, Source::Live)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityPage {
    pub facilities: Vec<Facility>,
    pub total: usize,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernorateList {
    pub governorates: Vec<Governorate>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditPage {
    pub entries: Vec<EditLogEntry>,
    pub source: Source,
}

/// Who is saving, and what.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveContext {
    /// Present when updating an existing facility.
    pub facility_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

const ANONYMOUS: &str = "anonymous";

pub struct RegistryService {
    config: RegistryConfig,
    mapper: FacilityMapper,
    engine: FilterEngine,
    aggregator: Aggregator,
    store: Option<Arc<dyn DocumentStore + Send + Sync>>,
    validator: Option<Arc<dyn FacilityValidator + Send + Sync>>,
    edit_log: Option<Arc<dyn EditLog + Send + Sync>>,
    fallback: FallbackDataset,
}

impl RegistryService {
    /// Service without a backend; every read is served from the bundled dataset.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            mapper: FacilityMapper::new(config.tables.clone()),
            engine: FilterEngine::from_config(&config),
            aggregator: Aggregator::new(config.tables.owner_categories.clone()),
            config,
            store: None,
            validator: None,
            edit_log: None,
            fallback: FallbackDataset::embedded(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn FacilityValidator + Send + Sync>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_edit_log(mut self, edit_log: Arc<dyn EditLog + Send + Sync>) -> Self {
        self.edit_log = Some(edit_log);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackDataset) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn mapper(&self) -> &FacilityMapper {
        &self.mapper
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    fn live_store(&self) -> Option<&Arc<dyn DocumentStore + Send + Sync>> {
        if self.config.configured {
            self.store.as_ref()
        } else {
            None
        }
    }

    /// Lists facilities matching `spec`, most recently updated first.
    ///
    /// Backend read failures degrade to the fallback dataset with the reason
    /// attached, unless fallback is disabled in the configuration.
    pub fn list_facilities(
        &self,
        spec: &FilterSpecification,
    ) -> Result<FacilityPage, FacilityError> {
        let Some(store) = self.live_store() else {
            return Ok(self.fallback_facilities(spec, None));
        };

        let mut queries = vec![QueryConstraint::order_desc("$updatedAt")];
        queries.extend(self.engine.compile(spec));

        match self.fetch_all(store.as_ref(), Collection::Facilities, &queries) {
            Ok(list) => Ok(FacilityPage {
                facilities: list
                    .documents
                    .iter()
                    .map(|doc| self.mapper.to_canonical_doc(doc))
                    .collect(),
                total: list.total,
                source: Source::Live,
            }),
            Err(err) if self.config.fallback_enabled => {
                warn!(error = %err, "falling back to local facilities");
                Ok(self.fallback_facilities(spec, Some(err.to_string())))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Filters the fallback dataset with the same engine the live path compiles from.
    pub fn fallback_facilities(
        &self,
        spec: &FilterSpecification,
        reason: Option<String>,
    ) -> FacilityPage {
        let resolved = self.engine.resolve(spec);
        let facilities: Vec<Facility> = self
            .fallback
            .documents()
            .iter()
            .map(|doc| self.mapper.to_canonical_doc(doc))
            .filter(|facility| self.engine.matches_resolved(facility, &resolved))
            .collect();

        FacilityPage {
            total: facilities.len(),
            facilities,
            source: Source::Fallback { reason },
        }
    }

    /// Reads every page of a collection using cursor paging.
    fn fetch_all(
        &self,
        store: &(dyn DocumentStore + Send + Sync),
        collection: Collection,
        base_queries: &[QueryConstraint],
    ) -> Result<DocumentList, BackendError> {
        let page_size = self.config.effective_page_size();
        let mut documents: Vec<Document> = Vec::new();
        let mut total: Option<usize> = None;
        let mut cursor: Option<String> = None;

        loop {
            let mut queries = base_queries.to_vec();
            queries.push(QueryConstraint::Limit { limit: page_size });
            if let Some(id) = &cursor {
                queries.push(QueryConstraint::CursorAfter { id: id.clone() });
            }

            let page = store.list_documents(collection, &queries)?;
            let expected = *total.get_or_insert(page.total);
            if page.documents.is_empty() {
                break;
            }

            let fetched = page.documents.len();
            let last_id = page.documents.last().and_then(|doc| fields::ID.text(doc));
            documents.extend(page.documents);
            debug!(
                collection = collection.as_str(),
                fetched,
                read = documents.len(),
                expected,
                "fetched page"
            );

            if fetched < page_size || documents.len() >= expected {
                break;
            }
            match last_id {
                Some(id) => cursor = Some(id),
                None => break,
            }
        }

        Ok(DocumentList {
            total: total.unwrap_or(documents.len()),
            documents,
        })
    }

    pub fn get_facility(&self, facility_id: &str) -> Result<Option<Facility>, FacilityError> {
        if facility_id.trim().is_empty() {
            return Ok(None);
        }

        let Some(store) = self.live_store() else {
            return Ok(self
                .fallback
                .documents()
                .iter()
                .find(|doc| fields::ID.text(doc).as_deref() == Some(facility_id))
                .map(|doc| self.mapper.to_canonical_doc(doc)));
        };

        let document = store.get_document(Collection::Facilities, facility_id)?;
        Ok(document.map(|doc| self.mapper.to_canonical_doc(&doc)))
    }

    pub fn list_governorates(&self) -> Result<GovernorateList, FacilityError> {
        let fallback = |reason: Option<String>| GovernorateList {
            governorates: self
                .fallback
                .governorates()
                .iter()
                .filter_map(|doc| self.mapper.to_governorate(doc))
                .collect(),
            source: Source::Fallback { reason },
        };

        let Some(store) = self.live_store() else {
            return Ok(fallback(None));
        };

        match self.fetch_all(
            store.as_ref(),
            Collection::Governorates,
            &[QueryConstraint::order_asc("name")],
        ) {
            Ok(list) => Ok(GovernorateList {
                governorates: list
                    .documents
                    .into_iter()
                    .filter_map(|doc| self.mapper.to_governorate(&Value::Object(doc)))
                    .collect(),
                source: Source::Live,
            }),
            Err(err) if self.config.fallback_enabled => {
                warn!(error = %err, "falling back to local governorates");
                Ok(fallback(Some(err.to_string())))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Validates, persists and logs a create or update.
    ///
    /// Write failures are returned as errors; there is no local fallback for persistence.
    pub fn save_facility(
        &self,
        form_payload: &Value,
        context: &SaveContext,
    ) -> Result<Facility, FacilityError> {
        let store = self
            .live_store()
            .ok_or(FacilityError::NotConfigured("facility backend"))?;

        let form: FacilityForm = serde_json::from_value(form_payload.clone())
            .map_err(|err| FacilityError::Parse(err.to_string()))?;
        validate_form(&form)?;

        let now = Value::String(Utc::now().to_rfc3339());
        let actor = context
            .user_id
            .clone()
            .or_else(|| {
                form_payload
                    .get(fields::LAST_EDITED_BY.field)
                    .and_then(value_as_text)
                    .filter(|id| !id.is_empty())
            })
            .unwrap_or_else(|| ANONYMOUS.to_string());

        let mut payload = self.mapper.to_backend_form(&form);
        payload.insert(
            fields::LAST_EDITED_BY.field.to_string(),
            Value::String(actor.clone()),
        );
        payload.insert(fields::UPDATED_AT.field.to_string(), now.clone());
        if context.facility_id.is_none() {
            payload.insert(fields::CREATED_AT.field.to_string(), now);
            payload.insert(
                fields::CREATED_BY.field.to_string(),
                Value::String(
                    context
                        .user_id
                        .clone()
                        .unwrap_or_else(|| ANONYMOUS.to_string()),
                ),
            );
        }

        if let Some(validator) = &self.validator {
            validator.validate(context.facility_id.as_deref(), &payload)?;
        }

        let (document, action) = match &context.facility_id {
            Some(id) => {
                if let Some(existing) = store.get_document(Collection::Facilities, id)? {
                    self.mapper.retire_aliases(&existing, &mut payload);
                }
                (
                    store.update_document(Collection::Facilities, id, payload)?,
                    EditAction::Updated,
                )
            }
            None => (
                store.create_document(Collection::Facilities, payload)?,
                EditAction::Created,
            ),
        };

        let facility = self.mapper.to_canonical_doc(&document);
        info!(facility_id = %facility.id, ?action, "facility persisted");

        self.record_edit(EditLogEntry {
            id: None,
            facility_id: facility.id.clone(),
            user_id: Some(actor),
            user_name: context.user_name.clone(),
            action,
            changes: form_payload.clone(),
            status: EditStatus::Approved,
            timestamp: Utc::now(),
            admin_notes: None,
        });

        Ok(facility)
    }

    /// The facility is already persisted, so a failed append is only reported.
    fn record_edit(&self, entry: EditLogEntry) {
        let Some(edit_log) = &self.edit_log else {
            return;
        };
        if let Err(err) = edit_log.append(&entry) {
            warn!(facility_id = %entry.facility_id, error = %err, "unable to write edit log entry");
        }
    }

    /// Most recent edits first, optionally restricted to one review status.
    pub fn list_edits(
        &self,
        status: Option<EditStatus>,
        limit: usize,
    ) -> Result<EditPage, FacilityError> {
        let fallback = |reason: Option<String>| EditPage {
            entries: self
                .fallback
                .seed_edits()
                .into_iter()
                .filter(|entry| status.map_or(true, |wanted| entry.status == wanted))
                .take(limit)
                .collect(),
            source: Source::Fallback { reason },
        };

        let Some(store) = self.live_store() else {
            return Ok(fallback(None));
        };

        let mut queries = vec![
            QueryConstraint::order_desc("$createdAt"),
            QueryConstraint::Limit { limit },
        ];
        if let Some(status) = status {
            queries.push(QueryConstraint::equal("status", vec![status.to_string()]));
        }

        match store.list_documents(Collection::Edits, &queries) {
            Ok(list) => Ok(EditPage {
                entries: list.documents.into_iter().filter_map(parse_edit).collect(),
                source: Source::Live,
            }),
            Err(err) if self.config.fallback_enabled => {
                warn!(error = %err, "falling back to seed activity");
                Ok(fallback(Some(err.to_string())))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a review decision to a pending edit.
    pub fn review_edit(
        &self,
        edit_id: &str,
        decision: EditStatus,
        admin_notes: Option<&str>,
    ) -> Result<EditLogEntry, FacilityError> {
        let store = self
            .live_store()
            .ok_or(FacilityError::NotConfigured("edits collection"))?;

        let current = store
            .get_document(Collection::Edits, edit_id)?
            .and_then(parse_edit)
            .ok_or_else(|| FacilityError::NotFound(format!("edit {edit_id}")))?;

        if !current.status.can_transition_to(decision) {
            return Err(FacilityError::InvalidTransition {
                from: current.status,
                to: decision,
            });
        }

        let mut update = Document::new();
        update.insert("status".to_string(), Value::String(decision.to_string()));
        update.insert(
            "adminNotes".to_string(),
            Value::String(admin_notes.unwrap_or_default().to_string()),
        );

        let stored = store.update_document(Collection::Edits, edit_id, update)?;
        info!(edit_id, status = %decision, "edit reviewed");
        parse_edit(stored).ok_or_else(|| FacilityError::Parse(format!("edit {edit_id}")))
    }

    pub fn build_stats(&self, facilities: &[Facility]) -> Stats {
        self.aggregator.build_stats(facilities)
    }

    pub fn reference_options(&self, facilities: &[Facility]) -> ReferenceOptions {
        derive_reference_options(facilities, &self.config.presets, &self.config.tables.labels)
    }
}

fn parse_edit(doc: Document) -> Option<EditLogEntry> {
    match serde_json::from_value(Value::Object(doc)) {
        Ok(entry) => Some(entry),
        Err(err) => {
            debug!(error = %err, "unreadable edit log document skipped");
            None
        }
    }
}
