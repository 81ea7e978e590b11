//! Interfaces to the hosted backend, plus an in-memory document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use facility_core::{BackendError, EditLogEntry, FacilityError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{value_as_text, Document};
use crate::query::{run_queries, QueryConstraint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Facilities,
    Governorates,
    Edits,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Facilities => "facilities",
            Collection::Governorates => "governorates",
            Collection::Edits => "edits",
        }
    }
}

/// One page of a listing; `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentList {
    pub total: usize,
    pub documents: Vec<Document>,
}

/// Document-level read/write access to the backend collections.
pub trait DocumentStore {
    fn list_documents(
        &self,
        collection: Collection,
        queries: &[QueryConstraint],
    ) -> Result<DocumentList, BackendError>;

    fn get_document(&self, collection: Collection, id: &str)
        -> Result<Option<Document>, BackendError>;

    fn create_document(&self, collection: Collection, data: Document)
        -> Result<Document, BackendError>;

    fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Document,
    ) -> Result<Document, BackendError>;
}

/// Server-side check run before a facility write. A rejection blocks the write.
pub trait FacilityValidator {
    fn validate(&self, facility_id: Option<&str>, payload: &Document) -> Result<(), FacilityError>;
}

/// Append-only audit trail of facility mutations.
pub trait EditLog {
    fn append(&self, entry: &EditLogEntry) -> Result<EditLogEntry, BackendError>;
}

/// Every document store can hold the edit log in its edits collection.
impl<T: DocumentStore + ?Sized> EditLog for T {
    fn append(&self, entry: &EditLogEntry) -> Result<EditLogEntry, BackendError> {
        let data = match serde_json::to_value(entry) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Document::new(),
            Err(err) => return Err(BackendError::Unavailable(err.to_string())),
        };
        let stored = self.create_document(Collection::Edits, data)?;
        serde_json::from_value(Value::Object(stored)).map_err(|err| BackendError::Request {
            code: 500,
            message: err.to_string(),
        })
    }
}

/// Thread-safe in-memory store with backend-like ids and system timestamps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
    reads_down: AtomicBool,
    writes_down: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection verbatim, keeping any ids the documents carry.
    pub fn with_documents(self, collection: Collection, documents: Vec<Document>) -> Self {
        if let Ok(mut guard) = self.collections.write() {
            guard.entry(collection).or_default().extend(documents);
        }
        self
    }

    /// Simulates the backend refusing reads.
    pub fn set_reads_unavailable(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    /// Simulates the backend refusing writes.
    pub fn set_writes_unavailable(&self, down: bool) {
        self.writes_down.store(down, Ordering::SeqCst);
    }

    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.collections
            .read()
            .map(|guard| guard.get(&collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_reads(&self) -> Result<(), BackendError> {
        if self.reads_down.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("reads disabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_writes(&self) -> Result<(), BackendError> {
        if self.writes_down.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

fn poisoned() -> BackendError {
    BackendError::Unavailable("store lock poisoned".to_string())
}

fn document_id(doc: &Document) -> Option<String> {
    doc.get("$id").and_then(value_as_text)
}

impl DocumentStore for MemoryStore {
    fn list_documents(
        &self,
        collection: Collection,
        queries: &[QueryConstraint],
    ) -> Result<DocumentList, BackendError> {
        self.check_reads()?;
        let guard = self.collections.read().map_err(|_| poisoned())?;
        let documents = guard.get(&collection).map(Vec::as_slice).unwrap_or_default();
        let outcome = run_queries(documents, queries);
        Ok(DocumentList {
            total: outcome.total,
            documents: outcome.documents,
        })
    }

    fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, BackendError> {
        self.check_reads()?;
        let guard = self.collections.read().map_err(|_| poisoned())?;
        Ok(guard.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|doc| document_id(doc).as_deref() == Some(id))
                .cloned()
        }))
    }

    fn create_document(
        &self,
        collection: Collection,
        mut data: Document,
    ) -> Result<Document, BackendError> {
        self.check_writes()?;
        let now = Value::String(Utc::now().to_rfc3339());
        if document_id(&data).is_none() {
            data.insert(
                "$id".to_string(),
                Value::String(uuid::Uuid::new_v4().simple().to_string()),
            );
        }
        data.insert("$createdAt".to_string(), now.clone());
        data.insert("$updatedAt".to_string(), now);

        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        guard.entry(collection).or_default().push(data.clone());
        Ok(data)
    }

    fn update_document(
        &self,
        collection: Collection,
        id: &str,
        data: Document,
    ) -> Result<Document, BackendError> {
        self.check_writes()?;
        let mut guard = self.collections.write().map_err(|_| poisoned())?;
        let existing = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc).as_deref() == Some(id)))
            .ok_or_else(|| BackendError::Request {
                code: 404,
                message: format!("document {id} not found in {}", collection.as_str()),
            })?;

        for (key, value) in data {
            if key != "$id" {
                existing.insert(key, value);
            }
        }
        existing.insert(
            "$updatedAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(existing.clone())
    }
}
