//! Form validation and the pre-write validation rules.

use std::sync::Arc;

use facility_core::{latitude_in_range, longitude_in_range, FacilityError, ValidationReport};
use tracing::debug;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::fields::{self, parse_number, Document};
use crate::mapper::FacilityForm;
use crate::query::QueryConstraint;
use crate::store::{Collection, DocumentStore, FacilityValidator};

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("is required".into());
        Err(err)
    } else {
        Ok(())
    }
}

fn backend_field(field: &str) -> &str {
    match field {
        "facility_name" => fields::FACILITY_NAME.field,
        "governorate" => fields::GOVERNORATE.field,
        other => other,
    }
}

fn report_from(errors: &ValidationErrors) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (field, field_errors) in errors.field_errors() {
        for err in field_errors {
            let message = match (&err.message, err.code.as_ref()) {
                (Some(message), _) => message.to_string(),
                (None, "length") => "must be at most 255 characters".to_string(),
                (None, code) => code.to_string(),
            };
            report.add(backend_field(field), message);
        }
    }
    report
}

/// Checks a form before it is mapped and sent anywhere.
pub fn validate_form(form: &FacilityForm) -> Result<(), FacilityError> {
    let mut report = match form.validate() {
        Ok(()) => ValidationReport::default(),
        Err(errors) => report_from(&errors),
    };

    match (form.longitude, form.latitude) {
        (Some(longitude), Some(latitude)) => {
            if !longitude_in_range(longitude) {
                report.add(
                    fields::LONGITUDE.field,
                    "must be between -180 and 180",
                );
            }
            if !latitude_in_range(latitude) {
                report.add(fields::LATITUDE.field, "must be between -90 and 90");
            }
        }
        (Some(_), None) => report.add(fields::LATITUDE.field, "is required with longitude"),
        (None, Some(_)) => report.add(fields::LONGITUDE.field, "is required with latitude"),
        (None, None) => {}
    }

    report.into_result()
}

/// Validation-webhook rules evaluated against a document store.
pub struct StoreValidator {
    store: Arc<dyn DocumentStore + Send + Sync>,
}

impl StoreValidator {
    pub fn new(store: Arc<dyn DocumentStore + Send + Sync>) -> Self {
        Self { store }
    }
}

impl FacilityValidator for StoreValidator {
    fn validate(&self, facility_id: Option<&str>, payload: &Document) -> Result<(), FacilityError> {
        let coordinate =
            |aliases: &fields::FieldAliases| aliases.resolve(payload).and_then(parse_number);

        if let Some(longitude) = coordinate(&fields::LONGITUDE) {
            if !longitude_in_range(longitude) {
                return Err(FacilityError::Rejected(
                    "Invalid longitude; must be between -180 and 180".to_string(),
                ));
            }
        }
        if let Some(latitude) = coordinate(&fields::LATITUDE) {
            if !latitude_in_range(latitude) {
                return Err(FacilityError::Rejected(
                    "Invalid latitude; must be between -90 and 90".to_string(),
                ));
            }
        }

        let name = fields::FACILITY_NAME.text(payload).unwrap_or_default();
        if name.is_empty() {
            return Err(FacilityError::Rejected(
                "Facility name cannot be empty".to_string(),
            ));
        }

        let governorate = fields::GOVERNORATE.text(payload).unwrap_or_default();
        let existing = self.store.list_documents(
            Collection::Facilities,
            &[
                QueryConstraint::equal(fields::FACILITY_NAME.field, vec![name.clone()]),
                QueryConstraint::equal(fields::GOVERNORATE.field, vec![governorate.clone()]),
            ],
        )?;

        let duplicate = existing
            .documents
            .iter()
            .filter_map(|doc| fields::ID.text(doc))
            .any(|id| Some(id.as_str()) != facility_id);
        if duplicate {
            return Err(FacilityError::Rejected(format!(
                "Facility \"{name}\" already exists in {governorate}"
            )));
        }

        debug!(facility_name = %name, "validation passed");
        Ok(())
    }
}
