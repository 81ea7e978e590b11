//! Conversion between loosely-typed backend documents and the canonical model.
//!
//! This is the only place labels and statuses are canonicalized; callers that
//! hold a [`Facility`] never need to normalize it again.

use facility_core::{
    Coordinates, Facility, Geometry, Governorate, LocalizedName, NormalizationTables, UserRef,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use validator::Validate;

use crate::fields::{self, parse_number, Document, FieldAliases};
use crate::validation::not_blank;

/// Form payload submitted by editors, in backend field names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct FacilityForm {
    #[validate(length(max = 255), custom = "not_blank")]
    pub facility_name: String,
    pub establishment_name: String,
    #[validate(custom = "not_blank")]
    pub governorate: String,
    pub facility_status: String,
    pub facility_type_label: String,
    pub facility_owner: String,
    pub facility_affiliation: String,
    #[serde(deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_number))
}

impl From<&Facility> for FacilityForm {
    fn from(facility: &Facility) -> Self {
        Self {
            facility_name: facility.facility_name.clone(),
            establishment_name: facility.establishment_name.clone().unwrap_or_default(),
            governorate: facility.governorate.clone(),
            facility_status: facility.status_label.clone(),
            facility_type_label: facility.facility_type_label.clone(),
            facility_owner: facility.facility_owner.clone(),
            facility_affiliation: facility.facility_affiliation.clone(),
            longitude: facility.longitude(),
            latitude: facility.latitude(),
        }
    }
}

const WRITTEN_FIELDS: [FieldAliases; 10] = [
    fields::FACILITY_NAME,
    fields::ESTABLISHMENT_NAME,
    fields::GOVERNORATE,
    fields::STATUS,
    fields::FACILITY_TYPE,
    fields::OWNER,
    fields::AFFILIATION,
    fields::LONGITUDE,
    fields::LATITUDE,
    fields::LOCATION,
];

#[derive(Debug, Clone, Default)]
pub struct FacilityMapper {
    tables: NormalizationTables,
}

impl FacilityMapper {
    pub fn new(tables: NormalizationTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &NormalizationTables {
        &self.tables
    }

    /// Maps any JSON value; non-objects become an empty facility.
    pub fn to_canonical(&self, document: &Value) -> Facility {
        match document.as_object() {
            Some(doc) => self.to_canonical_doc(doc),
            None => self.to_canonical_doc(&Map::new()),
        }
    }

    pub fn to_canonical_doc(&self, doc: &Document) -> Facility {
        let labels = &self.tables.labels;
        let status_label = fields::STATUS.text(doc).unwrap_or_default();
        let facility_status = self.tables.statuses.normalize(&status_label);

        Facility {
            id: fields::ID.text(doc).unwrap_or_default(),
            facility_name: fields::FACILITY_NAME.text(doc).unwrap_or_default(),
            establishment_name: fields::ESTABLISHMENT_NAME.non_empty_text(doc),
            governorate: fields::GOVERNORATE.text(doc).unwrap_or_default(),
            facility_status,
            status_label,
            facility_type_label: canonical_field(doc, &fields::FACILITY_TYPE, |raw| {
                labels.canonicalize(raw)
            }),
            facility_owner: canonical_field(doc, &fields::OWNER, |raw| labels.canonicalize(raw)),
            facility_affiliation: canonical_field(doc, &fields::AFFILIATION, |raw| {
                labels.canonicalize(raw)
            }),
            coordinates: resolve_coordinates(doc),
            created_at: fields::extract_datetime(doc, &fields::CREATED_AT),
            updated_at: fields::extract_datetime(doc, &fields::UPDATED_AT),
            created_by: fields::CREATED_BY.non_empty_text(doc).map(UserRef),
            last_edited_by: fields::LAST_EDITED_BY.non_empty_text(doc).map(UserRef),
        }
    }

    /// Builds the backend-shaped document for a form payload.
    ///
    /// Labels are stored canonicalized; statuses keep the vocabulary's own
    /// spelling so legacy consumers of the collection still recognize them.
    /// Every field is written, blank ones as null, so an update clears what
    /// the form left empty.
    pub fn to_backend_form(&self, form: &FacilityForm) -> Document {
        let labels = &self.tables.labels;
        let mut doc = Document::new();

        doc.insert(
            fields::FACILITY_NAME.field.to_string(),
            Value::String(form.facility_name.trim().to_string()),
        );
        insert_or_null(
            &mut doc,
            fields::ESTABLISHMENT_NAME.field,
            form.establishment_name.trim().to_string(),
        );
        doc.insert(
            fields::GOVERNORATE.field.to_string(),
            Value::String(form.governorate.trim().to_string()),
        );
        insert_or_null(
            &mut doc,
            fields::STATUS.field,
            self.tables
                .statuses
                .backend_spelling(&form.facility_status)
                .unwrap_or_default(),
        );
        insert_or_null(
            &mut doc,
            fields::FACILITY_TYPE.field,
            labels.canonicalize(&form.facility_type_label),
        );
        insert_or_null(
            &mut doc,
            fields::OWNER.field,
            labels.canonicalize(&form.facility_owner),
        );
        insert_or_null(
            &mut doc,
            fields::AFFILIATION.field,
            labels.canonicalize(&form.facility_affiliation),
        );

        doc.insert(fields::LONGITUDE.field.to_string(), number_or_null(form.longitude));
        doc.insert(fields::LATITUDE.field.to_string(), number_or_null(form.latitude));
        let location = match (form.longitude, form.latitude) {
            (Some(longitude), Some(latitude)) => serde_json::to_value(Geometry::Point {
                coordinates: [longitude, latitude],
            })
            .unwrap_or(Value::Null),
            _ => Value::Null,
        };
        doc.insert(fields::LOCATION.field.to_string(), location);

        doc
    }

    /// Nulls legacy spellings still present on `existing` for every field the
    /// backend form writes, so they cannot shadow a cleared value on read.
    pub fn retire_aliases(&self, existing: &Document, payload: &mut Document) {
        for aliases in WRITTEN_FIELDS {
            for key in aliases.keys.iter().filter(|key| **key != aliases.field) {
                if existing.get(*key).is_some_and(|value| !value.is_null()) {
                    payload.insert((*key).to_string(), Value::Null);
                }
            }
        }
    }

    /// Backend form of an already canonical facility.
    pub fn facility_to_backend(&self, facility: &Facility) -> Document {
        let mut doc = self.to_backend_form(&FacilityForm::from(facility));
        if !facility.id.is_empty() {
            doc.insert(fields::ID.field.to_string(), Value::String(facility.id.clone()));
        }
        doc
    }

    /// Governorate with a usable name; records without any name are skipped.
    pub fn to_governorate(&self, document: &Value) -> Option<Governorate> {
        let doc = document.as_object()?;
        let id = fields::ID.text(doc).unwrap_or_default();
        let Some(name) = LocalizedName::new(
            fields::GOVERNORATE_NAME.text(doc),
            fields::GOVERNORATE_NAME_ALT.text(doc),
        ) else {
            debug!(governorate_id = %id, "governorate without a name skipped");
            return None;
        };

        let boundary = fields::GOVERNORATE_BOUNDARY
            .resolve(doc)
            .and_then(parse_geometry);

        Some(Governorate { id, name, boundary })
    }
}

fn canonical_field(
    doc: &Document,
    aliases: &FieldAliases,
    canonicalize: impl Fn(&str) -> String,
) -> String {
    aliases
        .text(doc)
        .map(|raw| canonicalize(&raw))
        .unwrap_or_default()
}

fn insert_or_null(doc: &mut Document, field: &str, value: String) {
    let value = if value.is_empty() {
        Value::Null
    } else {
        Value::String(value)
    };
    doc.insert(field.to_string(), value);
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn resolve_coordinates(doc: &Document) -> Option<Coordinates> {
    let from_fields = match (
        fields::LONGITUDE.resolve(doc).and_then(parse_number),
        fields::LATITUDE.resolve(doc).and_then(parse_number),
    ) {
        (Some(longitude), Some(latitude)) => Some((longitude, latitude)),
        _ => None,
    };

    let (longitude, latitude) = from_fields.or_else(|| {
        fields::LOCATION
            .resolve(doc)
            .and_then(embedded_point)
    })?;

    let coordinates = Coordinates::new(longitude, latitude);
    if coordinates.is_none() {
        debug!(longitude, latitude, "coordinates out of range dropped");
    }
    coordinates
}

/// Reads `[lon, lat, ..]` out of a point geometry object or its serialized form.
fn embedded_point(value: &Value) -> Option<(f64, f64)> {
    let parsed;
    let geometry = match value {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).ok()?;
            &parsed
        }
        other => other,
    };

    if let Some(kind) = geometry.get("type").and_then(Value::as_str) {
        if kind != "Point" {
            return None;
        }
    }

    let coordinates = geometry.get("coordinates")?.as_array()?;
    let longitude = coordinates.first().and_then(parse_number)?;
    let latitude = coordinates.get(1).and_then(parse_number)?;
    Some((longitude, latitude))
}

/// Parses an object or serialized geometry. Unparseable input is treated as absent.
pub fn parse_geometry(value: &Value) -> Option<Geometry> {
    let result = match value {
        Value::String(text) if text.trim().is_empty() => return None,
        Value::String(text) => serde_json::from_str::<Geometry>(text),
        Value::Object(_) => serde_json::from_value::<Geometry>(value.clone()),
        _ => return None,
    };

    match result {
        Ok(geometry) => Some(geometry),
        Err(err) => {
            debug!(error = %err, "unparseable geometry ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_form_writes_nulls() {
        let form = FacilityForm {
            facility_name: "Zubair Clinic".to_string(),
            governorate: "Basra".to_string(),
            ..FacilityForm::default()
        };
        let doc = FacilityMapper::default().to_backend_form(&form);

        for field in ["facilityStatus", "facilityAffiliation", "longitude", "location"] {
            assert_eq!(doc.get(field), Some(&Value::Null), "{field} not cleared");
        }
    }

    #[test]
    fn legacy_keys_are_nulled_on_update() {
        let existing = json!({ "X": "44.3", "FOLLOWS": "karkh", "geometry": "{}", "name": "Old" });
        let existing = existing.as_object().cloned().unwrap_or_default();
        let mut payload = Document::new();

        FacilityMapper::default().retire_aliases(&existing, &mut payload);

        for key in ["X", "FOLLOWS", "geometry", "name"] {
            assert_eq!(payload.get(key), Some(&Value::Null), "{key} not retired");
        }
        assert!(!payload.contains_key("facilityName"));
    }
}
