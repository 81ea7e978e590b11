//! Historical field spellings and lenient value readers for backend documents.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Loosely-typed backend record.
pub type Document = Map<String, Value>;

/// Ordered source keys for one logical field. The first non-null key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    /// Key written back to the backend.
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

impl FieldAliases {
    pub const fn new(field: &'static str, keys: &'static [&'static str]) -> Self {
        Self { field, keys }
    }

    pub fn resolve<'a>(&self, doc: &'a Document) -> Option<&'a Value> {
        self.keys
            .iter()
            .filter_map(|key| doc.get(*key))
            .find(|value| !value.is_null())
    }

    /// Resolved value as trimmed text; numbers are rendered, other shapes are absent.
    pub fn text(&self, doc: &Document) -> Option<String> {
        self.resolve(doc).and_then(value_as_text)
    }

    pub fn non_empty_text(&self, doc: &Document) -> Option<String> {
        self.text(doc).filter(|text| !text.is_empty())
    }
}

pub const ID: FieldAliases = FieldAliases::new("$id", &["$id", "id", "_id"]);
pub const FACILITY_NAME: FieldAliases =
    FieldAliases::new("facilityName", &["facilityName", "name", "NAME", "Name"]);
pub const ESTABLISHMENT_NAME: FieldAliases = FieldAliases::new(
    "establishmentName",
    &["establishmentName", "establishment", "ESTABLISHMENT"],
);
pub const GOVERNORATE: FieldAliases = FieldAliases::new(
    "governorate",
    &["governorate", "Governorate", "GOVERNORATE", "GOV"],
);
pub const STATUS: FieldAliases =
    FieldAliases::new("facilityStatus", &["facilityStatus", "STATUS", "status", "Status"]);
pub const FACILITY_TYPE: FieldAliases = FieldAliases::new(
    "facilityTypeLabel",
    &["facilityTypeLabel", "type", "TYPE", "Type", "facilityType"],
);
pub const OWNER: FieldAliases =
    FieldAliases::new("facilityOwner", &["facilityOwner", "Owner", "owner", "OWNER"]);
pub const AFFILIATION: FieldAliases = FieldAliases::new(
    "facilityAffiliation",
    &["facilityAffiliation", "FOLLOWS", "follows", "Follows", "affiliation"],
);
pub const LONGITUDE: FieldAliases =
    FieldAliases::new("longitude", &["longitude", "X", "x", "lng", "lon"]);
pub const LATITUDE: FieldAliases = FieldAliases::new("latitude", &["latitude", "Y", "y", "lat"]);
pub const LOCATION: FieldAliases =
    FieldAliases::new("location", &["location", "geometry", "geom"]);
pub const CREATED_AT: FieldAliases = FieldAliases::new("createdAt", &["createdAt", "$createdAt"]);
pub const UPDATED_AT: FieldAliases = FieldAliases::new("updatedAt", &["updatedAt", "$updatedAt"]);
pub const CREATED_BY: FieldAliases = FieldAliases::new("createdBy", &["createdBy"]);
pub const LAST_EDITED_BY: FieldAliases = FieldAliases::new("lastEditedBy", &["lastEditedBy"]);

pub const GOVERNORATE_NAME: FieldAliases =
    FieldAliases::new("name", &["name", "nameEn", "name_en", "NAME"]);
pub const GOVERNORATE_NAME_ALT: FieldAliases =
    FieldAliases::new("nameAr", &["nameAr", "name_ar", "arabicName"]);
pub const GOVERNORATE_BOUNDARY: FieldAliases =
    FieldAliases::new("boundary", &["boundary", "geometry", "geojson", "shape"]);

pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Parses a number or numeric string. Non-finite or unparseable values are absent.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// First alias that parses as a timestamp.
pub fn extract_datetime(doc: &Document, aliases: &FieldAliases) -> Option<DateTime<Utc>> {
    aliases
        .keys
        .iter()
        .filter_map(|key| doc.get(*key))
        .filter_map(Value::as_str)
        .find_map(parse_datetime)
}

pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn first_defined_alias_wins() {
        let record = doc(json!({ "name": "Legacy", "facilityName": "Current" }));
        assert_eq!(FACILITY_NAME.text(&record).as_deref(), Some("Current"));

        let record = doc(json!({ "facilityName": null, "name": " Legacy " }));
        assert_eq!(FACILITY_NAME.text(&record).as_deref(), Some("Legacy"));
    }

    #[test]
    fn numbers_parse_from_strings() {
        assert_eq!(parse_number(&json!("45.5")), Some(45.5));
        assert_eq!(parse_number(&json!(33)), Some(33.0));
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        assert!(parse_datetime("2024-03-05T10:00:00.000+00:00").is_some());
        assert!(parse_datetime("2024-03-05T10:00:00.000").is_some());
        assert!(parse_datetime("2024-03-05").is_some());
        assert!(parse_datetime("March 5th").is_none());
    }
}
