//! Distinct values for populating filter and form controls.

use std::collections::{BTreeMap, BTreeSet};

use facility_core::{canonical_key, Facility, FacilityStatus, LabelRules, ReferencePresets};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceOptions {
    pub facility_types: Vec<String>,
    pub owners: Vec<String>,
    pub affiliations: Vec<String>,
    pub statuses: Vec<FacilityStatus>,
}

/// Presets come first so their spelling wins when the data repeats them in another case.
pub fn derive_reference_options(
    facilities: &[Facility],
    presets: &ReferencePresets,
    labels: &LabelRules,
) -> ReferenceOptions {
    ReferenceOptions {
        facility_types: distinct(
            labels,
            &presets.facility_types,
            facilities.iter().map(|f| f.facility_type_label.as_str()),
        ),
        owners: distinct(
            labels,
            &presets.owners,
            facilities.iter().map(|f| f.facility_owner.as_str()),
        ),
        affiliations: distinct(
            labels,
            &presets.affiliations,
            facilities.iter().map(|f| f.facility_affiliation.as_str()),
        ),
        statuses: facilities
            .iter()
            .map(|f| f.facility_status)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}

fn distinct<'a>(
    labels: &LabelRules,
    presets: &[String],
    values: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let candidates = presets
        .iter()
        .map(|preset| labels.canonicalize(preset))
        .chain(values.map(str::to_string));

    for value in candidates {
        if value.trim().is_empty() {
            continue;
        }
        seen.entry(canonical_key(&value)).or_insert(value);
    }

    seen.into_values().collect()
}
