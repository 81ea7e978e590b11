use std::fs;

use facility_core::{Facility, FacilityStatus, OwnerCategory, ReferencePresets, RegistryConfig};
use facility_registry::{
    build_stats, derive_reference_options, normalize_documents_str, parse_geometry,
    FacilityMapper, MonthCount,
};
use serde_json::json;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn legacy_facilities() -> Vec<Facility> {
    let documents = fs::read_to_string(fixture_path("legacy_facilities.json"))
        .expect("legacy fixture should be readable");
    normalize_documents_str(&documents, &RegistryConfig::default())
        .expect("legacy fixture should normalize")
}

fn by_id<'a>(facilities: &'a [Facility], id: &str) -> &'a Facility {
    facilities
        .iter()
        .find(|facility| facility.id == id)
        .expect("facility present in fixture")
}

#[test]
fn security_variant_document_maps_to_canonical_record() {
    let mapper = FacilityMapper::default();
    let facility = mapper.to_canonical(&json!({
        "$id": "x1",
        "facilityName": "Al Noor",
        "STATUS": "تعمل ولكن لا يمكن الوصول اليه بسبب الوضع الأمني",
        "facilityTypeLabel": "hospital",
        "facilityOwner": "ministry of health",
        "longitude": "45.5",
        "latitude": 33.2
    }));

    assert_eq!(facility.facility_status, FacilityStatus::Operational);
    assert_eq!(facility.facility_type_label, "Hospital");
    assert_eq!(facility.facility_owner, "Ministry Of Health");
    assert_eq!(facility.longitude(), Some(45.5));
    assert_eq!(facility.latitude(), Some(33.2));
    assert_eq!(
        facility.status_label,
        "تعمل ولكن لا يمكن الوصول اليه بسبب الوضع الأمني"
    );
}

#[test]
fn legacy_spelled_security_variant_matches_plain_operational() {
    let mapper = FacilityMapper::default();
    let facility = mapper.to_canonical(&json!({
        "STATUS": "تعمل ولكن لا يمكن الوصول اليه بسبب الوضع الأمني",
        "type": "hospital",
        "Owner": "ministry of health",
        "X": "45.5",
        "Y": "33.2"
    }));
    let plain = mapper.to_canonical(&json!({ "STATUS": "تعمل" }));

    assert_eq!(facility.facility_status, plain.facility_status);
    assert_eq!(facility.facility_status, FacilityStatus::Operational);
    assert_eq!(facility.facility_type_label, "Hospital");
    assert_eq!(facility.facility_owner, "Ministry Of Health");
    assert_eq!(facility.longitude(), Some(45.5));
    assert_eq!(facility.latitude(), Some(33.2));
}

#[test]
fn legacy_aliases_resolve_across_fixture() {
    let facilities = legacy_facilities();
    assert_eq!(facilities.len(), 7);

    let karkh = by_id(&facilities, "f1");
    assert_eq!(karkh.facility_name, "Al Noor Hospital");
    assert_eq!(karkh.governorate, "Baghdad");
    assert_eq!(karkh.facility_affiliation, "Karkh Directorate");
    assert_eq!(karkh.longitude(), Some(44.36));
    assert!(karkh.created_at.is_some());

    let mosul = by_id(&facilities, "f2");
    assert_eq!(mosul.establishment_name.as_deref(), Some("Old City Sector"));
    assert_eq!(mosul.facility_owner, "INGO");
    assert_eq!(mosul.longitude(), Some(43.13));
    assert_eq!(mosul.latitude(), Some(36.34));

    assert_eq!(
        by_id(&facilities, "f3").facility_status,
        FacilityStatus::PartiallyOperational
    );
    assert_eq!(by_id(&facilities, "f6").facility_type_label, "PHC");
    assert_eq!(by_id(&facilities, "f6").facility_owner, "MOH");
}

#[test]
fn unparseable_fields_fall_back_to_geometry() {
    let facilities = legacy_facilities();
    let fallujah = by_id(&facilities, "f4");
    assert_eq!(fallujah.facility_status, FacilityStatus::NotOperational);
    assert_eq!(fallujah.longitude(), Some(43.77));
    assert_eq!(fallujah.latitude(), Some(33.35));
}

#[test]
fn out_of_range_coordinates_are_absent() {
    let facilities = legacy_facilities();
    let erbil = by_id(&facilities, "f5");
    assert_eq!(erbil.coordinates, None);
    assert_eq!(erbil.facility_status, FacilityStatus::Unknown);
    assert_eq!(erbil.status_label, "Under renovation");
}

#[test]
fn missing_status_is_unknown() {
    let facilities = legacy_facilities();
    let sadr = by_id(&facilities, "f7");
    assert_eq!(sadr.facility_status, FacilityStatus::Unknown);
    assert_eq!(sadr.status_label, "");
    assert_eq!(sadr.created_at, None);
}

#[test]
fn backend_form_round_trips_to_same_record() {
    let mapper = FacilityMapper::default();
    for facility in legacy_facilities() {
        let stored = mapper.facility_to_backend(&facility);
        let again = mapper.to_canonical_doc(&stored);

        assert_eq!(again.id, facility.id);
        assert_eq!(again.facility_name, facility.facility_name);
        assert_eq!(again.governorate, facility.governorate);
        assert_eq!(again.facility_status, facility.facility_status);
        assert_eq!(again.facility_type_label, facility.facility_type_label);
        assert_eq!(again.facility_owner, facility.facility_owner);
        assert_eq!(again.facility_affiliation, facility.facility_affiliation);
        assert_eq!(again.coordinates, facility.coordinates);
    }
}

#[test]
fn governorate_boundary_parse_failure_is_absent() {
    let mapper = FacilityMapper::default();

    let broken = mapper
        .to_governorate(&json!({ "$id": "g1", "name": "Basra", "boundary": "{not json" }))
        .expect("governorate with a name is kept");
    assert_eq!(broken.name.display(), "Basra");
    assert_eq!(broken.boundary, None);

    let serialized = json!({
        "$id": "g2",
        "name": "Anbar",
        "nameAr": "الأنبار",
        "boundary": json!({
            "type": "Polygon",
            "coordinates": [[[41.0, 33.0], [42.0, 33.0], [42.0, 34.0], [41.0, 33.0]]]
        })
        .to_string()
    });
    let anbar = mapper.to_governorate(&serialized).expect("governorate kept");
    assert_eq!(anbar.name.secondary.as_deref(), Some("الأنبار"));
    assert!(anbar.boundary.is_some());

    assert!(mapper.to_governorate(&json!({ "$id": "g3" })).is_none());
    assert_eq!(parse_geometry(&json!("")), None);
}

#[test]
fn stats_count_every_record_and_skip_undated_months() {
    let facilities = legacy_facilities();
    let stats = build_stats(&facilities);

    assert_eq!(stats.total, 7);
    assert_eq!(stats.by_governorate.get("Baghdad"), Some(&2));
    assert_eq!(stats.by_type.get("PHC"), Some(&2));
    assert_eq!(stats.by_affiliation.get("Unknown"), Some(&4));

    assert_eq!(stats.operational, 2);
    assert_eq!(stats.partially_operational, 1);
    assert_eq!(stats.not_operational, 2);
    assert_eq!(stats.unknown, 2);
    assert!(stats.operational + stats.partially_operational + stats.not_operational <= stats.total);

    assert_eq!(
        stats.timeline,
        vec![
            MonthCount { month: "2024-01".to_string(), count: 3 },
            MonthCount { month: "2024-03".to_string(), count: 2 },
        ]
    );

    assert_eq!(stats.by_owner_category.get(&OwnerCategory::Public), Some(&3));
    assert_eq!(stats.by_owner_category.get(&OwnerCategory::NgoIngo), Some(&3));
    assert_eq!(stats.by_owner_category.get(&OwnerCategory::Private), Some(&1));
    assert_eq!(
        stats.last_updated.map(|at| at.format("%Y-%m-%d").to_string()),
        Some("2024-02-01".to_string())
    );
}

#[test]
fn reference_options_merge_presets_without_duplicates() {
    let facilities = legacy_facilities();
    let presets = ReferencePresets {
        facility_types: vec!["hospital".to_string(), "Field Hospital".to_string()],
        owners: vec!["ministry of health".to_string()],
        affiliations: Vec::new(),
    };
    let options = derive_reference_options(
        &facilities,
        &presets,
        &RegistryConfig::default().tables.labels,
    );

    let hospitals = options
        .facility_types
        .iter()
        .filter(|label| label.eq_ignore_ascii_case("hospital"))
        .count();
    assert_eq!(hospitals, 1);
    assert!(options.facility_types.contains(&"Field Hospital".to_string()));
    assert!(options.facility_types.contains(&"PHC".to_string()));
    assert_eq!(
        options
            .owners
            .iter()
            .filter(|owner| owner.as_str() == "Ministry Of Health")
            .count(),
        1
    );
    assert!(options.statuses.contains(&FacilityStatus::Unknown));
}
