use std::collections::BTreeSet;
use std::fs;

use facility_core::{Facility, FilterSpecification, RegistryConfig};
use facility_registry::{
    normalize_documents_str, run_queries, Document, FacilityMapper, FilterEngine, QueryConstraint,
};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn legacy_facilities() -> Vec<Facility> {
    let documents = fs::read_to_string(fixture_path("legacy_facilities.json"))
        .expect("legacy fixture should be readable");
    normalize_documents_str(&documents, &RegistryConfig::default())
        .expect("legacy fixture should normalize")
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn local_ids(
    engine: &FilterEngine,
    facilities: &[Facility],
    spec: &FilterSpecification,
) -> Vec<String> {
    engine
        .filter(facilities, spec)
        .into_iter()
        .map(|facility| facility.id.clone())
        .collect()
}

fn remote_ids(
    engine: &FilterEngine,
    stored: &[Document],
    spec: &FilterSpecification,
) -> Vec<String> {
    run_queries(stored, &engine.compile(spec))
        .documents
        .iter()
        .filter_map(|doc| doc.get("$id").and_then(|id| id.as_str()).map(str::to_string))
        .collect()
}

fn specs() -> Vec<FilterSpecification> {
    vec![
        FilterSpecification::default(),
        FilterSpecification {
            statuses: set(&["operational"]),
            ..Default::default()
        },
        FilterSpecification {
            statuses: set(&["not_operational", "partially_operational"]),
            ..Default::default()
        },
        FilterSpecification {
            statuses: set(&["unknown"]),
            ..Default::default()
        },
        FilterSpecification {
            statuses: set(&["unknown", "تعمل"]),
            ..Default::default()
        },
        FilterSpecification {
            statuses: set(&["bogus"]),
            ..Default::default()
        },
        FilterSpecification {
            governorate: " Baghdad ".to_string(),
            ..Default::default()
        },
        FilterSpecification {
            facility_types: set(&["phc", "hospital"]),
            ..Default::default()
        },
        FilterSpecification {
            owners: set(&["ministry of health"]),
            statuses: set(&["inactive"]),
            ..Default::default()
        },
        FilterSpecification {
            affiliations: set(&["KARKH directorate", "  "]),
            ..Default::default()
        },
        FilterSpecification {
            search_term: "NOOR".to_string(),
            ..Default::default()
        },
        FilterSpecification {
            search_term: "old city".to_string(),
            ..Default::default()
        },
        FilterSpecification {
            search_term: "c".to_string(),
            governorate: "Basra".to_string(),
            ..Default::default()
        },
    ]
}

#[test]
fn operational_filter_keeps_both_operational_spellings() {
    let engine = FilterEngine::default();
    let facilities = legacy_facilities();
    let spec = FilterSpecification {
        statuses: set(&["operational"]),
        ..Default::default()
    };

    assert_eq!(local_ids(&engine, &facilities, &spec), vec!["f1", "f2"]);
}

#[test]
fn local_and_compiled_filters_agree() {
    let engine = FilterEngine::default();
    let mapper = FacilityMapper::default();
    let facilities = legacy_facilities();
    let stored: Vec<Document> = facilities
        .iter()
        .map(|facility| mapper.facility_to_backend(facility))
        .collect();

    for spec in specs() {
        let mut local = local_ids(&engine, &facilities, &spec);
        let mut remote = remote_ids(&engine, &stored, &spec);
        local.sort();
        remote.sort();
        assert_eq!(local, remote, "filters disagree for {spec:?}");
    }
}

#[test]
fn unrecognized_status_matches_nothing() {
    let engine = FilterEngine::default();
    let facilities = legacy_facilities();
    let spec = FilterSpecification {
        statuses: set(&["bogus"]),
        ..Default::default()
    };

    assert!(engine.filter(&facilities, &spec).is_empty());
}

#[test]
fn short_search_terms_do_not_constrain() {
    let engine = FilterEngine::default();
    let spec = FilterSpecification {
        search_term: " a ".to_string(),
        ..Default::default()
    };

    assert!(engine.compile(&spec).is_empty());
    assert_eq!(engine.filter(&legacy_facilities(), &spec).len(), 7);
}

#[test]
fn unknown_status_compiles_to_exclusion_of_known_spellings() {
    let engine = FilterEngine::default();
    let spec = FilterSpecification {
        statuses: set(&["unknown", "operational"]),
        ..Default::default()
    };

    let compiled = engine.compile(&spec);
    assert_eq!(compiled.len(), 1);
    match &compiled[0] {
        QueryConstraint::Or { queries } => {
            assert!(matches!(queries[0], QueryConstraint::Equal { .. }));
            assert!(matches!(queries[1], QueryConstraint::NotEqual { .. }));
        }
        other => panic!("expected an or-group, got {other:?}"),
    }
}
