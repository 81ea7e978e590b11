//! Filter predicate engine: local evaluation and compilation to backend queries.
//!
//! Both paths resolve a [`FilterSpecification`] through the same
//! [`ResolvedFilter`], so a facility set filtered in memory and the same set
//! stored in backend form and queried remotely yield the same ids.

use std::collections::BTreeSet;

use facility_core::{
    Facility, FacilityStatus, FilterSpecification, NormalizationTables, RegistryConfig,
};

use crate::fields;
use crate::query::QueryConstraint;

/// A filter specification reduced to canonical values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedFilter {
    pub search: Option<String>,
    pub governorate: Option<String>,
    /// `None` means unconstrained; an empty set matches nothing.
    pub statuses: Option<BTreeSet<FacilityStatus>>,
    pub facility_types: Option<BTreeSet<String>>,
    pub owners: Option<BTreeSet<String>>,
    pub affiliations: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone)]
pub struct FilterEngine {
    tables: NormalizationTables,
    search_min_chars: usize,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

impl FilterEngine {
    pub fn new(tables: NormalizationTables, search_min_chars: usize) -> Self {
        Self {
            tables,
            search_min_chars,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.tables.clone(), config.search_min_chars)
    }

    pub fn resolve(&self, spec: &FilterSpecification) -> ResolvedFilter {
        ResolvedFilter {
            search: spec.search_needle(self.search_min_chars),
            governorate: spec.governorate().map(str::to_string),
            statuses: self.resolve_statuses(&spec.statuses),
            facility_types: self.resolve_labels(&spec.facility_types),
            owners: self.resolve_labels(&spec.owners),
            affiliations: self.resolve_labels(&spec.affiliations),
        }
    }

    fn resolve_labels(&self, values: &BTreeSet<String>) -> Option<BTreeSet<String>> {
        let resolved: BTreeSet<String> = values
            .iter()
            .map(|value| self.tables.labels.canonicalize(value))
            .filter(|value| !value.is_empty())
            .collect();
        (!resolved.is_empty()).then_some(resolved)
    }

    /// Unrecognized members match nothing rather than silently widening the filter.
    fn resolve_statuses(&self, values: &BTreeSet<String>) -> Option<BTreeSet<FacilityStatus>> {
        let members: Vec<&str> = values
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect();
        if members.is_empty() {
            return None;
        }

        let vocabulary = &self.tables.statuses;
        Some(
            members
                .into_iter()
                .filter_map(|member| match vocabulary.normalize(member) {
                    FacilityStatus::Unknown => FacilityStatus::from_token(member),
                    status => Some(status),
                })
                .collect(),
        )
    }

    pub fn matches(&self, facility: &Facility, spec: &FilterSpecification) -> bool {
        self.matches_resolved(facility, &self.resolve(spec))
    }

    pub fn matches_resolved(&self, facility: &Facility, filter: &ResolvedFilter) -> bool {
        if let Some(governorate) = &filter.governorate {
            if facility.governorate != *governorate {
                return false;
            }
        }

        if let Some(statuses) = &filter.statuses {
            if !statuses.contains(&facility.facility_status) {
                return false;
            }
        }

        let label_checks = [
            (&filter.facility_types, &facility.facility_type_label),
            (&filter.owners, &facility.facility_owner),
            (&filter.affiliations, &facility.facility_affiliation),
        ];
        for (allowed, value) in label_checks {
            if let Some(allowed) = allowed {
                if !allowed.contains(value) {
                    return false;
                }
            }
        }

        if let Some(needle) = &filter.search {
            let name_match = facility.facility_name.to_lowercase().contains(needle)
                || facility
                    .establishment_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(needle));
            if !name_match {
                return false;
            }
        }

        true
    }

    pub fn filter<'a>(
        &self,
        facilities: &'a [Facility],
        spec: &FilterSpecification,
    ) -> Vec<&'a Facility> {
        let resolved = self.resolve(spec);
        facilities
            .iter()
            .filter(|facility| self.matches_resolved(facility, &resolved))
            .collect()
    }

    /// Compiles the filter into constraints over backend field names.
    ///
    /// Status members expand to every stored spelling of their bucket, so the
    /// remote result is never narrower than the local one.
    pub fn compile(&self, spec: &FilterSpecification) -> Vec<QueryConstraint> {
        let filter = self.resolve(spec);
        let mut queries = Vec::new();

        if let Some(governorate) = filter.governorate {
            queries.push(QueryConstraint::equal(
                fields::GOVERNORATE.field,
                vec![governorate],
            ));
        }

        if let Some(statuses) = &filter.statuses {
            queries.push(self.compile_statuses(statuses));
        }

        let label_fields = [
            (filter.facility_types, fields::FACILITY_TYPE.field),
            (filter.owners, fields::OWNER.field),
            (filter.affiliations, fields::AFFILIATION.field),
        ];
        for (allowed, field) in label_fields {
            if let Some(allowed) = allowed {
                queries.push(QueryConstraint::equal(field, allowed.into_iter().collect()));
            }
        }

        if filter.search.is_some() {
            queries.push(QueryConstraint::Search {
                attributes: vec![
                    fields::FACILITY_NAME.field.to_string(),
                    fields::ESTABLISHMENT_NAME.field.to_string(),
                ],
                term: spec.search_term.trim().to_string(),
            });
        }

        queries
    }

    fn compile_statuses(&self, statuses: &BTreeSet<FacilityStatus>) -> QueryConstraint {
        let vocabulary = &self.tables.statuses;
        let field = fields::STATUS.field;

        let mut spellings = Vec::new();
        for status in statuses.iter().filter(|status| status.is_known()) {
            for spelling in vocabulary.spellings_for(*status) {
                if !spellings.contains(&spelling) {
                    spellings.push(spelling);
                }
            }
        }
        let known = QueryConstraint::equal(field, spellings);

        if !statuses.contains(&FacilityStatus::Unknown) {
            return known;
        }

        let unknown = QueryConstraint::not_equal(field, vocabulary.known_spellings());
        if statuses.len() == 1 {
            unknown
        } else {
            QueryConstraint::Or {
                queries: vec![known, unknown],
            }
        }
    }
}
