//! Summary statistics over canonical facilities.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use facility_core::{Facility, FacilityStatus, OwnerCategory, OwnerCategoryRules};
use serde::{Deserialize, Serialize};

/// Bucket used when a grouping field is blank.
pub const UNKNOWN_KEY: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub by_governorate: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<FacilityStatus, usize>,
    pub by_owner: BTreeMap<String, usize>,
    pub by_owner_category: BTreeMap<OwnerCategory, usize>,
    pub by_affiliation: BTreeMap<String, usize>,
    pub timeline: Vec<MonthCount>,
    pub operational: usize,
    pub partially_operational: usize,
    pub not_operational: usize,
    /// Facilities whose status fits none of the three buckets.
    pub unknown: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    owner_categories: OwnerCategoryRules,
}

impl Aggregator {
    pub fn new(owner_categories: OwnerCategoryRules) -> Self {
        Self { owner_categories }
    }

    pub fn build_stats(&self, facilities: &[Facility]) -> Stats {
        let mut stats = Stats {
            total: facilities.len(),
            ..Stats::default()
        };
        let mut months: BTreeMap<String, usize> = BTreeMap::new();

        for facility in facilities {
            bump(&mut stats.by_governorate, &facility.governorate);
            bump(&mut stats.by_type, &facility.facility_type_label);
            bump(&mut stats.by_owner, &facility.facility_owner);
            bump(&mut stats.by_affiliation, &facility.facility_affiliation);
            *stats.by_status.entry(facility.facility_status).or_default() += 1;
            *stats
                .by_owner_category
                .entry(self.owner_categories.classify(&facility.facility_owner))
                .or_default() += 1;

            match facility.facility_status {
                FacilityStatus::Operational => stats.operational += 1,
                FacilityStatus::PartiallyOperational => stats.partially_operational += 1,
                FacilityStatus::NotOperational => stats.not_operational += 1,
                FacilityStatus::Unknown => stats.unknown += 1,
            }

            if let Some(created_at) = facility.created_at {
                *months
                    .entry(created_at.format("%Y-%m").to_string())
                    .or_default() += 1;
            }

            if facility.updated_at > stats.last_updated {
                stats.last_updated = facility.updated_at;
            }
        }

        stats.timeline = months
            .into_iter()
            .map(|(month, count)| MonthCount { month, count })
            .collect();
        stats
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    let key = if key.trim().is_empty() { UNKNOWN_KEY } else { key };
    *counts.entry(key.to_string()).or_default() += 1;
}

/// Aggregates with the default owner-category rules.
pub fn build_stats(facilities: &[Facility]) -> Stats {
    Aggregator::default().build_stats(facilities)
}
