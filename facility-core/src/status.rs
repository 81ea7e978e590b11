//! Operational status vocabulary: canonical buckets, legacy spellings and display labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical, language-neutral status of a facility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FacilityStatus {
    Operational,
    PartiallyOperational,
    NotOperational,
    /// Source label matched neither the table nor the fallback keywords.
    Unknown,
}

impl FacilityStatus {
    pub const ALL: [FacilityStatus; 4] = [
        FacilityStatus::Operational,
        FacilityStatus::PartiallyOperational,
        FacilityStatus::NotOperational,
        FacilityStatus::Unknown,
    ];

    pub fn token(self) -> &'static str {
        match self {
            FacilityStatus::Operational => "operational",
            FacilityStatus::PartiallyOperational => "partially_operational",
            FacilityStatus::NotOperational => "not_operational",
            FacilityStatus::Unknown => "unknown",
        }
    }

    pub fn from_token(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.token() == value.trim())
    }

    pub fn is_operational(self) -> bool {
        self == FacilityStatus::Operational
    }

    pub fn is_partially_operational(self) -> bool {
        self == FacilityStatus::PartiallyOperational
    }

    pub fn is_not_operational(self) -> bool {
        self == FacilityStatus::NotOperational
    }

    pub fn is_known(self) -> bool {
        self != FacilityStatus::Unknown
    }
}

impl fmt::Display for FacilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "ar" | "arabic" => Ok(Locale::Ar),
            other => Err(format!("unsupported locale {other}")),
        }
    }
}

/// A known source spelling and the bucket it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEntry {
    pub raw: String,
    pub status: FacilityStatus,
    #[serde(default)]
    pub label_en: Option<String>,
    #[serde(default)]
    pub label_ar: Option<String>,
}

impl StatusEntry {
    fn label(&self, locale: Locale) -> Option<&str> {
        match locale {
            Locale::En => self.label_en.as_deref(),
            Locale::Ar => self.label_ar.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusLabel {
    pub en: String,
    pub ar: String,
}

impl StatusLabel {
    fn new(en: &str, ar: &str) -> Self {
        Self {
            en: en.to_string(),
            ar: ar.to_string(),
        }
    }

    fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.en,
            Locale::Ar => &self.ar,
        }
    }
}

/// Display labels for the canonical buckets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusLabels {
    pub operational: StatusLabel,
    pub partially_operational: StatusLabel,
    pub not_operational: StatusLabel,
    pub unknown: StatusLabel,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            operational: StatusLabel::new("Operational", "عاملة"),
            partially_operational: StatusLabel::new("Partially operational", "تعمل جزئياً"),
            not_operational: StatusLabel::new("Not operational", "غير عاملة"),
            unknown: StatusLabel::new("Unknown", "غير معروف"),
        }
    }
}

impl StatusLabels {
    fn get(&self, status: FacilityStatus) -> &StatusLabel {
        match status {
            FacilityStatus::Operational => &self.operational,
            FacilityStatus::PartiallyOperational => &self.partially_operational,
            FacilityStatus::NotOperational => &self.not_operational,
            FacilityStatus::Unknown => &self.unknown,
        }
    }
}

/// Mapping table from every known spelling onto the canonical buckets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusVocabulary {
    pub entries: Vec<StatusEntry>,
    /// Lowercase substrings that mark an otherwise unknown label as not operational.
    pub not_operational_keywords: Vec<String>,
    pub labels: StatusLabels,
}

pub const SECURITY_UNREACHABLE: &str = "تعمل ولكن لا يمكن الوصول اليه بسبب الوضع الأمني";
pub const OTHER_UNREACHABLE: &str = "تعمل ولكن لا يمكن الوصول اليه لسبب أخر (يرجى التحديد)";

fn entry(raw: &str, status: FacilityStatus, en: Option<&str>, ar: Option<&str>) -> StatusEntry {
    StatusEntry {
        raw: raw.to_string(),
        status,
        label_en: en.map(str::to_string),
        label_ar: ar.map(str::to_string),
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        use FacilityStatus::*;

        let entries = vec![
            entry("تعمل", Operational, Some("Operational"), Some("عاملة")),
            entry("لا تعمل", NotOperational, Some("Not operational"), Some("غير عاملة")),
            entry(
                "متوقفة جزئياً",
                PartiallyOperational,
                Some("Partially operational"),
                Some("تعمل جزئياً"),
            ),
            entry(
                "تعمل بشكل جزئي",
                PartiallyOperational,
                Some("Partially operational"),
                Some("تعمل جزئياً"),
            ),
            entry(
                SECURITY_UNREACHABLE,
                Operational,
                Some("Operational (unreachable due to security)"),
                Some("عاملة (يتعذر الوصول بسبب الوضع الأمني)"),
            ),
            entry(
                OTHER_UNREACHABLE,
                Operational,
                Some("Operational (unreachable for another reason)"),
                Some("عاملة (يتعذر الوصول لسبب آخر)"),
            ),
            entry("operational", Operational, None, Some("عاملة")),
            entry("active", Operational, None, Some("عاملة")),
            entry("not operational", NotOperational, None, Some("غير عاملة")),
            entry("inactive", NotOperational, None, Some("غير عاملة")),
            entry("partially operational", PartiallyOperational, None, Some("تعمل جزئياً")),
            entry(
                "operational (unreachable due to security)",
                Operational,
                None,
                Some("عاملة (يتعذر الوصول بسبب الوضع الأمني)"),
            ),
            entry(
                "operational (unreachable for another reason)",
                Operational,
                None,
                Some("عاملة (يتعذر الوصول لسبب آخر)"),
            ),
        ];

        Self {
            entries,
            not_operational_keywords: ["inactive", "suspended", "pending", "not operational"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            labels: StatusLabels::default(),
        }
    }
}

impl StatusVocabulary {
    /// Table entry for a source spelling, compared trimmed and case-insensitively.
    pub fn lookup(&self, raw: &str) -> Option<&StatusEntry> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.raw.trim().to_lowercase() == needle)
    }

    /// Maps any source label onto its canonical bucket. Never fails.
    pub fn normalize(&self, raw: &str) -> FacilityStatus {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FacilityStatus::Unknown;
        }
        if let Some(status) = FacilityStatus::from_token(trimmed) {
            return status;
        }
        if let Some(entry) = self.lookup(trimmed) {
            return entry.status;
        }

        let lower = trimmed.to_lowercase();
        if self
            .not_operational_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
        {
            return FacilityStatus::NotOperational;
        }

        FacilityStatus::Unknown
    }

    /// Spelling written back to the backend for a source label.
    ///
    /// Table spellings are kept verbatim, other classifiable labels collapse to
    /// the canonical token, and unknown labels pass through trimmed.
    pub fn backend_spelling(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(entry) = self.lookup(trimmed) {
            return Some(entry.raw.clone());
        }
        match self.normalize(trimmed) {
            FacilityStatus::Unknown => Some(trimmed.to_string()),
            status => Some(status.token().to_string()),
        }
    }

    /// Every backend spelling that normalizes to `status`.
    pub fn spellings_for(&self, status: FacilityStatus) -> Vec<String> {
        let mut spellings = vec![status.token().to_string()];
        for entry in self.entries.iter().filter(|entry| entry.status == status) {
            if !spellings.contains(&entry.raw) {
                spellings.push(entry.raw.clone());
            }
        }
        spellings
    }

    /// Every backend spelling that normalizes to a known bucket.
    pub fn known_spellings(&self) -> Vec<String> {
        FacilityStatus::ALL
            .into_iter()
            .filter(|status| status.is_known())
            .flat_map(|status| self.spellings_for(status))
            .collect()
    }

    pub fn display(&self, status: FacilityStatus, locale: Locale) -> &str {
        self.labels.get(status).get(locale)
    }

    /// Human label for a raw source spelling, falling back to the spelling itself.
    pub fn translate_label(&self, raw: &str, locale: Locale) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        if let Some(label) = self.lookup(trimmed).and_then(|entry| entry.label(locale)) {
            return label.to_string();
        }
        if let Some(status) = FacilityStatus::from_token(trimmed) {
            return self.display(status, locale).to_string();
        }
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_variants_share_the_operational_bucket() {
        let vocabulary = StatusVocabulary::default();
        assert_eq!(vocabulary.normalize("تعمل"), FacilityStatus::Operational);
        assert_eq!(
            vocabulary.normalize(SECURITY_UNREACHABLE),
            FacilityStatus::Operational
        );
        assert_eq!(
            vocabulary.normalize(OTHER_UNREACHABLE),
            FacilityStatus::Operational
        );
    }

    #[test]
    fn english_spellings_are_case_insensitive() {
        let vocabulary = StatusVocabulary::default();
        assert_eq!(vocabulary.normalize(" Active "), FacilityStatus::Operational);
        assert_eq!(
            vocabulary.normalize("Partially Operational"),
            FacilityStatus::PartiallyOperational
        );
        assert_eq!(
            vocabulary.normalize("partially_operational"),
            FacilityStatus::PartiallyOperational
        );
    }

    #[test]
    fn keywords_catch_unlisted_inactive_labels() {
        let vocabulary = StatusVocabulary::default();
        assert_eq!(
            vocabulary.normalize("Suspended pending funding"),
            FacilityStatus::NotOperational
        );
        assert_eq!(vocabulary.normalize("Under construction"), FacilityStatus::Unknown);
        assert_eq!(vocabulary.normalize("  "), FacilityStatus::Unknown);
    }

    #[test]
    fn classifiers_are_exclusive() {
        for status in FacilityStatus::ALL {
            let hits = [
                status.is_operational(),
                status.is_partially_operational(),
                status.is_not_operational(),
            ]
            .into_iter()
            .filter(|hit| *hit)
            .count();
            let expected = if status.is_known() { 1 } else { 0 };
            assert_eq!(hits, expected, "{status}");
        }
    }

    #[test]
    fn backend_spelling_keeps_table_text() {
        let vocabulary = StatusVocabulary::default();
        assert_eq!(vocabulary.backend_spelling("ACTIVE").as_deref(), Some("active"));
        assert_eq!(
            vocabulary.backend_spelling("suspended (funding)").as_deref(),
            Some("not_operational")
        );
        assert_eq!(
            vocabulary.backend_spelling(" Closed? ").as_deref(),
            Some("Closed?")
        );
        assert_eq!(vocabulary.backend_spelling(""), None);
    }

    #[test]
    fn labels_translate_per_locale() {
        let vocabulary = StatusVocabulary::default();
        assert_eq!(
            vocabulary.translate_label(SECURITY_UNREACHABLE, Locale::En),
            "Operational (unreachable due to security)"
        );
        assert_eq!(vocabulary.translate_label("inactive", Locale::Ar), "غير عاملة");
        assert_eq!(vocabulary.translate_label("active", Locale::En), "active");
        assert_eq!(
            vocabulary.display(FacilityStatus::PartiallyOperational, Locale::Ar),
            "تعمل جزئياً"
        );
    }
}
