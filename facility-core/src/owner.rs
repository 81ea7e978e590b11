//! Best-effort owner categories derived from free-text owner labels.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OwnerCategory {
    Public,
    NgoIngo,
    Private,
    Other,
}

impl OwnerCategory {
    pub fn label(self) -> &'static str {
        match self {
            OwnerCategory::Public => "Public",
            OwnerCategory::NgoIngo => "NGO/INGO",
            OwnerCategory::Private => "Private",
            OwnerCategory::Other => "Other",
        }
    }
}

impl fmt::Display for OwnerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerCategoryRule {
    pub category: OwnerCategory,
    pub keywords: Vec<String>,
}

/// Ordered keyword rules; the first rule with a matching substring wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OwnerCategoryRules {
    pub rules: Vec<OwnerCategoryRule>,
}

fn rule(category: OwnerCategory, keywords: &[&str]) -> OwnerCategoryRule {
    OwnerCategoryRule {
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

impl Default for OwnerCategoryRules {
    fn default() -> Self {
        Self {
            rules: vec![
                rule(
                    OwnerCategory::Public,
                    &[
                        "ministry",
                        "moh",
                        "public",
                        "وزارة",
                        "حكومي",
                    ],
                ),
                rule(
                    OwnerCategory::NgoIngo,
                    &[
                        "ngo",
                        "non-governmental",
                        "organization",
                        "organisation",
                        "foundation",
                        "charity",
                        "red crescent",
                        "منظمة",
                        "جمعية",
                    ],
                ),
                rule(OwnerCategory::Private, &["private", "company", "خاص", "أهلي"]),
            ],
        }
    }
}

impl OwnerCategoryRules {
    pub fn classify(&self, owner: &str) -> OwnerCategory {
        let lower = owner.trim().to_lowercase();
        if lower.is_empty() {
            return OwnerCategory::Other;
        }
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw.as_str())))
            .map(|rule| rule.category)
            .unwrap_or(OwnerCategory::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_owners() {
        let rules = OwnerCategoryRules::default();
        assert_eq!(rules.classify("Ministry Of Health"), OwnerCategory::Public);
        assert_eq!(rules.classify("MOH"), OwnerCategory::Public);
        assert_eq!(rules.classify("INGO"), OwnerCategory::NgoIngo);
        assert_eq!(rules.classify("Private Clinic Group"), OwnerCategory::Private);
        assert_eq!(rules.classify("Community"), OwnerCategory::Other);
        assert_eq!(rules.classify(""), OwnerCategory::Other);
    }

    #[test]
    fn earlier_rules_take_priority() {
        let rules = OwnerCategoryRules::default();
        assert_eq!(
            rules.classify("Ministry partnership with private sector"),
            OwnerCategory::Public
        );
    }
}
