//! Canonical casing for free-text classification labels (type, owner, affiliation).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelRules {
    /// Labels at or below this many characters are treated as codes and uppercased.
    pub acronym_max_len: usize,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self { acronym_max_len: 5 }
    }
}

impl LabelRules {
    /// Collapses whitespace, then uppercases codes and title-cases everything else.
    pub fn canonicalize(&self, raw: &str) -> String {
        let words: Vec<&str> = raw.split_whitespace().collect();
        if words.is_empty() {
            return String::new();
        }

        // Measured after uppercasing, which can lengthen text (ß -> SS).
        let upper = words.join(" ").to_uppercase();
        if upper.chars().count() <= self.acronym_max_len || upper.contains('-') {
            return upper;
        }

        words
            .into_iter()
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A first letter without a single-character uppercase form is kept as is.
fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    let head = match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => first,
    };
    std::iter::once(head)
        .chain(chars.flat_map(char::to_lowercase))
        .collect()
}

/// Canonicalizes with the default rules.
pub fn canonicalize(raw: &str) -> String {
    LabelRules::default().canonicalize(raw)
}

/// Case-insensitive identity of a label, used for de-duplication.
pub fn canonical_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_become_codes() {
        assert_eq!(canonicalize("moh"), "MOH");
        assert_eq!(canonicalize(" MoH "), "MOH");
        assert_eq!(canonicalize("phc"), "PHC");
    }

    #[test]
    fn hyphenated_labels_become_codes() {
        assert_eq!(canonicalize("non-governmental org"), "NON-GOVERNMENTAL ORG");
    }

    #[test]
    fn long_labels_are_title_cased_and_collapsed() {
        assert_eq!(canonicalize("ministry of health"), "Ministry Of Health");
        assert_eq!(canonicalize("Ministry Of Health"), "Ministry Of Health");
        assert_eq!(canonicalize(" MINISTRY  OF  HEALTH "), "Ministry Of Health");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   \t "), "");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for raw in [
            "hospital",
            "MOH",
            "primary health care centre",
            "INGO - partner",
            "مستشفى عام",
            "x",
            "ßßß",
            "straße des friedens",
        ] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn expanding_case_maps_stay_stable() {
        assert_eq!(canonicalize("ßßß"), "ßßß");
        assert_eq!(canonicalize("ßß"), "SSSS");
        assert_eq!(canonicalize("SSSS"), "SSSS");
    }

    #[test]
    fn acronym_threshold_is_configurable() {
        let rules = LabelRules { acronym_max_len: 3 };
        assert_eq!(rules.canonicalize("unicef"), "Unicef");
        assert_eq!(rules.canonicalize("who"), "WHO");
    }
}
