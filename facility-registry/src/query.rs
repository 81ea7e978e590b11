//! Backend query constraints and a reference evaluator for them.
//!
//! The evaluator mirrors the document store's semantics: equality is exact on
//! the stored text, search is a case-insensitive substring match, and missing
//! attributes read as the empty string.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fields::{value_as_text, Document};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum QueryConstraint {
    Equal {
        attribute: String,
        values: Vec<String>,
    },
    NotEqual {
        attribute: String,
        values: Vec<String>,
    },
    Search {
        attributes: Vec<String>,
        term: String,
    },
    Or {
        queries: Vec<QueryConstraint>,
    },
    OrderAsc {
        attribute: String,
    },
    OrderDesc {
        attribute: String,
    },
    Limit {
        limit: usize,
    },
    CursorAfter {
        id: String,
    },
}

impl QueryConstraint {
    pub fn equal(attribute: &str, values: Vec<String>) -> Self {
        QueryConstraint::Equal {
            attribute: attribute.to_string(),
            values,
        }
    }

    pub fn not_equal(attribute: &str, values: Vec<String>) -> Self {
        QueryConstraint::NotEqual {
            attribute: attribute.to_string(),
            values,
        }
    }

    pub fn order_desc(attribute: &str) -> Self {
        QueryConstraint::OrderDesc {
            attribute: attribute.to_string(),
        }
    }

    pub fn order_asc(attribute: &str) -> Self {
        QueryConstraint::OrderAsc {
            attribute: attribute.to_string(),
        }
    }

    /// Whether the constraint narrows the result set (as opposed to ordering or paging).
    pub fn is_filter(&self) -> bool {
        matches!(
            self,
            QueryConstraint::Equal { .. }
                | QueryConstraint::NotEqual { .. }
                | QueryConstraint::Search { .. }
                | QueryConstraint::Or { .. }
        )
    }

    /// Evaluates a filter constraint. Ordering and paging constraints always match.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            QueryConstraint::Equal { attribute, values } => {
                let text = attribute_text(doc, attribute);
                values.iter().any(|value| *value == text)
            }
            QueryConstraint::NotEqual { attribute, values } => {
                let text = attribute_text(doc, attribute);
                !values.iter().any(|value| *value == text)
            }
            QueryConstraint::Search { attributes, term } => {
                let needle = term.trim().to_lowercase();
                attributes.iter().any(|attribute| {
                    attribute_text(doc, attribute)
                        .to_lowercase()
                        .contains(&needle)
                })
            }
            QueryConstraint::Or { queries } => queries.iter().any(|query| query.matches(doc)),
            _ => true,
        }
    }
}

fn attribute_text(doc: &Document, attribute: &str) -> String {
    doc.get(attribute)
        .and_then(value_as_text)
        .unwrap_or_default()
}

/// Result of running a query list over an in-memory collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOutcome {
    /// Matching documents before paging.
    pub total: usize,
    pub documents: Vec<Document>,
}

/// Applies filters, ordering, cursor and limit in that order.
pub fn run_queries(documents: &[Document], queries: &[QueryConstraint]) -> QueryOutcome {
    let mut matched: Vec<Document> = documents
        .iter()
        .filter(|doc| queries.iter().all(|query| query.matches(doc)))
        .cloned()
        .collect();
    let total = matched.len();

    for query in queries.iter().rev() {
        match query {
            QueryConstraint::OrderAsc { attribute } => {
                matched.sort_by(|a, b| compare_attribute(a, b, attribute));
            }
            QueryConstraint::OrderDesc { attribute } => {
                matched.sort_by(|a, b| compare_attribute(b, a, attribute));
            }
            _ => {}
        }
    }

    let cursor = queries.iter().find_map(|query| match query {
        QueryConstraint::CursorAfter { id } => Some(id.as_str()),
        _ => None,
    });
    if let Some(cursor) = cursor {
        let position = matched
            .iter()
            .position(|doc| doc.get("$id").and_then(value_as_text).as_deref() == Some(cursor));
        matched = match position {
            Some(index) => matched.split_off(index + 1),
            None => Vec::new(),
        };
    }

    let limit = queries.iter().find_map(|query| match query {
        QueryConstraint::Limit { limit } => Some(*limit),
        _ => None,
    });
    if let Some(limit) = limit {
        matched.truncate(limit);
    }

    QueryOutcome {
        total,
        documents: matched,
    }
}

fn compare_attribute(a: &Document, b: &Document, attribute: &str) -> Ordering {
    match (a.get(attribute), b.get(attribute)) {
        (Some(left), Some(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            _ => attribute_text(a, attribute).cmp(&attribute_text(b, attribute)),
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        [
            json!({ "$id": "a", "facilityName": "Al Noor Hospital", "rank": 2 }),
            json!({ "$id": "b", "facilityName": "Basra Clinic", "rank": 3 }),
            json!({ "$id": "c", "facilityName": "Noor PHC", "rank": 1 }),
        ]
        .into_iter()
        .filter_map(|value| value.as_object().cloned())
        .collect()
    }

    fn ids(outcome: &QueryOutcome) -> Vec<String> {
        outcome
            .documents
            .iter()
            .filter_map(|doc| doc.get("$id").and_then(value_as_text))
            .collect()
    }

    #[test]
    fn search_is_case_insensitive() {
        let outcome = run_queries(
            &docs(),
            &[QueryConstraint::Search {
                attributes: vec!["facilityName".into()],
                term: "NOOR".into(),
            }],
        );
        assert_eq!(ids(&outcome), vec!["a", "c"]);
    }

    #[test]
    fn ordering_cursor_and_limit_page_through_results() {
        let queries = vec![
            QueryConstraint::order_asc("rank"),
            QueryConstraint::Limit { limit: 2 },
        ];
        let first = run_queries(&docs(), &queries);
        assert_eq!(ids(&first), vec!["c", "a"]);
        assert_eq!(first.total, 3);

        let mut next = queries.clone();
        next.push(QueryConstraint::CursorAfter { id: "a".into() });
        assert_eq!(ids(&run_queries(&docs(), &next)), vec!["b"]);
    }

    #[test]
    fn missing_attributes_read_as_empty() {
        let outcome = run_queries(
            &docs(),
            &[QueryConstraint::not_equal("facilityStatus", vec!["active".into()])],
        );
        assert_eq!(outcome.total, 3);
    }
}
