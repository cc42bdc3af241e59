//! Threshold filtering and ranking of scored candidates.

use serde_json::Value;

use crate::retrieval::Candidate;

use super::evaluator::MatchResult;

/// Default minimum score for a candidate to count as a true match.
pub const DEFAULT_MATCH_THRESHOLD: u8 = 70;

/// Default cap on how many matched items proceed to extraction.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// A candidate that scored at or above the match threshold.
#[derive(Debug, Clone)]
pub struct MatchedItem {
    pub candidate: Candidate,
    pub score: u8,
    pub explanation: String,
    /// The candidate's payload, parsed.
    pub schema_object: Value,
}

/// Selection policy: which scored candidates proceed to extraction.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    /// Minimum score (0-100) required to keep a candidate.
    pub threshold: u8,
    /// Maximum number of items to keep after ranking.
    pub max_results: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SelectionPolicy {
    pub fn new(threshold: u8, max_results: usize) -> Self {
        Self {
            threshold,
            max_results,
        }
    }

    /// Keep candidates scoring at or above the threshold, ranked by score
    /// descending with ties preserving candidate order, truncated to
    /// `max_results`.
    ///
    /// `results` must be positionally aligned with `candidates`, which is
    /// what the evaluator produces. Pure function: no I/O, empty in means
    /// empty out.
    pub fn select(
        &self,
        candidates: Vec<Candidate>,
        results: Vec<MatchResult>,
    ) -> Vec<MatchedItem> {
        let mut items: Vec<MatchedItem> = candidates
            .into_iter()
            .zip(results)
            .filter(|(_, result)| result.score >= self.threshold)
            .map(|(candidate, result)| {
                // The retrieval boundary already validated the payload;
                // fast-path candidates supplied by the caller may not be.
                let schema_object =
                    serde_json::from_str(&candidate.schema_json).unwrap_or(Value::Null);
                MatchedItem {
                    candidate,
                    score: result.score,
                    explanation: result.explanation,
                    schema_object,
                }
            })
            .collect();

        // sort_by is stable: equal scores keep their candidate order.
        items.sort_by(|a, b| b.score.cmp(&a.score));
        items.truncate(self.max_results);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(name: &str) -> Candidate {
        Candidate {
            url: format!("https://example.com/{name}"),
            schema_json: format!("{{\"name\":\"{name}\"}}"),
            name: name.to_string(),
            site: "menu".to_string(),
        }
    }

    fn make_result(score: u8) -> MatchResult {
        MatchResult {
            score,
            explanation: format!("scored {score}"),
            failed: false,
        }
    }

    fn select_scores(policy: &SelectionPolicy, scores: &[u8]) -> Vec<MatchedItem> {
        let candidates = scores
            .iter()
            .enumerate()
            .map(|(i, _)| make_candidate(&format!("item_{i}")))
            .collect();
        let results = scores.iter().map(|&s| make_result(s)).collect();
        policy.select(candidates, results)
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[69, 70, 71]);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].score, 71);
        assert_eq!(selected[1].score, 70);
    }

    #[test]
    fn test_sorted_descending() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[71, 95, 82]);

        let scores: Vec<u8> = selected.iter().map(|i| i.score).collect();
        assert_eq!(scores, vec![95, 82, 71]);
    }

    #[test]
    fn test_ties_preserve_candidate_order() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[80, 90, 80, 90]);

        let names: Vec<&str> = selected.iter().map(|i| i.candidate.name.as_str()).collect();
        assert_eq!(names, vec!["item_1", "item_3", "item_0", "item_2"]);
    }

    #[test]
    fn test_truncated_to_max_results() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[71, 72, 73, 74, 75, 76, 77, 78]);

        assert_eq!(selected.len(), DEFAULT_MAX_RESULTS);
        assert_eq!(selected[0].score, 78);
        assert_eq!(selected[4].score, 74);
    }

    #[test]
    fn test_all_below_threshold_is_empty() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[0, 10, 42, 69]);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_empty_input_is_empty() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[]);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_custom_policy() {
        let policy = SelectionPolicy::new(50, 2);
        let selected = select_scores(&policy, &[49, 50, 60, 70]);

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].score, 70);
        assert_eq!(selected[1].score, 60);
    }

    #[test]
    fn test_payload_is_parsed_into_schema_object() {
        let policy = SelectionPolicy::default();
        let selected = select_scores(&policy, &[90]);

        assert_eq!(selected[0].schema_object["name"], "item_0");
    }

    #[test]
    fn test_unparseable_payload_becomes_null() {
        let policy = SelectionPolicy::default();
        let mut candidate = make_candidate("broken");
        candidate.schema_json = "{not valid".to_string();

        let selected = policy.select(vec![candidate], vec![make_result(90)]);

        assert_eq!(selected.len(), 1);
        assert!(selected[0].schema_object.is_null());
    }
}
