//! The feature encoder module
//! Turn agents and author queries into vectors over a shared vocabulary
//!
//! Columns are laid out as `[genre block | location block]`. The genre block
//! is multi-hot, the location block is one-hot. Both vocabularies are sorted
//! and frozen at fit time.

use crate::error::{RecommendError, Result};
use crate::roster::Agent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to do with a query label that was never seen while fitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnseenPolicy {
    /// Drop unseen labels: they contribute no bit
    #[default]
    Ignore,
    /// Fail the query with `InvalidInput`
    Reject,
}

/// Sorted label set mapping each label to a column offset within its block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    fn from_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Vocabulary {
        let set: BTreeSet<&String> = labels.collect();
        Vocabulary { labels: set.into_iter().cloned().collect() }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels
            .binary_search_by(|probe| probe.as_str().cmp(label))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Encoded roster, one row per agent, stored contiguously as
/// `[a1_c1, a1_c2, ..., a2_c1, a2_c2, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMatrix {
    values: Vec<f32>,
    dimension: usize,
}

impl AgentMatrix {
    /// Number of rows (agents).
    pub fn rows(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.values.len() / self.dimension
    }

    /// Number of columns, `genres + locations`.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row slice for the agent at `index` in roster order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.values[start..start + self.dimension]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.dimension.max(1))
    }
}

/// Fitted vocabularies. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    genres: Vocabulary,
    locations: Vocabulary,
}

impl FeatureEncoder {
    /// Fits both vocabularies on the roster and encodes every agent.
    ///
    /// Matrix rows are aligned 1:1 with `roster`, which is what lets the ranker
    /// map a row index back to an agent. An agent with a blank location fails
    /// with `InvalidRoster`, where `row` is its 1-based position in `roster`.
    ///
    /// # Examples
    ///
    /// ```
    /// use litrec::{Agent, FeatureEncoder};
    ///
    /// let roster = vec![
    ///     Agent::new("a", "NY", &["Fantasy"]),
    ///     Agent::new("b", "LA", &["Romance", "Fantasy"]),
    /// ];
    /// let (encoder, matrix) = FeatureEncoder::fit(&roster).unwrap();
    ///
    /// // Fantasy, Romance | LA, NY
    /// assert_eq!(encoder.dimension(), 4);
    /// assert_eq!(matrix.row(1), &[1.0, 1.0, 1.0, 0.0]);
    /// ```
    pub fn fit(roster: &[Agent]) -> Result<(FeatureEncoder, AgentMatrix)> {
        if roster.is_empty() {
            return Err(RecommendError::EmptyRoster);
        }
        if let Some(i) = roster.iter().position(|a| a.location.trim().is_empty()) {
            return Err(RecommendError::InvalidRoster {
                row: i + 1,
                message: format!("agent '{}' has an empty location", roster[i].name),
            });
        }

        let encoder = FeatureEncoder {
            genres: Vocabulary::from_labels(roster.iter().flat_map(|a| a.genres.iter())),
            locations: Vocabulary::from_labels(roster.iter().map(|a| &a.location)),
        };

        let dimension = encoder.dimension();
        let mut values = Vec::with_capacity(roster.len() * dimension);
        for agent in roster {
            // Every fitted label is in the vocabulary, so Ignore never drops anything here
            values.extend(encoder.encode(&agent.genres, &agent.location, UnseenPolicy::Ignore)?);
        }

        Ok((encoder, AgentMatrix { values, dimension }))
    }

    /// Encodes an author query, silently dropping labels unseen at fit time.
    ///
    /// An empty genre list gives an all-zero genre block; an unknown location
    /// gives an all-zero location block.
    pub fn encode_query(&self, genres: &[String], location: &str) -> Result<Vec<f32>> {
        self.encode(genres, location, UnseenPolicy::Ignore)
    }

    /// Encodes an author query under an explicit unseen-label policy.
    pub fn encode_query_with_policy(
        &self,
        genres: &[String],
        location: &str,
        policy: UnseenPolicy,
    ) -> Result<Vec<f32>> {
        self.encode(genres, location, policy)
    }

    fn encode(&self, genres: &[String], location: &str, policy: UnseenPolicy) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dimension()];

        for genre in genres {
            match self.genres.position(genre) {
                Some(col) => vector[col] = 1.0,
                None if policy == UnseenPolicy::Reject => {
                    return Err(RecommendError::InvalidInput(format!("Unknown genre: '{}'", genre)));
                }
                None => {}
            }
        }

        match self.locations.position(location) {
            Some(col) => vector[self.genres.len() + col] = 1.0,
            None if policy == UnseenPolicy::Reject => {
                return Err(RecommendError::InvalidInput(format!("Unknown location: '{}'", location)));
            }
            None => {}
        }

        Ok(vector)
    }

    pub fn dimension(&self) -> usize {
        self.genres.len() + self.locations.len()
    }

    pub fn genres(&self) -> &Vocabulary {
        &self.genres
    }

    pub fn locations(&self) -> &Vocabulary {
        &self.locations
    }
}

#[cfg(test)]
mod encoder_test {
    use super::*;

    fn sample_roster() -> Vec<Agent> {
        vec![
            Agent::new("fantasy_ny", "NY", &["Fantasy"]),
            Agent::new("romance_ny", "NY", &["Romance"]),
            Agent::new("fantasy_la", "LA", &["Fantasy"]),
        ]
    }

    fn strings(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    // ========== Fit Tests ==========

    #[test]
    fn test_fit_builds_sorted_vocabularies() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        assert_eq!(encoder.genres().labels(), &["Fantasy", "Romance"]);
        assert_eq!(encoder.locations().labels(), &["LA", "NY"]);
        assert_eq!(encoder.dimension(), 4);
    }

    #[test]
    fn test_fit_rows_aligned_with_roster() {
        let (_, matrix) = FeatureEncoder::fit(&sample_roster()).unwrap();

        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.row(0), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(matrix.row(1), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(matrix.row(2), &[1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fit_location_block_is_one_hot() {
        let roster = vec![
            Agent::new("a", "Boston", &["Horror", "Mystery", "Thriller"]),
            Agent::new("b", "Chicago", &[]),
            Agent::new("c", "Austin", &["Mystery"]),
        ];
        let (encoder, matrix) = FeatureEncoder::fit(&roster).unwrap();
        let genre_cols = encoder.genres().len();

        for row in matrix.iter_rows() {
            let hot: f32 = row[genre_cols..].iter().sum();
            assert_eq!(hot, 1.0);
        }
        // Agent without genres has an all-zero genre block
        assert!(matrix.row(1)[..genre_cols].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_fit_empty_roster() {
        let result = FeatureEncoder::fit(&[]);
        assert!(matches!(result, Err(RecommendError::EmptyRoster)));
    }

    #[test]
    fn test_fit_rejects_blank_location() {
        let mut roster = sample_roster();
        roster.push(Agent::new("nowhere", "  ", &["Fantasy"]));

        match FeatureEncoder::fit(&roster) {
            Err(RecommendError::InvalidRoster { row, message }) => {
                assert_eq!(row, 4);
                assert!(message.contains("nowhere"));
            }
            other => panic!("expected InvalidRoster, got {:?}", other.map(|(e, _)| e.dimension())),
        }
    }

    // ========== Query Tests ==========

    #[test]
    fn test_encode_query_known_labels() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let q = encoder.encode_query(&strings(&["Romance", "Fantasy"]), "LA").unwrap();
        assert_eq!(q, vec![1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_encode_query_duplicate_genre_sets_one_bit() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let q = encoder.encode_query(&strings(&["Fantasy", "Fantasy"]), "NY").unwrap();
        assert_eq!(q, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_encode_query_empty_genres() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let q = encoder.encode_query(&[], "NY").unwrap();
        assert_eq!(q, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_encode_query_unseen_labels_are_dropped() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let unseen = encoder.encode_query(&strings(&["Horror"]), "Atlantis").unwrap();
        let empty = encoder.encode_query(&[], "").unwrap();

        assert_eq!(unseen, vec![0.0; 4]);
        assert_eq!(unseen, empty);
    }

    #[test]
    fn test_encode_query_unseen_mixed_with_known() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let q = encoder.encode_query(&strings(&["Horror", "Romance"]), "Atlantis").unwrap();
        assert_eq!(q, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_query_reject_policy() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let genre = encoder.encode_query_with_policy(&strings(&["Horror"]), "NY", UnseenPolicy::Reject);
        assert!(matches!(genre, Err(RecommendError::InvalidInput(_))));

        let location = encoder.encode_query_with_policy(&strings(&["Fantasy"]), "Atlantis", UnseenPolicy::Reject);
        assert!(matches!(location, Err(RecommendError::InvalidInput(_))));

        let known = encoder.encode_query_with_policy(&strings(&["Fantasy"]), "NY", UnseenPolicy::Reject);
        assert_eq!(known.unwrap(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let (encoder, _) = FeatureEncoder::fit(&sample_roster()).unwrap();

        let q = encoder.encode_query(&strings(&["fantasy"]), "ny").unwrap();
        assert_eq!(q, vec![0.0; 4]);
    }
}
