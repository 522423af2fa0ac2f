//! The similarity ranker module
//! Score every agent row against a query and keep the best matches

use crate::encoder::AgentMatrix;
use crate::error::{RecommendError, Result};
use crate::roster::Agent;
use crate::vector::cosine_similarity;

/// Clamps a requested result count into `[1, roster_len]`.
///
/// Zero and negative requests give one result, oversize requests give the
/// whole roster. Never fails.
pub fn clamp_top_n(requested: i64, roster_len: usize) -> usize {
    clamp_count(usize::try_from(requested).unwrap_or(0), roster_len)
}

fn clamp_count(requested: usize, roster_len: usize) -> usize {
    requested.clamp(1, roster_len.max(1))
}

/// Ranks agents by cosine similarity to `query`.
///
/// Scores are sorted in descending order. Equal scores keep roster order, so
/// the output is fully deterministic. `top_n` is clamped with [`clamp_top_n`].
///
/// # Arguments
///
/// * `matrix` - Encoded roster, rows aligned with `roster`
/// * `query` - Encoded query in the same column space
/// * `roster` - Agents in fit order
/// * `top_n` - Number of results wanted
///
/// # Returns
///
/// * `Ok(Vec<(&Agent, f32)>)` - Agents with their similarity score
/// * `Err(RecommendError::InvalidInput)` - Query width or roster length does not match the matrix
///
/// # Examples
///
/// ```
/// use litrec::{Agent, FeatureEncoder, rank};
///
/// let roster = vec![
///     Agent::new("fantasy_ny", "NY", &["Fantasy"]),
///     Agent::new("romance_ny", "NY", &["Romance"]),
/// ];
/// let (encoder, matrix) = FeatureEncoder::fit(&roster).unwrap();
/// let query = encoder.encode_query(&["Fantasy".to_string()], "NY").unwrap();
///
/// let results = rank(&matrix, &query, &roster, 1).unwrap();
/// assert_eq!(results[0].0.name, "fantasy_ny");
/// assert!((results[0].1 - 1.0).abs() < 1e-6);
/// ```
pub fn rank<'a>(
    matrix: &AgentMatrix,
    query: &[f32],
    roster: &'a [Agent],
    top_n: usize,
) -> Result<Vec<(&'a Agent, f32)>> {
    if roster.len() != matrix.rows() {
        return Err(RecommendError::InvalidInput(format!(
            "Roster has {} agents but matrix has {} rows",
            roster.len(),
            matrix.rows()
        )));
    }
    if query.len() != matrix.dimension() {
        return Err(RecommendError::InvalidInput(format!(
            "Wrong query dimension: expected {}, got {}",
            matrix.dimension(),
            query.len()
        )));
    }

    let mut scored = Vec::with_capacity(roster.len());
    for (index, row) in matrix.iter_rows().enumerate() {
        scored.push((index, cosine_similarity(query, row)?));
    }

    // Stable sort: ties stay in roster order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(clamp_count(top_n, roster.len()));

    Ok(scored.into_iter()
        .map(|(index, score)| (&roster[index], score))
        .collect())
}
