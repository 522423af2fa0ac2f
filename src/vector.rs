//! This is the vector math module
//! Provide magnitude, dot product and cosine similarity

use crate::error::{RecommendError, Result};

/// L2 Magnitude
/// ||vec|| = sqrt(sum(vec[i]^2))
/// Empty vector has magnitude 0
pub fn magnitude(vector: &[f32]) -> f32 {
    vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt()
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) for i = 0..a.len()
/// Can only process vectors with same dimensions
pub fn dot_product(left: &[f32], right: &[f32]) -> Result<f32> {
    if left.len() != right.len() {
        return Err(RecommendError::InvalidInput(format!(
            "Different dimensions: {} vs {}",
            left.len(),
            right.len()
        )));
    }

    let dot_prod = left.iter()
        .zip(right.iter())
        .map(|(x, y)| x * y)
        .sum();

    Ok(dot_prod)
}

/// Cosine Similarity
/// cos = dot(a, b) / (||a|| * ||b||)
/// Defined as 0 when either side has zero magnitude
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> Result<f32> {
    let dot = dot_product(left, right)?;

    let denom = magnitude(left) * magnitude(right);
    if denom == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / denom)
}
