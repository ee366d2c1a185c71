use ndarray::ArrayView1;
use reciperank_common::{ReciperankError, Result};

/// Euclidean norm, accumulated in f64
pub fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Unit-norm copy of `vector`.
///
/// Fails for zero-norm or non-finite input; `id` names the offender.
pub fn normalized(id: &str, vector: &[f32]) -> Result<Vec<f32>> {
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(ReciperankError::degenerate(id, "non-finite component"));
    }

    let norm = l2_norm(vector);
    if norm == 0.0 {
        return Err(ReciperankError::degenerate(id, "zero norm"));
    }

    Ok(vector
        .iter()
        .map(|&x| (f64::from(x) / norm) as f32)
        .collect())
}

/// Inner product; equals cosine similarity for unit vectors
pub fn dot(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.dot(&b)
}
