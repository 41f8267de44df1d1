//! Helpers for turning raw classifier outputs into probability vectors.

/// Index of the largest value; the first one wins on ties.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Checks that `probabilities` is a distribution: finite, non-negative, and
/// summing to 1 within `tolerance`.
pub fn check_distribution(probabilities: &[f32], tolerance: f32) -> Result<(), String> {
    if let Some((i, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(format!("class {i} has invalid probability {p}"));
    }
    let sum: f32 = probabilities.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(format!(
            "probabilities sum to {sum}, expected 1 within {tolerance}"
        ));
    }
    Ok(())
}
