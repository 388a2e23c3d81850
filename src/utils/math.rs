/// Dot product of a weight vector with a 0/1 vector given by its active indices.
#[inline]
pub fn sparse_dot(weights: &[f64], active: &[u32]) -> f64 {
    active.iter().map(|&i| weights[i as usize]).sum()
}

/// Numerically stable `ln(sum(exp(x)))`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Softmax of `values`, computed relative to the maximum to avoid overflow.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let lse = log_sum_exp(values);
    values.iter().map(|v| (v - lse).exp()).collect()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}
