//! KL divergence between observed and predicted outcome distributions.
//!
//! For one oligo with observed fractions `y` and scores `s_i = θ·x_i`:
//! `Q = ln Σ exp(s_i) + Σ y_i (ln y_i − s_i)` and
//! `∇Q = Σ softmax(s)_i x_i − Σ y_i x_i`.

use super::data::OligoData;
use crate::utils::math::{log_sum_exp, softmax, sparse_dot};

/// Summed objective and gradient over a set of oligos, plus per-oligo values.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub value: f64,
    pub gradient: Vec<f64>,
    pub per_oligo: Vec<f64>,
}

impl Objective {
    pub fn zero(dims: usize) -> Self {
        Objective {
            value: 0.0,
            gradient: vec![0.0; dims],
            per_oligo: Vec::new(),
        }
    }

    /// Adds the unregularized contribution of one oligo.
    pub fn accumulate(&mut self, theta: &[f64], data: &OligoData) {
        if data.is_empty() {
            return;
        }
        let scores: Vec<f64> = data.active.iter().map(|a| sparse_dot(theta, a)).collect();
        let lse = log_sum_exp(&scores);
        let cross: f64 = data
            .y
            .iter()
            .zip(&scores)
            .filter(|(y, _)| **y > 0.0)
            .map(|(&y, &s)| y * (y.ln() - s))
            .sum();
        let value = lse + cross;
        for ((active, p), y) in data.active.iter().zip(softmax(&scores)).zip(&data.y) {
            let weight = p - y;
            for &i in active {
                self.gradient[i as usize] += weight;
            }
        }
        self.value += value;
        self.per_oligo.push(value);
    }

    pub fn merge(&mut self, other: Objective) {
        self.value += other.value;
        for (g, o) in self.gradient.iter_mut().zip(other.gradient) {
            *g += o;
        }
        self.per_oligo.extend(other.per_oligo);
    }

    /// Averages over the contributing oligos and adds `Σ c_j θ_j²`.
    pub fn finalize(mut self, theta: &[f64], penalties: &[f64]) -> Self {
        let n = self.per_oligo.len().max(1) as f64;
        self.value /= n;
        self.gradient.iter_mut().for_each(|g| *g /= n);
        for ((g, &t), &c) in self.gradient.iter_mut().zip(theta).zip(penalties) {
            self.value += c * t * t;
            *g += 2.0 * c * t;
        }
        self
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.per_oligo
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Objective of a set of oligos evaluated on the calling thread.
pub fn evaluate(theta: &[f64], oligos: &[OligoData], penalties: &[f64]) -> Objective {
    let mut objective = Objective::zero(theta.len());
    for data in oligos {
        objective.accumulate(theta, data);
    }
    objective.finalize(theta, penalties)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::indel::Indel;
    use approx::assert_abs_diff_eq;

    pub(crate) fn toy_oligo(id: &str, y: [f64; 3]) -> OligoData {
        OligoData {
            oligo_id: id.into(),
            indels: ["D1_L-1R1", "D2_L-2R1", "I1_L-1R0"]
                .iter()
                .map(|s| Indel::parse(s).unwrap())
                .collect(),
            active: vec![vec![0], vec![0, 1], vec![2]],
            y: y.to_vec(),
        }
    }

    #[test]
    fn objective_is_zero_at_the_optimum() {
        // scores matching ln(y) up to a constant give zero divergence
        let y = [0.2, 0.3, 0.5];
        let theta = [0.2f64.ln(), (0.3f64 / 0.2).ln(), 0.5f64.ln()];
        let objective = evaluate(&theta, &[toy_oligo("Oligo1", y)], &[0.0; 3]);
        assert_abs_diff_eq!(objective.value, 0.0, epsilon = 1e-12);
        for g in objective.gradient {
            assert_abs_diff_eq!(g, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let oligos = [toy_oligo("Oligo1", [0.1, 0.6, 0.3]), toy_oligo("Oligo2", [0.5, 0.25, 0.25])];
        let penalties = [0.1, 0.0, 0.3];
        let theta = [0.3, -0.7, 1.1];
        let objective = evaluate(&theta, &oligos, &penalties);
        let h = 1e-6;
        for j in 0..3 {
            let mut plus = theta;
            plus[j] += h;
            let mut minus = theta;
            minus[j] -= h;
            let numeric = (evaluate(&plus, &oligos, &penalties).value
                - evaluate(&minus, &oligos, &penalties).value)
                / (2.0 * h);
            assert_abs_diff_eq!(objective.gradient[j], numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn value_is_averaged_over_oligos() {
        let a = toy_oligo("Oligo1", [0.1, 0.6, 0.3]);
        let b = toy_oligo("Oligo2", [0.5, 0.25, 0.25]);
        let theta = [0.0; 3];
        let single_a = evaluate(&theta, &[a.clone()], &[0.0; 3]).value;
        let single_b = evaluate(&theta, &[b.clone()], &[0.0; 3]).value;
        let both = evaluate(&theta, &[a, b], &[0.0; 3]);
        assert_abs_diff_eq!(both.value, (single_a + single_b) / 2.0, epsilon = 1e-12);
        assert_eq!(both.per_oligo.len(), 2);
        let (lo, hi) = both.min_max();
        assert!(lo <= hi);
    }
}
