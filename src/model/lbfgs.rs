//! Limited-memory BFGS with a backtracking Armijo line search.

use crate::utils::math::{dot, max_abs};
use crate::utils::Result;
use std::collections::VecDeque;

const ARMIJO_C1: f64 = 1e-4;
const MAX_LINE_SEARCH_STEPS: usize = 40;
const CURVATURE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct LbfgsParams {
    /// Stops when the relative objective reduction or the largest gradient
    /// component falls to this value.
    pub tolerance: f64,
    pub history: usize,
    pub max_iterations: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        LbfgsParams {
            tolerance: 1e-4,
            history: 10,
            max_iterations: 15000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

struct History {
    pairs: VecDeque<(Vec<f64>, Vec<f64>, f64)>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        History {
            pairs: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, s: Vec<f64>, y: Vec<f64>) {
        let sy = dot(&s, &y);
        if sy <= CURVATURE_EPSILON {
            return;
        }
        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back((s, y, 1.0 / sy));
    }

    /// Two-loop recursion: returns `-H g`.
    fn direction(&self, gradient: &[f64]) -> Vec<f64> {
        let mut q = gradient.to_vec();
        let mut alphas = Vec::with_capacity(self.pairs.len());
        for (s, y, rho) in self.pairs.iter().rev() {
            let alpha = rho * dot(s, &q);
            q.iter_mut().zip(y).for_each(|(qi, yi)| *qi -= alpha * yi);
            alphas.push(alpha);
        }
        if let Some((s, y, _)) = self.pairs.back() {
            let gamma = dot(s, y) / dot(y, y);
            q.iter_mut().for_each(|qi| *qi *= gamma);
        }
        for ((s, y, rho), alpha) in self.pairs.iter().zip(alphas.iter().rev()) {
            let beta = rho * dot(y, &q);
            q.iter_mut().zip(s).for_each(|(qi, si)| *qi += (alpha - beta) * si);
        }
        q.iter_mut().for_each(|qi| *qi = -*qi);
        q
    }

    fn clear(&mut self) {
        self.pairs.clear();
    }
}

/// Minimizes `objective`, which returns the value and gradient at a point.
/// Evaluation errors abort the search; failing to converge does not.
pub fn minimize<F>(mut objective: F, x0: Vec<f64>, params: &LbfgsParams) -> Result<Minimum>
where
    F: FnMut(&[f64]) -> Result<(f64, Vec<f64>)>,
{
    let mut x = x0;
    let (mut f, mut g) = objective(&x)?;
    if !f.is_finite() {
        return Err(format!("Objective is not finite at the starting point ({})", f).into());
    }
    let mut history = History::new(params.history);

    for iteration in 1..=params.max_iterations {
        if max_abs(&g) <= params.tolerance {
            return Ok(Minimum {
                x,
                value: f,
                iterations: iteration - 1,
                converged: true,
            });
        }

        let mut direction = history.direction(&g);
        let mut slope = dot(&direction, &g);
        if slope >= 0.0 || !slope.is_finite() {
            log::debug!("Resetting L-BFGS history: not a descent direction");
            history.clear();
            direction = g.iter().map(|v| -v).collect();
            slope = dot(&direction, &g);
        }

        let mut step = if history.pairs.is_empty() {
            1.0 / max_abs(&g).max(1.0)
        } else {
            1.0
        };
        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let candidate: Vec<f64> = x.iter().zip(&direction).map(|(xi, di)| xi + step * di).collect();
            let (f_new, g_new) = objective(&candidate)?;
            if f_new.is_finite() && f_new <= f + ARMIJO_C1 * step * slope {
                accepted = Some((candidate, f_new, g_new));
                break;
            }
            step *= 0.5;
        }
        let Some((x_new, f_new, g_new)) = accepted else {
            log::warn!("Line search failed after {} iterations", iteration);
            return Ok(Minimum {
                x,
                value: f,
                iterations: iteration,
                converged: false,
            });
        };

        let s = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        history.push(s, y);

        let reduction = (f - f_new) / f.abs().max(f_new.abs()).max(1.0);
        log::debug!(
            "Iteration {}: Q={:.5} step={:.3e} |g|max={:.3e}",
            iteration,
            f_new,
            step,
            max_abs(&g_new)
        );
        x = x_new;
        f = f_new;
        g = g_new;
        if reduction <= params.tolerance {
            return Ok(Minimum {
                x,
                value: f,
                iterations: iteration,
                converged: true,
            });
        }
    }

    Ok(Minimum {
        converged: max_abs(&g) <= params.tolerance,
        x,
        value: f,
        iterations: params.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quadratic(x: &[f64]) -> Result<(f64, Vec<f64>)> {
        let centers = [1.0, -2.0, 0.5];
        let scales = [1.0, 10.0, 0.1];
        let value = x
            .iter()
            .zip(centers.iter().zip(&scales))
            .map(|(xi, (c, s))| s * (xi - c).powi(2))
            .sum();
        let gradient = x
            .iter()
            .zip(centers.iter().zip(&scales))
            .map(|(xi, (c, s))| 2.0 * s * (xi - c))
            .collect();
        Ok((value, gradient))
    }

    fn rosenbrock(x: &[f64]) -> Result<(f64, Vec<f64>)> {
        let (a, b) = (x[0], x[1]);
        let value = (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2);
        let gradient = vec![
            -2.0 * (1.0 - a) - 400.0 * a * (b - a * a),
            200.0 * (b - a * a),
        ];
        Ok((value, gradient))
    }

    #[test]
    fn minimizes_an_ill_conditioned_quadratic() {
        let params = LbfgsParams {
            tolerance: 1e-10,
            ..Default::default()
        };
        let minimum = minimize(quadratic, vec![0.0; 3], &params).unwrap();
        assert!(minimum.converged);
        assert_abs_diff_eq!(minimum.x[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(minimum.x[1], -2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(minimum.x[2], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let params = LbfgsParams {
            tolerance: 1e-12,
            history: 5,
            max_iterations: 5000,
        };
        let minimum = minimize(rosenbrock, vec![-1.2, 1.0], &params).unwrap();
        assert_abs_diff_eq!(minimum.x[0], 1.0, epsilon = 1e-2);
        assert_abs_diff_eq!(minimum.x[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn iteration_limit_is_not_an_error() {
        let params = LbfgsParams {
            tolerance: 0.0,
            history: 3,
            max_iterations: 2,
        };
        let minimum = minimize(rosenbrock, vec![-1.2, 1.0], &params).unwrap();
        assert!(!minimum.converged);
        assert!(minimum.iterations <= 2);
    }

    #[test]
    fn evaluation_errors_propagate() {
        let failing = |_: &[f64]| -> Result<(f64, Vec<f64>)> { Err("worker failed".into()) };
        assert!(minimize(failing, vec![0.0], &LbfgsParams::default()).is_err());
    }
}
