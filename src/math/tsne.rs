//! Exact t-SNE embedding into two dimensions.
//!
//! Used only to visualize how the leading PCA coefficients cluster, so there is
//! no numeric contract beyond the usual defaults:
//!
//! - perplexity 30, matched per point by binary search on the Gaussian precision
//! - early exaggeration ×12 with momentum 0.5 for the first 250 iterations,
//!   then momentum 0.8 for the rest (1000 total)
//! - learning rate `max(n / 12 / 4, 50)`
//! - delta-bar-delta gains (+0.2 / ×0.8, floor 0.01)
//! - initial positions drawn from `N(0, 1e-4²)` with a seeded RNG
//!
//! The gradient is computed exactly (O(n²) per iteration). Sample sizes here are
//! a few hundred objects at most.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::error::AppError;

/// Floor applied to joint probabilities to avoid `log(0)`/division blow-ups.
const MACHINE_EPSILON: f64 = 1e-12;
const PERPLEXITY_TOL: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 100;

/// t-SNE settings.
#[derive(Debug, Clone)]
pub struct TsneParams {
    pub perplexity: f64,
    pub early_exaggeration: f64,
    /// Iterations run with exaggeration and low momentum.
    pub exaggeration_iters: usize,
    pub n_iter: usize,
    /// `None` picks `max(n / early_exaggeration / 4, 50)`.
    pub learning_rate: Option<f64>,
    pub min_gain: f64,
    pub seed: u64,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            early_exaggeration: 12.0,
            exaggeration_iters: 250,
            n_iter: 1000,
            learning_rate: None,
            min_gain: 0.01,
            seed: 0,
        }
    }
}

/// Embed `points` (all of equal dimension) into the plane.
pub fn embed(points: &[&[f64]], params: &TsneParams) -> Result<Vec<[f64; 2]>, AppError> {
    let n = points.len();
    if n < 2 {
        return Err(AppError::data(format!("t-SNE needs at least 2 points (got {n}).")));
    }
    let dim = points[0].len();
    if points.iter().any(|p| p.len() != dim) {
        return Err(AppError::input("t-SNE points must share one dimension."));
    }
    if points.iter().flat_map(|p| p.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::runtime("t-SNE input contains non-finite values."));
    }

    let perplexity = effective_perplexity(params.perplexity, n);
    let distances = squared_distances(points);
    let p = joint_probabilities(&distances, n, perplexity);

    let learning_rate = params
        .learning_rate
        .unwrap_or_else(|| (n as f64 / params.early_exaggeration / 4.0).max(50.0));

    let mut rng = StdRng::seed_from_u64(params.seed);
    let normal = Normal::new(0.0, 1e-4)
        .map_err(|e| AppError::runtime(format!("t-SNE initialisation error: {e}")))?;
    let mut y: Vec<[f64; 2]> = (0..n)
        .map(|_| [normal.sample(&mut rng), normal.sample(&mut rng)])
        .collect();

    let mut update = vec![[0.0; 2]; n];
    let mut gains = vec![[1.0f64; 2]; n];
    let mut num = vec![0.0; n * n];
    let mut grad = vec![[0.0; 2]; n];

    for it in 0..params.n_iter {
        let (exaggeration, momentum) = if it < params.exaggeration_iters {
            (params.early_exaggeration, 0.5)
        } else {
            (1.0, 0.8)
        };

        // Student-t kernel.
        let mut sum_num = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = y[i][0] - y[j][0];
                let dy = y[i][1] - y[j][1];
                let v = 1.0 / (1.0 + dx * dx + dy * dy);
                num[i * n + j] = v;
                num[j * n + i] = v;
                sum_num += 2.0 * v;
            }
        }
        let sum_num = sum_num.max(MACHINE_EPSILON);

        for i in 0..n {
            let mut g = [0.0; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num[i * n + j] / sum_num).max(MACHINE_EPSILON);
                let mult = (exaggeration * p[i * n + j] - q) * num[i * n + j];
                g[0] += mult * (y[i][0] - y[j][0]);
                g[1] += mult * (y[i][1] - y[j][1]);
            }
            grad[i] = [4.0 * g[0], 4.0 * g[1]];
        }

        for i in 0..n {
            for d in 0..2 {
                if update[i][d] * grad[i][d] < 0.0 {
                    gains[i][d] += 0.2;
                } else {
                    gains[i][d] *= 0.8;
                }
                gains[i][d] = gains[i][d].max(params.min_gain);
                update[i][d] = momentum * update[i][d] - learning_rate * gains[i][d] * grad[i][d];
                y[i][d] += update[i][d];
            }
        }

        center(&mut y);
    }

    if y.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AppError::runtime("t-SNE diverged (non-finite embedding)."));
    }
    Ok(y)
}

/// Perplexity must stay well below the sample count for the binary search to be meaningful.
fn effective_perplexity(requested: f64, n: usize) -> f64 {
    let cap = ((n as f64 - 1.0) / 3.0).max(1.0);
    if requested > cap {
        log::warn!("t-SNE perplexity {requested} too large for {n} points; using {cap:.2}");
        cap
    } else {
        requested.max(1.0)
    }
}

fn squared_distances(points: &[&[f64]]) -> Vec<f64> {
    let n = points.len();
    let mut d = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let v: f64 = points[i]
                .iter()
                .zip(points[j].iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            d[i * n + j] = v;
            d[j * n + i] = v;
        }
    }
    d
}

/// Symmetrized joint probabilities `P = (P_j|i + P_i|j) / Σ`.
fn joint_probabilities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target_entropy = perplexity.ln();
    let mut cond = vec![0.0; n * n];

    for i in 0..n {
        let row = &distances[i * n..(i + 1) * n];
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;
        let mut probs = vec![0.0; n];

        for _ in 0..PERPLEXITY_STEPS {
            let mut sum_p = 0.0;
            for j in 0..n {
                probs[j] = if j == i { 0.0 } else { (-row[j] * beta).exp() };
                sum_p += probs[j];
            }
            if sum_p == 0.0 {
                sum_p = MACHINE_EPSILON;
            }
            let mut weighted = 0.0;
            for j in 0..n {
                probs[j] /= sum_p;
                weighted += row[j] * probs[j];
            }
            let entropy = sum_p.ln() + beta * weighted;
            let diff = entropy - target_entropy;
            if diff.abs() <= PERPLEXITY_TOL {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() { beta / 2.0 } else { (beta + beta_min) / 2.0 };
            }
        }

        cond[i * n..(i + 1) * n].copy_from_slice(&probs);
    }

    let mut joint = vec![0.0; n * n];
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            let v = cond[i * n + j] + cond[j * n + i];
            joint[i * n + j] = v;
            total += v;
        }
    }
    let total = total.max(MACHINE_EPSILON);
    for v in joint.iter_mut() {
        *v = (*v / total).max(MACHINE_EPSILON);
    }
    joint
}

fn center(y: &mut [[f64; 2]]) {
    let n = y.len() as f64;
    let mx = y.iter().map(|p| p[0]).sum::<f64>() / n;
    let my = y.iter().map(|p| p[1]).sum::<f64>() / n;
    for p in y.iter_mut() {
        p[0] -= mx;
        p[1] -= my;
    }
}
