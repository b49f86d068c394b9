//! Kernel SVM gesture classifier.
//!
//! A one-vs-one ensemble of binary RBF-kernel support vector machines.
//! Each binary machine is trained with an SMO solver that picks the
//! maximal violating pair at every step, so training is deterministic.
//! Every sample carries its own box constraint, which lets the idle class
//! be made far more expensive to misclassify than the gesture classes.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeSet;
use tracing::debug;

/// Stopping tolerance of the SMO solver.
const SMO_EPSILON: f64 = 1e-3;

/// Floor for the curvature of a two-variable sub-problem.
const TAU: f64 = 1e-12;

/// Training parameters.
#[derive(Debug, Clone)]
pub struct SvmParams {
    /// Base regularization constant
    pub cost: f64,
    /// Label whose samples get `cost * idle_weight`
    pub idle_label: String,
    pub idle_weight: f64,
    /// RBF width; `None` uses 1 / (dim * Var(X))
    pub gamma: Option<f64>,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            cost: 1.0,
            idle_label: "idle".to_string(),
            idle_weight: 100.0,
            gamma: None,
        }
    }
}

/// One fitted binary machine separating `positive` from `negative`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinarySvm {
    positive: usize,
    negative: usize,
    support_vectors: Vec<Vec<f64>>,
    /// alpha_i * y_i per support vector
    coefficients: Vec<f64>,
    rho: f64,
}

impl BinarySvm {
    fn decision(&self, x: &[f64], gamma: f64) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, c)| c * rbf(sv, x, gamma))
            .sum::<f64>()
            - self.rho
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * dist).exp()
}

/// Fitted multi-class classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmClassifier {
    /// Class vocabulary, sorted
    classes: Vec<String>,
    /// Feature dimensionality (K)
    dim: usize,
    gamma: f64,
    machines: Vec<BinarySvm>,
}

impl SvmClassifier {
    /// Fit on parallel slices of feature vectors and labels.
    pub fn fit(samples: &[Vec<f64>], labels: &[String], params: &SvmParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(PipelineError::EmptyTrainingSet);
        }
        if samples.len() != labels.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: samples.len(),
                actual: labels.len(),
            });
        }
        let dim = samples[0].len();
        if let Some(bad) = samples.iter().find(|s| s.len() != dim) {
            return Err(PipelineError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(PipelineError::InsufficientClasses {
                found: classes.len(),
            });
        }

        let gamma = params.gamma.unwrap_or_else(|| {
            let variance = samples.iter().flatten().population_variance();
            if variance > 0.0 {
                1.0 / (dim as f64 * variance)
            } else {
                1.0
            }
        });

        let class_index: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();
        let class_cost: Vec<f64> = classes
            .iter()
            .map(|c| {
                if *c == params.idle_label {
                    params.cost * params.idle_weight
                } else {
                    params.cost
                }
            })
            .collect();

        let mut machines = Vec::new();
        for a in 0..classes.len() {
            for b in (a + 1)..classes.len() {
                let mut xs = Vec::new();
                let mut ys = Vec::new();
                let mut cs = Vec::new();
                for (i, &ci) in class_index.iter().enumerate() {
                    if ci == a || ci == b {
                        xs.push(samples[i].as_slice());
                        ys.push(if ci == a { 1.0 } else { -1.0 });
                        cs.push(class_cost[ci]);
                    }
                }
                let machine = train_binary(&xs, &ys, &cs, gamma, a, b);
                debug!(
                    positive = %classes[a],
                    negative = %classes[b],
                    support_vectors = machine.support_vectors.len(),
                    "Trained binary SVM"
                );
                machines.push(machine);
            }
        }

        Ok(Self {
            classes,
            dim,
            gamma,
            machines,
        })
    }

    /// Classify one feature vector by one-vs-one voting.
    ///
    /// Ties go to the class that comes first in the vocabulary.
    pub fn predict(&self, x: &[f64]) -> &str {
        let mut votes = vec![0usize; self.classes.len()];
        for machine in &self.machines {
            if machine.decision(x, self.gamma) > 0.0 {
                votes[machine.positive] += 1;
            } else {
                votes[machine.negative] += 1;
            }
        }

        let mut best = 0;
        for (i, &v) in votes.iter().enumerate() {
            if v > votes[best] {
                best = i;
            }
        }
        &self.classes[best]
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Feature dimensionality the classifier was trained with.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

/// SMO over one binary problem.
fn train_binary(
    xs: &[&[f64]],
    ys: &[f64],
    costs: &[f64],
    gamma: f64,
    positive: usize,
    negative: usize,
) -> BinarySvm {
    let l = xs.len();
    let kernel_row = |i: usize| -> Vec<f64> {
        (0..l)
            .map(|k| ys[i] * ys[k] * rbf(xs[i], xs[k], gamma))
            .collect()
    };

    let mut alpha = vec![0.0f64; l];
    // Gradient of the dual objective, Q alpha - e
    let mut grad = vec![-1.0f64; l];
    let is_upper = |a: f64, c: f64| a >= c;
    let is_lower = |a: f64| a <= 0.0;

    let max_iterations = (100 * l).max(10_000);
    for _ in 0..max_iterations {
        // Maximal violating pair
        let mut g_max = f64::NEG_INFINITY;
        let mut g_max2 = f64::NEG_INFINITY;
        let mut i = usize::MAX;
        let mut j = usize::MAX;
        for t in 0..l {
            if ys[t] > 0.0 {
                if !is_upper(alpha[t], costs[t]) && -grad[t] >= g_max {
                    g_max = -grad[t];
                    i = t;
                }
                if !is_lower(alpha[t]) && grad[t] >= g_max2 {
                    g_max2 = grad[t];
                    j = t;
                }
            } else {
                if !is_lower(alpha[t]) && grad[t] >= g_max {
                    g_max = grad[t];
                    i = t;
                }
                if !is_upper(alpha[t], costs[t]) && -grad[t] >= g_max2 {
                    g_max2 = -grad[t];
                    j = t;
                }
            }
        }
        if i == usize::MAX || j == usize::MAX || g_max + g_max2 < SMO_EPSILON {
            break;
        }

        let q_i = kernel_row(i);
        let q_j = kernel_row(j);
        let (c_i, c_j) = (costs[i], costs[j]);
        let (old_i, old_j) = (alpha[i], alpha[j]);

        if ys[i] != ys[j] {
            let quad = (q_i[i] + q_j[j] + 2.0 * q_i[j]).max(TAU);
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = c_i - diff;
                }
            } else if alpha[j] > c_j {
                alpha[j] = c_j;
                alpha[i] = c_j + diff;
            }
        } else {
            let quad = (q_i[i] + q_j[j] - 2.0 * q_i[j]).max(TAU);
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c_i {
                if alpha[i] > c_i {
                    alpha[i] = c_i;
                    alpha[j] = sum - c_i;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c_j {
                if alpha[j] > c_j {
                    alpha[j] = c_j;
                    alpha[i] = sum - c_j;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (d_i, d_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for k in 0..l {
            grad[k] += q_i[k] * d_i + q_j[k] * d_j;
        }
    }

    // Bias: average over free vectors, midpoint of the bounds otherwise
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;
    for t in 0..l {
        let yg = ys[t] * grad[t];
        if is_upper(alpha[t], costs[t]) {
            if ys[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if is_lower(alpha[t]) {
            if ys[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            free_count += 1;
            free_sum += yg;
        }
    }
    let rho = if free_count > 0 {
        free_sum / free_count as f64
    } else {
        (upper + lower) / 2.0
    };

    let mut support_vectors = Vec::new();
    let mut coefficients = Vec::new();
    for t in 0..l {
        if alpha[t] > 0.0 {
            support_vectors.push(xs[t].to_vec());
            coefficients.push(alpha[t] * ys[t]);
        }
    }

    BinarySvm {
        positive,
        negative,
        support_vectors,
        coefficients,
        rho,
    }
}
