//! Dimensionality reduction of smoothed samples.
//!
//! Two fitted projections are supported:
//! - **PCA**: the top-K eigenvectors of the sample covariance
//! - **ICA**: PCA whitening to K dimensions followed by deflationary
//!   FastICA, seeded so that repeated fits give the same unmixing matrix
//!
//! Both reduce to `y = gain * M (x - mean)` at use time, so applying a
//! projection is a pure function of its input.

use crate::error::{PipelineError, Result};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::fmt;

/// Eigenvalues below this are treated as zero variance.
const EIGEN_EPSILON: f64 = 1e-12;

/// Projection family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionKind {
    /// Principal component analysis
    Pca,
    /// Independent component analysis
    Ica,
}

impl ReductionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReductionKind::Pca => "pca",
            ReductionKind::Ica => "ica",
        }
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FastICA parameters.
#[derive(Debug, Clone)]
pub struct IcaParams {
    /// Seed of the initial unmixing vectors
    pub seed: u64,
    /// Multiplier applied to every independent component
    pub gain: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for IcaParams {
    fn default() -> Self {
        Self {
            seed: 0,
            gain: 5000.0,
            max_iterations: 200,
            tolerance: 1e-4,
        }
    }
}

/// A fitted linear projection from N input channels to K features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    kind: ReductionKind,
    /// Per-channel training mean
    mean: Vec<f64>,
    /// K rows of N weights
    weights: Vec<Vec<f64>>,
    /// Output scale
    gain: f64,
    /// Fraction of variance per principal axis, strongest first (PCA only)
    #[serde(default)]
    explained_variance_ratio: Vec<f64>,
}

/// Eigendecomposition of the training covariance, strongest axis first.
struct Eigen {
    mean: Vec<f64>,
    centered: DMatrix<f64>,
    values: Vec<f64>,
    /// Unit eigenvectors matching `values`
    vectors: Vec<DVector<f64>>,
}

fn decompose(samples: &[Vec<f64>], components: usize) -> Result<Eigen> {
    let n = samples.len();
    if n == 0 {
        return Err(PipelineError::EmptyTrainingSet);
    }
    let dim = samples[0].len();
    if let Some(bad) = samples.iter().find(|s| s.len() != dim) {
        return Err(PipelineError::DimensionMismatch {
            expected: dim,
            actual: bad.len(),
        });
    }
    if components == 0 || components > dim {
        return Err(PipelineError::DimensionMismatch {
            expected: dim,
            actual: components,
        });
    }

    let mean: Vec<f64> = (0..dim)
        .map(|j| samples.iter().map(|s| s[j]).mean())
        .collect();
    let centered = DMatrix::from_fn(n, dim, |i, j| samples[i][j] - mean[j]);
    let covariance = (centered.transpose() * &centered) / n as f64;

    let eigen = SymmetricEigen::new(covariance);
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let values = order
        .iter()
        .map(|&i| eigen.eigenvalues[i].max(0.0))
        .collect();
    let vectors = order
        .iter()
        .map(|&i| {
            let mut v: DVector<f64> = eigen.eigenvectors.column(i).into_owned();
            // Largest loading positive, so the sign does not depend on the solver
            let pivot = v.iamax();
            if v[pivot] < 0.0 {
                v.neg_mut();
            }
            v
        })
        .collect();

    Ok(Eigen {
        mean,
        centered,
        values,
        vectors,
    })
}

fn normalize(v: &mut DVector<f64>) {
    let norm = v.norm();
    if norm > 1e-15 {
        *v /= norm;
    }
}

impl Projection {
    /// Fit a PCA projection keeping the `components` strongest axes.
    pub fn fit_pca(samples: &[Vec<f64>], components: usize) -> Result<Self> {
        let eigen = decompose(samples, components)?;

        let total: f64 = eigen.values.iter().sum();
        let explained_variance_ratio = eigen
            .values
            .iter()
            .map(|&v| if total > 0.0 { v / total } else { 0.0 })
            .collect();

        Ok(Self {
            kind: ReductionKind::Pca,
            mean: eigen.mean,
            weights: eigen.vectors[..components]
                .iter()
                .map(|v| v.iter().copied().collect())
                .collect(),
            gain: 1.0,
            explained_variance_ratio,
        })
    }

    /// Fit an ICA projection with `components` independent sources.
    pub fn fit_ica(samples: &[Vec<f64>], components: usize, params: &IcaParams) -> Result<Self> {
        let eigen = decompose(samples, components)?;
        let dim = eigen.mean.len();
        let n = samples.len() as f64;

        // Whitening: D^{-1/2} E^T restricted to the strongest axes
        let whitening = DMatrix::from_fn(components, dim, |r, c| {
            let value = eigen.values[r];
            if value > EIGEN_EPSILON {
                eigen.vectors[r][c] / value.sqrt()
            } else {
                0.0
            }
        });
        let z = &whitening * eigen.centered.transpose();

        let mut found: Vec<DVector<f64>> = Vec::with_capacity(components);
        for p in 0..components {
            let mut w = DVector::from_fn(components, |i, _| {
                (params.seed as f64 + (p * 7 + i * 13 + 3) as f64).sin()
            });
            normalize(&mut w);

            for _ in 0..params.max_iterations {
                // w+ = E{z g(w'z)} - E{g'(w'z)} w, with g = tanh
                let u = w.transpose() * &z;
                let g = u.map(f64::tanh);
                let g_prime_mean = g.map(|x| 1.0 - x * x).mean();
                let mut w_new = (&z * g.transpose()) / n - &w * g_prime_mean;

                for prev in &found {
                    let dot = prev.dot(&w_new);
                    w_new -= prev * dot;
                }
                normalize(&mut w_new);

                let converged = (w_new.dot(&w).abs() - 1.0).abs() < params.tolerance;
                w = w_new;
                if converged {
                    break;
                }
            }
            found.push(w);
        }

        let unmixing = DMatrix::from_fn(components, components, |r, c| found[r][c]);
        let weights = unmixing * whitening;

        Ok(Self {
            kind: ReductionKind::Ica,
            mean: eigen.mean,
            weights: weights
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            gain: params.gain,
            explained_variance_ratio: Vec::new(),
        })
    }

    /// Project one smoothed sample.
    pub fn apply(&self, sample: &[f64]) -> Vec<f64> {
        debug_assert_eq!(sample.len(), self.mean.len());
        self.weights
            .iter()
            .map(|row| {
                let dot: f64 = row
                    .iter()
                    .zip(sample.iter().zip(&self.mean))
                    .map(|(w, (x, m))| w * (x - m))
                    .sum();
                dot * self.gain
            })
            .collect()
    }

    pub fn kind(&self) -> ReductionKind {
        self.kind
    }

    /// Output dimensionality (K).
    pub fn components(&self) -> usize {
        self.weights.len()
    }

    /// Input dimensionality (N).
    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Variance fraction per principal axis (empty for ICA).
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two correlated channels plus one constant channel.
    fn correlated_samples() -> Vec<Vec<f64>> {
        (0..200)
            .map(|i| {
                let t = i as f64 * 0.1;
                vec![t.sin() * 10.0, t.sin() * 5.0 + 0.01 * t.cos(), 3.0]
            })
            .collect()
    }

    #[test]
    fn test_pca_dominant_axis() {
        let pca = Projection::fit_pca(&correlated_samples(), 1).unwrap();
        assert_eq!(pca.kind(), ReductionKind::Pca);
        assert_eq!(pca.components(), 1);
        assert_eq!(pca.input_dim(), 3);

        let ratio = pca.explained_variance_ratio();
        assert_eq!(ratio.len(), 3);
        assert!(ratio[0] > 0.99);
        assert!((ratio.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pca_mean_maps_to_origin() {
        let samples = correlated_samples();
        let pca = Projection::fit_pca(&samples, 2).unwrap();
        let mean: Vec<f64> = (0..3)
            .map(|j| samples.iter().map(|s| s[j]).sum::<f64>() / samples.len() as f64)
            .collect();
        for v in pca.apply(&mean) {
            assert!(v.abs() < 1e-9);
        }
    }

    #[test]
    fn test_apply_is_pure() {
        let pca = Projection::fit_pca(&correlated_samples(), 2).unwrap();
        let x = [1.0, 2.0, 3.0];
        let first = pca.apply(&x);
        let _ = pca.apply(&[9.0, -9.0, 0.0]);
        assert_eq!(first, pca.apply(&x));
    }

    #[test]
    fn test_ica_is_deterministic_and_scaled() {
        let samples: Vec<Vec<f64>> = (0..300)
            .map(|i| {
                let t = i as f64 * 0.05;
                let s1 = t.sin();
                let s2 = if (i / 7) % 2 == 0 { 1.0 } else { -1.0 };
                vec![s1 + 0.5 * s2, 0.3 * s1 + s2, 0.2 * s1 - 0.1 * s2]
            })
            .collect();

        let params = IcaParams::default();
        let a = Projection::fit_ica(&samples, 2, &params).unwrap();
        let b = Projection::fit_ica(&samples, 2, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.kind(), ReductionKind::Ica);
        assert_eq!(a.gain(), 5000.0);

        let x = &samples[10];
        assert_eq!(a.apply(x), b.apply(x));
        assert!(a.apply(x).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_training_set() {
        let err = Projection::fit_pca(&[], 3).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTrainingSet));

        let err = Projection::fit_ica(&[], 3, &IcaParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTrainingSet));
    }

    #[test]
    fn test_too_many_components() {
        let err = Projection::fit_pca(&correlated_samples(), 4).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }
}
