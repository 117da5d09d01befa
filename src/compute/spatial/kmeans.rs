//! K-means clustering over 2D coordinates.
//!
//! Used by cluster weighting to find hot spots in the quadrant layout.
//! Initialization is k-means++; training is Lloyd iteration until the
//! centers stop moving or `max_iters` is reached.

use crate::error::{GrtsError, Result};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Result of clustering `n` points into `k` groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id of every input point.
    pub assignments: Vec<usize>,
    /// `k` cluster centers.
    pub centers: Vec<[f64; 2]>,
}

/// Groups points into `k` clusters.
pub trait Clusterer {
    fn cluster<R: Rng + ?Sized>(
        &self,
        points: &[[f64; 2]],
        k: usize,
        rng: &mut R,
    ) -> Result<Clustering>;
}

/// KMeans training parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    /// Max number of iterations.
    pub max_iters: u32,

    /// Stop when the largest center movement drops below this distance.
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KMeans {
    params: KMeansParams,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Index and squared distance of the closest center.
fn closest(point: &[f64; 2], centers: &[[f64; 2]]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// Initialize using kmeans++, returning `k` centers drawn from `points`.
fn kmeans_plusplus<R: Rng + ?Sized>(points: &[[f64; 2]], k: usize, rng: &mut R) -> Vec<[f64; 2]> {
    let mut chosen = vec![false; points.len()];
    let first = rng.gen_range(0..points.len());
    chosen[first] = true;
    let mut centers = vec![points[first]];

    while centers.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .zip(&chosen)
            .map(|(p, &taken)| if taken { 0.0 } else { closest(p, &centers).1 })
            .collect();

        let next = match WeightedIndex::new(&distances) {
            Ok(weights) => weights.sample(rng),
            // Every remaining point coincides with a center
            Err(_) => {
                let free: Vec<usize> = (0..points.len()).filter(|&i| !chosen[i]).collect();
                free[rng.gen_range(0..free.len())]
            }
        };

        chosen[next] = true;
        centers.push(points[next]);
    }

    centers
}

impl Clusterer for KMeans {
    fn cluster<R: Rng + ?Sized>(
        &self,
        points: &[[f64; 2]],
        k: usize,
        rng: &mut R,
    ) -> Result<Clustering> {
        if k == 0 {
            return Err(GrtsError::InvalidConfig(
                "KMeans: k must be greater than zero".to_string(),
            ));
        }
        if points.len() < k {
            return Err(GrtsError::insufficient("KMeans clusters", k, points.len()));
        }

        let mut centers = kmeans_plusplus(points, k, rng);
        let mut assignments = vec![0; points.len()];

        for iteration in 0..self.params.max_iters {
            for (assignment, point) in assignments.iter_mut().zip(points) {
                *assignment = closest(point, &centers).0;
            }

            let mut sums = vec![[0.0_f64; 2]; k];
            let mut counts = vec![0_usize; k];
            for (point, &cluster) in points.iter().zip(&assignments) {
                sums[cluster][0] += point[0];
                sums[cluster][1] += point[1];
                counts[cluster] += 1;
            }

            let mut shift = 0.0_f64;
            for (i, center) in centers.iter_mut().enumerate() {
                if counts[i] == 0 {
                    log::warn!("KMeans: cluster {} is empty", i);
                    continue;
                }
                let updated = [sums[i][0] / counts[i] as f64, sums[i][1] / counts[i] as f64];
                shift = shift.max(squared_distance(center, &updated).sqrt());
                *center = updated;
            }

            if shift < self.params.tolerance {
                log::debug!("KMeans converged after {} iterations", iteration + 1);
                break;
            }
        }

        for (assignment, point) in assignments.iter_mut().zip(points) {
            *assignment = closest(point, &centers).0;
        }

        Ok(Clustering {
            assignments,
            centers,
        })
    }
}
