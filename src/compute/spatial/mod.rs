//! Spatial collaborators used by the quadrant tree and the sampler.
//!
//! The tree and sampler only talk to the [`SpatialIndex`] and
//! [`Clusterer`] traits, so any structure answering these queries can stand
//! in for the R*-tree and k-means defaults.

use grts_types::bbox::BBox;

pub mod kmeans;
pub mod rtree;

pub use kmeans::{Clusterer, Clustering, KMeans, KMeansParams};
pub use rtree::{QuadrantIndex, RTreeIndex};

/// Region and nearest-neighbour queries over an indexed set of identifiers.
pub trait SpatialIndex {
    /// Identifiers whose location falls in `bbox`, ascending.
    fn intersect(&self, bbox: &BBox) -> Vec<usize>;

    /// Up to `k` identifiers ordered by distance to `(x, y)`, nearest first.
    fn nearest(&self, x: f64, y: f64, k: usize) -> Vec<usize>;

    /// Number of indexed entries.
    fn size(&self) -> usize;
}
