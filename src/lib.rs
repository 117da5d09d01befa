//! Spatially balanced sampling of point datasets with GRTS over a quadrant grid.
//!
//! ## Features
//! - **Quadrant tree**: recursive base-4 subdivision of the padded dataset bounds,
//!   pruning empty quadrants, with count, length and first-null stopping rules
//! - **Weighting**: density-factor, inverse-density and k-means cluster
//!   duplication of quadrant rows
//! - **GRTS sampling**: systematic selection over the address order with
//!   stratified, distance-weighted or plain draws inside each quadrant
//! - **Splits**: train/validation/test partitions and lazy k-fold sequences with
//!   leakage checks
//!
//! All randomness comes from the generator passed in, so a seeded generator
//! reproduces a sample exactly.
//!
//! ```rust
//! use grts::{PointDataset, QuadTree, SampleConfig, SplitOptions, WeightMethod};
//!
//! let coords: Vec<(f64, f64)> = (0..400)
//!     .map(|i| ((i % 20) as f64 * 5_000.0, (i / 20) as f64 * 5_000.0))
//!     .collect();
//! let dataset = PointDataset::from_xy(coords)?;
//!
//! let mut tree = QuadTree::new(&dataset, true)?;
//! tree.split_recursive(&SplitOptions::max_length(30_000.0))?;
//!
//! let config = SampleConfig::new(5)
//!     .with_weight_method(WeightMethod::InverseDensity)
//!     .with_random_state(7);
//! let sample = tree.sample(&config, &mut config.rng())?;
//! assert_eq!(sample.points.len(), 5);
//! # Ok::<(), grts::GrtsError>(())
//! ```

pub mod compute;
pub mod config;
pub mod dataset;
pub mod error;
pub mod sampler;
pub mod splits;
pub mod table;
pub mod tree;
pub mod weighting;

pub use error::{GrtsError, Result};

pub use geo::{Point, Polygon, Rect};
pub use grts_types::address::QuadAddress;
pub use grts_types::bbox::BBox;

pub use config::{
    Config, KFoldConfig, SampleConfig, SplitOptions, StopRule, TrainValTestConfig, WeightMethod,
};
pub use dataset::{Crs, PointDataset};
pub use table::{QuadRow, QuadrantTable};
pub use tree::{Axis, QuadTree};

pub use compute::spatial::{
    Clusterer, Clustering, KMeans, KMeansParams, QuadrantIndex, RTreeIndex, SpatialIndex,
};
pub use sampler::{GrtsSampler, SampleOutput, WithinGrid};
pub use splits::{Fold, KFold, Split, SplitSet, check_integrity};
pub use weighting::{ClusterLayout, WeightedTable, WeightingEngine};

// Re-export validation and GeoJSON utilities
#[cfg(feature = "geojson")]
pub use compute::geojson;
pub use compute::validation;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GrtsError, Result};

    pub use crate::{Point, Polygon};

    pub use crate::{Config, KFoldConfig, SampleConfig, SplitOptions, TrainValTestConfig, WeightMethod};

    pub use crate::{PointDataset, QuadAddress, QuadTree, SampleOutput, SplitSet};

    #[cfg(feature = "geojson")]
    pub use crate::geojson;
    pub use crate::validation;
}
