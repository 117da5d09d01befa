//! Compute layer: spatial collaborators, validation and random sub-streams.
//!
//! The quadrant tree, weighting engine and sampler are built on top of this
//! layer and never depend on a concrete index or clustering implementation.

#[cfg(feature = "geojson")]
pub mod geojson;
pub mod random;
pub mod spatial;
pub mod validation;
