//! # grts-types
//!
//! Core grid types for the `grts` sampler.
//!
//! - **Geometry**: `BBox`, an axis-aligned quadrant rectangle `(left, bottom, right, top)`
//! - **Addressing**: `QuadAddress`, the base-4 hierarchical address of a quadrant
//!
//! All types are serializable with Serde and convert to the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use grts_types::address::QuadAddress;
//! use grts_types::bbox::BBox;
//!
//! let root = BBox::new(0.0, 0.0, 10.0, 10.0);
//! let [lower_left, _, _, upper_right] = root.children();
//! assert_eq!(lower_left, BBox::new(0.0, 0.0, 5.0, 5.0));
//! assert_eq!(upper_right, BBox::new(5.0, 5.0, 10.0, 10.0));
//!
//! let address = QuadAddress::root().child(3).child(0);
//! assert_eq!(address.as_str(), "30");
//! ```

pub mod address;
pub mod bbox;
